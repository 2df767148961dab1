//! Generators for a referentially consistent banking dataset.
//!
//! The [`DatagenEngine`] drives three generators over one [`AuditStore`]:
//!
//! - [`CustomerEntityGenerator`] creates customers and derives later audit versions
//! - [`AccountEntityGenerator`] gives each customer accounts and links other customers
//!   to them as members
//! - [`TransactionGenerator`] books transactions against existing accounts
//!
//! Every random fact comes from one shared [`RandomFactSource`], so a seeded source
//! reproduces a whole run.

mod error;

pub mod account;
pub mod customer;
pub mod fact_source;
pub mod sink;
pub mod transaction;

pub use self::{
    account::AccountEntityGenerator,
    customer::CustomerEntityGenerator,
    error::{DatagenEngineError, DatagenEngineErrorKind},
    fact_source::{FakerFactSource, InvalidRange, RandomFactSource, RandomFactSourceExt},
    sink::{CsvSink, SinkError, TabularSink},
    transaction::TransactionGenerator,
};

use std::sync::Arc;

use bank_datagen_domain::CustomerId;
use bank_datagen_store::AuditStore;
use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;

/// How much to generate in one run.
#[derive(Debug, Clone, Copy, Default, Builder, Dissolve)]
pub struct GenerationPlan {
    /// New customers to create.
    #[builder(default)]
    customers: usize,

    /// Existing customers to update once.
    #[builder(default)]
    customer_updates: usize,

    /// Transactions to book.
    #[builder(default)]
    transactions: usize,
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Dissolve)]
pub struct GenerationReport {
    customers_created: usize,
    customers_updated: usize,
    accounts_created: usize,
    links_created: usize,
    transactions_created: usize,
    failed_customers: Vec<CustomerId>,
}

impl GenerationReport {
    /// Returns the number of new customers.
    pub fn customers_created(&self) -> usize {
        self.customers_created
    }

    /// Returns the number of customer update records.
    pub fn customers_updated(&self) -> usize {
        self.customers_updated
    }

    /// Returns the number of new accounts.
    pub fn accounts_created(&self) -> usize {
        self.accounts_created
    }

    /// Returns the number of new customer-account links, owners included.
    pub fn links_created(&self) -> usize {
        self.links_created
    }

    /// Returns the number of booked transactions.
    pub fn transactions_created(&self) -> usize {
        self.transactions_created
    }

    /// Returns the customers whose accounts could not be created.
    pub fn failed_customers(&self) -> &[CustomerId] {
        &self.failed_customers
    }
}

/// Orchestrates the generators over one store.
pub struct DatagenEngine<S> {
    store: S,
    customers: CustomerEntityGenerator<S>,
    accounts: AccountEntityGenerator<S>,
    transactions: TransactionGenerator<S>,
}

#[bon::bon]
impl<S> DatagenEngine<S>
where
    S: AuditStore + Clone,
{
    /// Creates an engine whose generators share `facts` and `store`.
    #[builder]
    pub fn new(
        facts: Arc<dyn RandomFactSource>,
        store: S,
        epoch_floor: Option<DateTime<Utc>>,
    ) -> Self {
        let customers = CustomerEntityGenerator::builder()
            .facts(facts.clone())
            .store(store.clone())
            .maybe_epoch_floor(epoch_floor)
            .build();

        let accounts =
            AccountEntityGenerator::builder().facts(facts.clone()).store(store.clone()).build();

        let transactions =
            TransactionGenerator::builder().facts(facts).store(store.clone()).build();

        Self { store, customers, accounts, transactions }
    }
}

impl<S> DatagenEngine<S>
where
    S: AuditStore + Clone,
{
    /// Returns the store the engine writes to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the customer generator.
    pub fn customers(&self) -> &CustomerEntityGenerator<S> {
        &self.customers
    }

    /// Returns the account generator.
    pub fn accounts(&self) -> &AccountEntityGenerator<S> {
        &self.accounts
    }

    /// Returns the transaction generator.
    pub fn transactions(&self) -> &TransactionGenerator<S> {
        &self.transactions
    }

    /// Runs one generation pass.
    ///
    /// Loads the new customers, updates a random subset of all customers, creates accounts
    /// for every known customer with the whole population as member pool and finally books
    /// transactions against every known account. A customer whose accounts cannot be
    /// created is logged and reported, and the run moves on to the next customer.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, plan: GenerationPlan) -> Result<GenerationReport, DatagenEngineError> {
        let GenerationPlanDissolved { customers, customer_updates, transactions } =
            plan.dissolve();

        let mut report = GenerationReport {
            customers_created: self.customers.load_initial_data(customers).await?.len(),
            customers_updated: self
                .customers
                .update_random_customers(customer_updates)
                .await?
                .len(),
            ..GenerationReport::default()
        };

        let known = self.customers.latest_known_customers().await?;

        for (&customer_id, &created_at) in &known {
            let created =
                self.accounts.create_accounts_for_customer(customer_id, created_at, &known);

            match created.await {
                Ok(batch) => {
                    report.accounts_created += batch.accounts().len();
                    report.links_created += batch.links().len();
                },
                Err(err) => {
                    tracing::error!(%customer_id, %err, "failed to create accounts for customer");
                    report.failed_customers.push(customer_id);
                },
            }
        }

        let accounts = self
            .store
            .earliest_account_timestamps()
            .await
            .map_err(DatagenEngineErrorKind::from)?;

        report.transactions_created =
            self.transactions.create_transactions(&accounts, transactions).await?.len();

        tracing::info!(
            customers_created = report.customers_created,
            customers_updated = report.customers_updated,
            accounts_created = report.accounts_created,
            transactions_created = report.transactions_created,
            failed_customers = report.failed_customers.len(),
            "generation finished",
        );

        Ok(report)
    }
}
