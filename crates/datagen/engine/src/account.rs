//! Creation of accounts and of the links between customers and accounts.

use std::{collections::BTreeMap, sync::Arc};

use bank_datagen_domain::{
    AccountId, AuditOperation, CustomerId, Timestamps,
    account::{
        AccountAuditRecord, AccountBatch, AccountStatus, AccountType, CustomerAccountLink,
        LinkAction, LinkRole,
    },
};
use bank_datagen_store::AuditStore;
use chrono::{DateTime, Utc};

use crate::{
    error::{DatagenEngineError, DatagenEngineErrorKind},
    fact_source::{RandomFactSource, RandomFactSourceExt},
};

/// Legal entities an account may be held with.
pub const LEGAL_ENTITIES: [&str; 4] = ["EU", "IT", "FR", "ES"];

/// Probability that a customer also gets a savings account.
pub const SAVINGS_PROBABILITY: f64 = 0.5;

/// Upper bound on the number of sub-accounts per customer.
pub const MAX_SUB_ACCOUNTS: usize = 2;

/// Upper bound on the number of members per sub-account.
pub const MAX_MEMBERS: usize = 2;

/// Creates the accounts of a customer.
pub struct AccountEntityGenerator<S> {
    facts: Arc<dyn RandomFactSource>,
    store: S,
}

#[bon::bon]
impl<S> AccountEntityGenerator<S> {
    /// Creates a generator.
    #[builder]
    pub fn new(facts: Arc<dyn RandomFactSource>, store: S) -> Self {
        Self { facts, store }
    }
}

impl<S> AccountEntityGenerator<S>
where
    S: AuditStore,
{
    /// Builds and persists the accounts of `customer_id`.
    ///
    /// See [`build_accounts_for_customer`](Self::build_accounts_for_customer) for what the
    /// batch contains. The batch is committed as a whole or not at all.
    pub async fn create_accounts_for_customer(
        &self,
        customer_id: CustomerId,
        customer_created_at: DateTime<Utc>,
        known_customers: &BTreeMap<CustomerId, DateTime<Utc>>,
    ) -> Result<AccountBatch, DatagenEngineError> {
        let batch =
            self.build_accounts_for_customer(customer_id, customer_created_at, known_customers)?;

        self.store.insert_account_batch(&batch).await.map_err(DatagenEngineErrorKind::from)?;

        tracing::info!(
            %customer_id,
            accounts = batch.accounts().len(),
            members = batch.member_links().count(),
            "created accounts for customer",
        );

        Ok(batch)
    }

    /// Assembles the accounts of `customer_id` without persisting them.
    ///
    /// The batch holds one current account, a savings account with probability
    /// [`SAVINGS_PROBABILITY`] and up to [`MAX_SUB_ACCOUNTS`] sub-accounts. Every account is
    /// created after the customer and owned by it. Each sub-account gets up to
    /// [`MAX_MEMBERS`] distinct members drawn from `known_customers` without the owner.
    /// `known_customers` maps every customer to its creation time, and a member link is
    /// never dated before its sub-account nor before its member.
    ///
    /// # Errors
    ///
    /// - `ReferentialGap` if `customer_id` is not in `known_customers`
    /// - `InvalidRange` if `customer_created_at` is not in the past
    pub fn build_accounts_for_customer(
        &self,
        customer_id: CustomerId,
        customer_created_at: DateTime<Utc>,
        known_customers: &BTreeMap<CustomerId, DateTime<Utc>>,
    ) -> Result<AccountBatch, DatagenEngineError> {
        if !known_customers.contains_key(&customer_id) {
            return Err(DatagenEngineErrorKind::referential_gap(format!(
                "customer {customer_id} is not a known customer"
            ))
            .into());
        }

        let eligible_members: Vec<_> = known_customers
            .iter()
            .filter(|(id, _)| **id != customer_id)
            .map(|(id, created_at)| (*id, *created_at))
            .collect();

        let mut accounts = Vec::new();
        let mut links = Vec::new();

        let current = self.new_account(AccountType::Current, customer_created_at)?;
        links.push(self.owner_link(customer_id, &current));
        accounts.push(current);

        if self.facts.chance(SAVINGS_PROBABILITY) {
            let savings = self.new_account(AccountType::Savings, customer_created_at)?;
            links.push(self.owner_link(customer_id, &savings));
            accounts.push(savings);
        }

        let sub_accounts =
            self.facts.count(0..=MAX_SUB_ACCOUNTS).map_err(DatagenEngineErrorKind::from)?;

        for _ in 0..sub_accounts {
            let sub_account = self.new_account(AccountType::SubAccount, customer_created_at)?;
            links.push(self.owner_link(customer_id, &sub_account));

            let member_count = self
                .facts
                .count(0..=MAX_MEMBERS.min(eligible_members.len()))
                .map_err(DatagenEngineErrorKind::from)?;

            for (member, member_created_at) in self.facts.sample(&eligible_members, member_count) {
                let created_at = self
                    .facts
                    .past_timestamp(sub_account.created_at().max(member_created_at))
                    .map_err(DatagenEngineErrorKind::from)?;

                links.push(link(member, sub_account.account_id(), LinkRole::Member, created_at));
            }

            accounts.push(sub_account);
        }

        AccountBatch::builder()
            .owner(customer_id)
            .accounts(accounts)
            .links(links)
            .build()
            .map_err(DatagenEngineErrorKind::from)
            .map_err(From::from)
    }

    fn new_account(
        &self,
        account_type: AccountType,
        customer_created_at: DateTime<Utc>,
    ) -> Result<AccountAuditRecord, DatagenEngineError> {
        let created_at = self
            .facts
            .past_timestamp(customer_created_at)
            .map_err(DatagenEngineErrorKind::from)?;

        let legal_entity = self.facts.choose(&LEGAL_ENTITIES).copied().unwrap_or("EU");

        let account = AccountAuditRecord::builder()
            .audit_id(self.facts.fresh_id().into())
            .account_id(self.facts.fresh_id().into())
            .status(AccountStatus::Open)
            .account_type(account_type)
            .legal_entity(legal_entity.to_string())
            .opened_at(created_at)
            .timestamps(Timestamps::at(created_at))
            .operation(AuditOperation::Insert)
            .build();

        Ok(account)
    }

    fn owner_link(
        &self,
        customer_id: CustomerId,
        account: &AccountAuditRecord,
    ) -> CustomerAccountLink {
        link(customer_id, account.account_id(), LinkRole::Owner, account.created_at())
    }
}

fn link(
    customer_id: CustomerId,
    account_id: AccountId,
    role: LinkRole,
    created_at: DateTime<Utc>,
) -> CustomerAccountLink {
    CustomerAccountLink::builder()
        .customer_id(customer_id)
        .account_id(account_id)
        .role(role)
        .action(LinkAction::Added)
        .created_at(created_at)
        .build()
}
