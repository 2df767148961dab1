//! Ledger transactions booked against existing accounts.

use std::{collections::BTreeMap, sync::Arc};

use bank_datagen_domain::{
    AccountId,
    transaction::{Amount, TransactionKind, TransactionRecord},
};
use bank_datagen_store::AuditStore;
use chrono::{DateTime, Utc};

use crate::{
    error::{DatagenEngineError, DatagenEngineErrorKind},
    fact_source::{RandomFactSource, RandomFactSourceExt},
};

/// Transaction amounts in minor units, 10.00 to 5000.00.
pub const AMOUNT_RANGE_MINOR: core::ops::RangeInclusive<i64> = 1_000..=500_000;

const KINDS: [TransactionKind; 2] = [TransactionKind::Credit, TransactionKind::Debit];

/// Books random transactions against existing accounts.
pub struct TransactionGenerator<S> {
    facts: Arc<dyn RandomFactSource>,
    store: S,
}

#[bon::bon]
impl<S> TransactionGenerator<S> {
    /// Creates a generator.
    #[builder]
    pub fn new(facts: Arc<dyn RandomFactSource>, store: S) -> Self {
        Self { facts, store }
    }
}

impl<S> TransactionGenerator<S>
where
    S: AuditStore,
{
    /// Books `count` transactions and persists them as one batch.
    ///
    /// `accounts` maps every eligible account to its creation time. Each transaction picks
    /// an account uniformly and is booked between the account's creation and now. No
    /// account means no transaction.
    pub async fn create_transactions(
        &self,
        accounts: &BTreeMap<AccountId, DateTime<Utc>>,
        count: usize,
    ) -> Result<Vec<TransactionRecord>, DatagenEngineError> {
        if accounts.is_empty() {
            tracing::warn!(count, "no accounts to book transactions against");
            return Ok(Vec::new());
        }

        let accounts: Vec<_> = accounts.iter().map(|(id, created_at)| (*id, *created_at)).collect();

        let mut transactions = Vec::with_capacity(count);

        for _ in 0..count {
            let Some(&(account_id, created_at)) = self.facts.choose(&accounts) else {
                break;
            };

            let booked_at =
                self.facts.past_timestamp(created_at).map_err(DatagenEngineErrorKind::from)?;

            let amount = self
                .facts
                .amount_minor(AMOUNT_RANGE_MINOR)
                .map_err(DatagenEngineErrorKind::from)?;

            let transaction = TransactionRecord::builder()
                .transaction_id(self.facts.fresh_id().into())
                .account_id(account_id)
                .kind(self.facts.choose(&KINDS).copied().unwrap_or(TransactionKind::Credit))
                .amount(Amount::from_minor(amount))
                .booked_at(booked_at)
                .build();

            transactions.push(transaction);
        }

        if transactions.is_empty() {
            return Ok(transactions);
        }

        self.store
            .insert_transaction_batch(&transactions)
            .await
            .map_err(DatagenEngineErrorKind::from)?;

        tracing::info!(count = transactions.len(), "booked transactions");

        Ok(transactions)
    }
}
