//! Test utilities for the banking dataset generator.
//!
//! This crate provides a fixed clock and a fault-injecting [`AuditStore`] wrapper for the
//! integration tests across this workspace.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, PoisonError},
};

use bank_datagen_domain::{
    AccountId, CustomerId, account::AccountBatch, customer::CustomerAuditRecord,
    transaction::TransactionRecord,
};
use bank_datagen_store::{AuditStore, BankStoreError};
use chrono::{DateTime, TimeZone, Utc};

/// The instant tests use as "now": 2025-06-30T12:00:00Z.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
}

/// An [`AuditStore`] that delegates to `S` but rejects the account batches of chosen
/// customers, as a store would after a failed and rolled back transaction.
///
/// Clones share the set of failing customers.
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    failing_owners: Arc<Mutex<BTreeSet<CustomerId>>>,
}

impl<S> FlakyStore<S> {
    /// Wraps `inner` without any failing customer.
    pub fn new(inner: S) -> Self {
        Self { inner, failing_owners: Arc::default() }
    }

    /// Makes every later account batch owned by `customer_id` fail.
    pub fn fail_accounts_for(&self, customer_id: CustomerId) {
        self.failing_owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(customer_id);
    }

    fn fails_for(&self, customer_id: CustomerId) -> bool {
        self.failing_owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&customer_id)
    }
}

impl<S> AuditStore for FlakyStore<S>
where
    S: AuditStore + Sync,
{
    async fn insert_customer_batch(
        &self,
        records: &[CustomerAuditRecord],
    ) -> Result<usize, BankStoreError> {
        self.inner.insert_customer_batch(records).await
    }

    async fn insert_account_batch(&self, batch: &AccountBatch) -> Result<usize, BankStoreError> {
        if self.fails_for(batch.owner()) {
            return Err(BankStoreError::other(format!(
                "injected failure for accounts of {}",
                batch.owner()
            )));
        }

        self.inner.insert_account_batch(batch).await
    }

    async fn insert_transaction_batch(
        &self,
        records: &[TransactionRecord],
    ) -> Result<usize, BankStoreError> {
        self.inner.insert_transaction_batch(records).await
    }

    async fn latest_customer_version(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerAuditRecord>, BankStoreError> {
        self.inner.latest_customer_version(customer_id).await
    }

    async fn sample_customer_ids(&self, count: usize) -> Result<Vec<CustomerId>, BankStoreError> {
        self.inner.sample_customer_ids(count).await
    }

    async fn earliest_customer_timestamps(
        &self,
    ) -> Result<BTreeMap<CustomerId, DateTime<Utc>>, BankStoreError> {
        self.inner.earliest_customer_timestamps().await
    }

    async fn earliest_account_timestamps(
        &self,
    ) -> Result<BTreeMap<AccountId, DateTime<Utc>>, BankStoreError> {
        self.inner.earliest_account_timestamps().await
    }
}
