use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};

use bank_datagen_domain::{
    AccountId, AuditOperation, CustomerId,
    account::{AccountAuditRecord, AccountBatch, CustomerAccountLink},
    customer::CustomerAuditRecord,
    transaction::TransactionRecord,
};
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};

use crate::{
    AuditStore,
    error::{BankStoreError, Result},
};

/// Every row held by a [`MemoryStore`], in insertion order per table.
#[derive(Debug, Clone, Default, Dissolve)]
pub struct Dataset {
    customers: Vec<CustomerAuditRecord>,
    accounts: Vec<AccountAuditRecord>,
    links: Vec<CustomerAccountLink>,
    transactions: Vec<TransactionRecord>,
}

impl Dataset {
    /// Returns the customer audit records.
    pub fn customers(&self) -> &[CustomerAuditRecord] {
        &self.customers
    }

    /// Returns the account audit records.
    pub fn accounts(&self) -> &[AccountAuditRecord] {
        &self.accounts
    }

    /// Returns the customer-account links.
    pub fn links(&self) -> &[CustomerAccountLink] {
        &self.links
    }

    /// Returns the transactions.
    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    fn knows_customer(&self, customer_id: CustomerId) -> bool {
        self.customers.iter().any(|record| record.customer_id() == customer_id)
    }

    fn knows_account(&self, account_id: AccountId) -> bool {
        self.accounts.iter().any(|record| record.account_id() == account_id)
    }
}

/// An in-process [`AuditStore`].
///
/// Applies the same referential checks the relational schema would, and commits a batch
/// only after all of its rows passed them. Clones share the same rows.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    dataset: Dataset,
    rng: StdRng,
}

impl MemoryStore {
    /// Creates an empty store whose sampling is seeded from the operating system.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Creates an empty store whose sampling is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        let inner = Inner { dataset: Dataset::default(), rng };
        Self { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Returns a copy of every row committed so far.
    pub fn snapshot(&self) -> Result<Dataset> {
        Ok(self.lock()?.dataset.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| BankStoreError::other("memory store lock poisoned"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditStore for MemoryStore {
    #[tracing::instrument(skip_all, fields(count = records.len()))]
    async fn insert_customer_batch(&self, records: &[CustomerAuditRecord]) -> Result<usize> {
        let mut inner = self.lock()?;
        let dataset = &mut inner.dataset;

        let mut audit_ids: BTreeSet<_> =
            dataset.customers.iter().map(CustomerAuditRecord::audit_id).collect();
        let mut customer_ids: BTreeSet<_> =
            dataset.customers.iter().map(CustomerAuditRecord::customer_id).collect();

        for record in records {
            if !audit_ids.insert(record.audit_id()) {
                return Err(BankStoreError::validation(format!(
                    "duplicate customer audit id {}",
                    record.audit_id()
                )));
            }

            match record.operation() {
                AuditOperation::Insert => {
                    if !customer_ids.insert(record.customer_id()) {
                        return Err(BankStoreError::validation(format!(
                            "customer {} already exists",
                            record.customer_id()
                        )));
                    }
                },
                AuditOperation::Update => {
                    if !customer_ids.contains(&record.customer_id()) {
                        return Err(BankStoreError::referential_gap(format!(
                            "update of unknown customer {}",
                            record.customer_id()
                        )));
                    }
                },
            }
        }

        dataset.customers.extend_from_slice(records);

        Ok(records.len())
    }

    #[tracing::instrument(
        skip_all,
        fields(
            owner = %batch.owner(),
            accounts = batch.accounts().len(),
            links = batch.links().len(),
        ),
    )]
    async fn insert_account_batch(&self, batch: &AccountBatch) -> Result<usize> {
        let mut inner = self.lock()?;
        let dataset = &mut inner.dataset;

        if !dataset.knows_customer(batch.owner()) {
            return Err(BankStoreError::referential_gap(format!(
                "owner {} does not exist",
                batch.owner()
            )));
        }

        let unknown_member =
            batch.member_links().find(|link| !dataset.knows_customer(link.customer_id()));

        if let Some(link) = unknown_member {
            return Err(BankStoreError::referential_gap(format!(
                "member {} of account {} does not exist",
                link.customer_id(),
                link.account_id()
            )));
        }

        let mut audit_ids: BTreeSet<_> =
            dataset.accounts.iter().map(AccountAuditRecord::audit_id).collect();
        let mut account_ids = BTreeSet::new();

        for account in batch.accounts() {
            if dataset.knows_account(account.account_id()) {
                return Err(BankStoreError::validation(format!(
                    "account {} already exists",
                    account.account_id()
                )));
            }

            if !account_ids.insert(account.account_id()) {
                return Err(BankStoreError::validation(format!(
                    "account {} appears twice in the batch",
                    account.account_id()
                )));
            }

            if !audit_ids.insert(account.audit_id()) {
                return Err(BankStoreError::validation(format!(
                    "duplicate account audit id {}",
                    account.audit_id()
                )));
            }
        }

        dataset.accounts.extend_from_slice(batch.accounts());
        dataset.links.extend_from_slice(batch.links());

        Ok(batch.accounts().len() + batch.links().len())
    }

    #[tracing::instrument(skip_all, fields(count = records.len()))]
    async fn insert_transaction_batch(&self, records: &[TransactionRecord]) -> Result<usize> {
        let mut inner = self.lock()?;
        let dataset = &mut inner.dataset;

        let known_accounts: BTreeSet<_> =
            dataset.accounts.iter().map(AccountAuditRecord::account_id).collect();
        let mut transaction_ids: BTreeSet<_> =
            dataset.transactions.iter().map(TransactionRecord::transaction_id).collect();

        for record in records {
            if !known_accounts.contains(&record.account_id()) {
                return Err(BankStoreError::referential_gap(format!(
                    "transaction {} books against unknown account {}",
                    record.transaction_id(),
                    record.account_id()
                )));
            }

            if !transaction_ids.insert(record.transaction_id()) {
                return Err(BankStoreError::validation(format!(
                    "duplicate transaction id {}",
                    record.transaction_id()
                )));
            }
        }

        dataset.transactions.extend_from_slice(records);

        Ok(records.len())
    }

    #[tracing::instrument(skip_all, fields(%customer_id))]
    async fn latest_customer_version(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerAuditRecord>> {
        let inner = self.lock()?;

        let latest = inner
            .dataset
            .customers
            .iter()
            .filter(|record| record.customer_id() == customer_id)
            .max_by_key(|record| record.updated_at())
            .cloned();

        Ok(latest)
    }

    #[tracing::instrument(skip(self))]
    async fn sample_customer_ids(&self, count: usize) -> Result<Vec<CustomerId>> {
        let mut inner = self.lock()?;
        let Inner { dataset, rng } = &mut *inner;

        let distinct: Vec<_> = dataset
            .customers
            .iter()
            .map(CustomerAuditRecord::customer_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(distinct.choose_multiple(rng, count).copied().collect())
    }

    #[tracing::instrument(skip_all)]
    async fn earliest_customer_timestamps(&self) -> Result<BTreeMap<CustomerId, DateTime<Utc>>> {
        let inner = self.lock()?;

        let entries = inner
            .dataset
            .customers
            .iter()
            .map(|record| (record.customer_id(), record.created_at()));

        Ok(earliest_by(entries))
    }

    #[tracing::instrument(skip_all)]
    async fn earliest_account_timestamps(&self) -> Result<BTreeMap<AccountId, DateTime<Utc>>> {
        let inner = self.lock()?;

        let entries =
            inner.dataset.accounts.iter().map(|record| (record.account_id(), record.created_at()));

        Ok(earliest_by(entries))
    }
}

fn earliest_by<K: Ord>(
    entries: impl Iterator<Item = (K, DateTime<Utc>)>,
) -> BTreeMap<K, DateTime<Utc>> {
    entries.fold(BTreeMap::new(), |mut earliest, (key, created_at)| {
        earliest
            .entry(key)
            .and_modify(|current: &mut DateTime<Utc>| *current = (*current).min(created_at))
            .or_insert(created_at);
        earliest
    })
}

#[cfg(test)]
mod tests {
    use bank_datagen_domain::{
        Timestamps,
        account::{AccountStatus, AccountType, LinkAction, LinkRole},
        customer::KycStatus,
        transaction::{Amount, TransactionKind},
    };
    use chrono::{Duration, NaiveDate, TimeZone};
    use uuid::Uuid;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap()
    }

    fn customer(
        n: u128,
        operation: AuditOperation,
        created: u32,
        updated: u32,
    ) -> CustomerAuditRecord {
        let timestamps =
            Timestamps::builder().created_at(at(created)).updated_at(at(updated)).build();

        CustomerAuditRecord::builder()
            .audit_id(Uuid::from_u128(1000 + u128::from(updated) * 100 + n).into())
            .customer_id(Uuid::from_u128(n).into())
            .first_name(format!("first-{updated}"))
            .last_name("Rossi".to_string())
            .date_of_birth(NaiveDate::from_ymd_opt(1980, 1, 1).unwrap())
            .kyc_status(KycStatus::Pending)
            .home_country_code("IT".to_string())
            .timestamps(timestamps)
            .operation(operation)
            .build()
    }

    fn account_batch(owner: u128, account: u128, member: Option<u128>) -> AccountBatch {
        let created_at = at(2);
        let account_id = AccountId::from(Uuid::from_u128(account));

        let record = AccountAuditRecord::builder()
            .audit_id(Uuid::from_u128(5000 + account).into())
            .account_id(account_id)
            .status(AccountStatus::Open)
            .account_type(AccountType::Current)
            .legal_entity("IT".to_string())
            .opened_at(created_at)
            .timestamps(Timestamps::at(created_at))
            .operation(AuditOperation::Insert)
            .build();

        let mut links = vec![
            CustomerAccountLink::builder()
                .customer_id(Uuid::from_u128(owner).into())
                .account_id(account_id)
                .role(LinkRole::Owner)
                .action(LinkAction::Added)
                .created_at(created_at)
                .build(),
        ];

        if let Some(member) = member {
            links.push(
                CustomerAccountLink::builder()
                    .customer_id(Uuid::from_u128(member).into())
                    .account_id(account_id)
                    .role(LinkRole::Member)
                    .action(LinkAction::Added)
                    .created_at(created_at + Duration::minutes(1))
                    .build(),
            );
        }

        AccountBatch::builder()
            .owner(Uuid::from_u128(owner).into())
            .accounts(vec![record])
            .links(links)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn latest_version_has_greatest_updated_at() {
        let store = MemoryStore::with_seed(7);
        store
            .insert_customer_batch(&[customer(1, AuditOperation::Insert, 1, 1)])
            .await
            .unwrap();
        store
            .insert_customer_batch(&[
                customer(1, AuditOperation::Update, 1, 9),
                customer(1, AuditOperation::Update, 1, 4),
            ])
            .await
            .unwrap();

        let latest = store.latest_customer_version(Uuid::from_u128(1).into()).await.unwrap();
        assert_eq!(latest.unwrap().updated_at(), at(9));

        let missing = store.latest_customer_version(Uuid::from_u128(2).into()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn rejected_account_batch_writes_nothing() {
        let store = MemoryStore::with_seed(7);
        store
            .insert_customer_batch(&[customer(1, AuditOperation::Insert, 1, 1)])
            .await
            .unwrap();

        let err = store.insert_account_batch(&account_batch(1, 10, Some(99))).await.unwrap_err();
        assert!(matches!(err, BankStoreError::ReferentialGap(_)));

        let err = store.insert_account_batch(&account_batch(42, 11, None)).await.unwrap_err();
        assert!(matches!(err, BankStoreError::ReferentialGap(_)));

        let dataset = store.snapshot().unwrap();
        assert!(dataset.accounts().is_empty());
        assert!(dataset.links().is_empty());
    }

    #[tokio::test]
    async fn account_ids_must_be_fresh() {
        let store = MemoryStore::with_seed(7);
        store
            .insert_customer_batch(&[customer(1, AuditOperation::Insert, 1, 1)])
            .await
            .unwrap();

        assert_eq!(store.insert_account_batch(&account_batch(1, 10, None)).await.unwrap(), 2);

        let err = store.insert_account_batch(&account_batch(1, 10, None)).await.unwrap_err();
        assert!(matches!(err, BankStoreError::Validation(_)));
    }

    #[tokio::test]
    async fn account_ids_must_be_unique_within_a_batch() {
        let store = MemoryStore::with_seed(7);
        store
            .insert_customer_batch(&[customer(1, AuditOperation::Insert, 1, 1)])
            .await
            .unwrap();

        let single = account_batch(1, 10, None);
        let original = &single.accounts()[0];
        let twin = AccountAuditRecord::builder()
            .audit_id(Uuid::from_u128(6010).into())
            .account_id(original.account_id())
            .status(AccountStatus::Open)
            .account_type(AccountType::Savings)
            .legal_entity("IT".to_string())
            .opened_at(original.created_at())
            .timestamps(Timestamps::at(original.created_at()))
            .operation(AuditOperation::Insert)
            .build();

        let batch = AccountBatch::builder()
            .owner(single.owner())
            .accounts(vec![original.clone(), twin])
            .links(single.links().to_vec())
            .build()
            .unwrap();

        let err = store.insert_account_batch(&batch).await.unwrap_err();
        assert!(matches!(err, BankStoreError::Validation(_)));
        assert!(store.snapshot().unwrap().accounts().is_empty());
    }

    #[tokio::test]
    async fn transactions_need_a_known_account() {
        let store = MemoryStore::with_seed(7);
        let transaction = TransactionRecord::builder()
            .transaction_id(Uuid::from_u128(77).into())
            .account_id(Uuid::from_u128(10).into())
            .kind(TransactionKind::Credit)
            .amount(Amount::from_minor(1_000))
            .booked_at(at(3))
            .build();

        let err = store.insert_transaction_batch(&[transaction]).await.unwrap_err();
        assert!(matches!(err, BankStoreError::ReferentialGap(_)));
        assert!(store.snapshot().unwrap().transactions().is_empty());
    }

    #[tokio::test]
    async fn sampling_returns_distinct_customers() {
        let store = MemoryStore::with_seed(7);
        store
            .insert_customer_batch(&[
                customer(1, AuditOperation::Insert, 1, 1),
                customer(2, AuditOperation::Insert, 1, 1),
                customer(3, AuditOperation::Insert, 1, 1),
            ])
            .await
            .unwrap();
        store
            .insert_customer_batch(&[customer(1, AuditOperation::Update, 1, 5)])
            .await
            .unwrap();

        let mut sampled = store.sample_customer_ids(10).await.unwrap();
        sampled.sort();
        sampled.dedup();
        assert_eq!(sampled.len(), 3);

        assert_eq!(store.sample_customer_ids(2).await.unwrap().len(), 2);
        assert!(MemoryStore::with_seed(1).sample_customer_ids(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn earliest_timestamps_take_the_minimum() {
        let store = MemoryStore::with_seed(7);
        store
            .insert_customer_batch(&[customer(1, AuditOperation::Insert, 3, 3)])
            .await
            .unwrap();
        store
            .insert_customer_batch(&[customer(1, AuditOperation::Update, 3, 8)])
            .await
            .unwrap();

        let earliest = store.earliest_customer_timestamps().await.unwrap();
        assert_eq!(earliest.get(&CustomerId::from(Uuid::from_u128(1))), Some(&at(3)));
        assert!(store.earliest_account_timestamps().await.unwrap().is_empty());
    }
}
