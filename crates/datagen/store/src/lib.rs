//! Persistence layer for the banking dataset generator.
//!
//! This crate defines [`AuditStore`], the boundary through which the generators persist
//! audit batches and read back "current state", and provides two implementations:
//!
//! - [`BankStore`] - PostgreSQL, built on [diesel](https://diesel.rs) with async support
//!   and a [deadpool](https://docs.rs/deadpool) connection pool
//! - [`MemoryStore`] - an in-process store used for CSV runs and tests
//!
//! Every insert is all-or-nothing: a batch is either committed whole or not at all.
//!
//! # Usage
//!
//! ```ignore
//! let pool = establish_pool(database_url, max_connections, TlsMode::Disabled).await?;
//! let store = BankStore::new(pool);
//!
//! store.insert_customer_batch(&customers).await?;
//! let latest = store.latest_customer_version(customer_id).await?;
//! ```

mod error;
mod memory;
mod persistence;

pub use self::{
    error::BankStoreError,
    memory::{Dataset, DatasetDissolved, MemoryStore},
    persistence::pool::{DbConn, DbPool, PoolError, TlsMode, establish_pool},
};

use std::collections::BTreeMap;

use bank_datagen_domain::{
    AccountId, CustomerId,
    account::{AccountAuditRecord, AccountBatch, CustomerAccountLink},
    customer::CustomerAuditRecord,
    transaction::TransactionRecord,
};
use chrono::{DateTime, Utc};
use diesel_async::AsyncConnection;
use futures::TryStreamExt;

use self::{
    error::Result,
    persistence::{
        record::{
            insert::{
                NewAccountAuditRecord, NewCustomerAccountRecord, NewCustomerAuditRecord,
                NewTransactionRecord,
            },
            parse_tag,
            select::{CustomerAuditRow, CustomerAuditRowDissolved},
        },
        store,
    },
};

/// The relational store the generators write to and read "current state" from.
///
/// Inserts are atomic per call. Reads never fail on absence: a missing entity is `None`
/// and an empty population is an empty collection.
pub trait AuditStore {
    /// Appends customer audit records in one transaction, returning the row count.
    fn insert_customer_batch(
        &self,
        records: &[CustomerAuditRecord],
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Appends one customer's accounts, then their links, in one transaction.
    ///
    /// Returns the number of rows written across both tables.
    fn insert_account_batch(&self, batch: &AccountBatch)
    -> impl Future<Output = Result<usize>> + Send;

    /// Appends transactions in one transaction, returning the row count.
    fn insert_transaction_batch(
        &self,
        records: &[TransactionRecord],
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Returns the customer audit record with the greatest `updated_at`, if any.
    fn latest_customer_version(
        &self,
        customer_id: CustomerId,
    ) -> impl Future<Output = Result<Option<CustomerAuditRecord>>> + Send;

    /// Returns at most `count` distinct customer ids chosen uniformly at random.
    fn sample_customer_ids(
        &self,
        count: usize,
    ) -> impl Future<Output = Result<Vec<CustomerId>>> + Send;

    /// Returns the earliest `created_at` of every customer.
    fn earliest_customer_timestamps(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<CustomerId, DateTime<Utc>>>> + Send;

    /// Returns the earliest `created_at` of every account.
    fn earliest_account_timestamps(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<AccountId, DateTime<Utc>>>> + Send;
}

/// The PostgreSQL-backed [`AuditStore`].
#[derive(Clone)]
pub struct BankStore {
    pool: DbPool,
}

impl BankStore {
    /// Creates a new `BankStore` instance with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        BankStore { pool }
    }

    async fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().await.map_err(|_| BankStoreError::Pool)
    }
}

impl AuditStore for BankStore {
    #[tracing::instrument(skip_all, fields(count = records.len()))]
    async fn insert_customer_batch(&self, records: &[CustomerAuditRecord]) -> Result<usize> {
        let new_records: Vec<_> = records.iter().map(make_new_customer_audit_record).collect();

        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move {
                    store::save_customer_audit_records(conn, &new_records).await
                })
            })
            .await
            .map_err(BankStoreError::Store)
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
        let new_accounts: Vec<_> =
            batch.accounts().iter().map(make_new_account_audit_record).collect();

        let new_links: Vec<_> =
            batch.links().iter().map(make_new_customer_account_record).collect();

        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move {
                    let accounts = store::save_account_audit_records(conn, &new_accounts).await?;
                    let links = store::save_customer_account_records(conn, &new_links).await?;

                    Ok(accounts + links)
                })
            })
            .await
            .map_err(BankStoreError::Store)
    }

    #[tracing::instrument(skip_all, fields(count = records.len()))]
    async fn insert_transaction_batch(&self, records: &[TransactionRecord]) -> Result<usize> {
        let new_records: Vec<_> = records.iter().map(make_new_transaction_record).collect();

        self.get_conn()
            .await?
            .transaction(|conn| {
                Box::pin(async move { store::save_transaction_records(conn, &new_records).await })
            })
            .await
            .map_err(BankStoreError::Store)
    }

    #[tracing::instrument(skip_all, fields(%customer_id))]
    async fn latest_customer_version(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerAuditRecord>> {
        let mut conn = self.get_conn().await?;

        store::fetch_latest_customer_audit_by_customer_id(&mut conn, customer_id.into())
            .await?
            .map(make_customer_audit_record)
            .transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn sample_customer_ids(&self, count: usize) -> Result<Vec<CustomerId>> {
        let limit = i64::try_from(count).unwrap_or(i64::MAX);

        let mut conn = self.get_conn().await?;
        let ids = store::fetch_random_customer_ids(&mut conn, limit).await?;

        Ok(ids.into_iter().map(CustomerId::from).collect())
    }

    #[tracing::instrument(skip_all)]
    async fn earliest_customer_timestamps(&self) -> Result<BTreeMap<CustomerId, DateTime<Utc>>> {
        let mut conn = self.get_conn().await?;

        let stream = store::stream_earliest_customer_timestamps(&mut conn).await?;

        stream
            .try_fold(BTreeMap::new(), |mut earliest, (id, created_at)| async move {
                if let Some(created_at) = created_at {
                    earliest.insert(CustomerId::from(id), created_at);
                }
                Ok(earliest)
            })
            .await
            .map_err(From::from)
    }

    #[tracing::instrument(skip_all)]
    async fn earliest_account_timestamps(&self) -> Result<BTreeMap<AccountId, DateTime<Utc>>> {
        let mut conn = self.get_conn().await?;

        let stream = store::stream_earliest_account_timestamps(&mut conn).await?;

        stream
            .try_fold(BTreeMap::new(), |mut earliest, (id, created_at)| async move {
                if let Some(created_at) = created_at {
                    earliest.insert(AccountId::from(id), created_at);
                }
                Ok(earliest)
            })
            .await
            .map_err(From::from)
    }
}

fn make_new_customer_audit_record(record: &CustomerAuditRecord) -> NewCustomerAuditRecord<'_> {
    NewCustomerAuditRecord::builder()
        .audit_id(record.audit_id().into())
        .customer_id(record.customer_id().into())
        .first_name(record.first_name())
        .last_name(record.last_name())
        .date_of_birth(record.date_of_birth())
        .kyc_status(<&'static str>::from(record.kyc_status()))
        .home_country_code(record.home_country_code())
        .created_at(record.created_at())
        .updated_at(record.updated_at())
        .audit_operation(<&'static str>::from(record.operation()))
        .build()
}

fn make_new_account_audit_record(record: &AccountAuditRecord) -> NewAccountAuditRecord<'_> {
    NewAccountAuditRecord::builder()
        .audit_id(record.audit_id().into())
        .account_id(record.account_id().into())
        .status(<&'static str>::from(record.status()))
        .maybe_opened_at(record.opened_at())
        .maybe_closed_at(record.closed_at())
        .account_type(<&'static str>::from(record.account_type()))
        .legal_entity(record.legal_entity())
        .created_at(record.created_at())
        .updated_at(record.updated_at())
        .audit_operation(<&'static str>::from(record.operation()))
        .build()
}

fn make_new_customer_account_record(link: &CustomerAccountLink) -> NewCustomerAccountRecord<'_> {
    NewCustomerAccountRecord::builder()
        .customer_id(link.customer_id().into())
        .account_id(link.account_id().into())
        .role(<&'static str>::from(link.role()))
        .action(<&'static str>::from(link.action()))
        .created_at(link.created_at())
        .build()
}

fn make_new_transaction_record(record: &TransactionRecord) -> NewTransactionRecord<'_> {
    NewTransactionRecord::builder()
        .transaction_id(record.transaction_id().into())
        .account_id(record.account_id().into())
        .kind(<&'static str>::from(record.kind()))
        .amount_minor(record.amount().minor())
        .booked_at(record.booked_at())
        .build()
}

fn make_customer_audit_record(row: CustomerAuditRow) -> Result<CustomerAuditRecord> {
    let CustomerAuditRowDissolved {
        audit_id,
        customer_id,
        first_name,
        last_name,
        date_of_birth,
        kyc_status,
        home_country_code,
        created_at,
        updated_at,
        audit_operation,
    } = row.dissolve();

    let timestamps = bank_datagen_domain::Timestamps::builder()
        .created_at(created_at)
        .updated_at(updated_at)
        .build();

    let record = CustomerAuditRecord::builder()
        .audit_id(audit_id.into())
        .customer_id(customer_id.into())
        .first_name(first_name)
        .last_name(last_name)
        .date_of_birth(date_of_birth)
        .kyc_status(parse_tag("kyc_status", &kyc_status)?)
        .home_country_code(home_country_code)
        .timestamps(timestamps)
        .operation(parse_tag("audit_operation", &audit_operation)?)
        .build();

    Ok(record)
}
