use std::borrow::Cow;

use crate::persistence::store::StoreError;

pub type Result<T, E = BankStoreError> = core::result::Result<T, E>;

/// Errors that can occur when interacting with the store
#[derive(Debug, thiserror::Error)]
pub enum BankStoreError {
    /// A database-level error occurred.
    ///
    /// This wraps errors from the underlying persistence layer, including
    /// connection issues, query failures, and rolled back transactions.
    #[error("database error: {0}")]
    Store(#[from] StoreError),

    /// A batch references an entity that does not exist in the store.
    ///
    /// Returned by [`MemoryStore`](crate::MemoryStore) when an account batch names an
    /// unknown owner or member, or when a transaction is booked against an unknown
    /// account. The PostgreSQL schema has no foreign keys, so
    /// [`BankStore`](crate::BankStore) never returns it.
    #[error("referential gap: {0}")]
    ReferentialGap(Cow<'static, str>),

    /// A batch conflicts with rows already in the store.
    ///
    /// Returned when an id that must be fresh is already present.
    #[error("validation error: {0}")]
    Validation(Cow<'static, str>),

    /// Failed to acquire a database connection from the pool.
    ///
    /// This typically indicates the connection pool is exhausted or
    /// the database is unavailable.
    #[error("pool error")]
    Pool,

    /// A stored value could not be converted back into its domain type.
    #[error("invalid value error: {0}")]
    InvalidValue(Cow<'static, str>),

    /// An unclassified error occurred.
    #[error("other error: {0}")]
    Other(Cow<'static, str>),
}

impl BankStoreError {
    /// Creates a `ReferentialGap` error from any type that can be converted to a string.
    pub fn referential_gap<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::ReferentialGap(err.into())
    }

    /// Creates a `Validation` error from any type that can be converted to a string.
    pub fn validation<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::Validation(err.into())
    }

    /// Creates an `Other` error from any type that can be converted to a string.
    pub fn other<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::Other(err.into())
    }
}
