pub type Result<T, E = StoreError> = core::result::Result<T, E>;

/// Errors raised by individual queries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The query or its surrounding transaction failed.
    #[error("db error: {0}")]
    Db(#[from] diesel::result::Error),
}
