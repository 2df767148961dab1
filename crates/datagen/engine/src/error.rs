use std::borrow::Cow;

use bank_datagen_domain::account::AccountBatchError;
use bank_datagen_store::BankStoreError;

use crate::{fact_source::InvalidRange, sink::SinkError};

/// An error raised by a generator or by the [`DatagenEngine`](crate::DatagenEngine).
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct DatagenEngineError(#[from] DatagenEngineErrorKind);

impl DatagenEngineError {
    /// Returns what went wrong.
    pub fn kind(&self) -> &DatagenEngineErrorKind {
        &self.0
    }
}

/// The categories of [`DatagenEngineError`].
#[derive(Debug, thiserror::Error)]
pub enum DatagenEngineErrorKind {
    /// A sampling interval was empty or inverted.
    ///
    /// Raised instead of clamping, e.g. when an account would have to be created before
    /// its customer.
    #[error("invalid range error: {0}")]
    InvalidRange(#[from] InvalidRange),

    /// A record refers to an id outside the known population.
    #[error("referential gap error: {0}")]
    ReferentialGap(Cow<'static, str>),

    /// The store rejected a batch or could not complete it.
    ///
    /// The batch has been rolled back. It is never retried.
    #[error("persistence error: {0}")]
    Persistence(#[from] BankStoreError),

    /// An assembled account batch violates a link invariant.
    #[error("invalid batch error: {0}")]
    InvalidBatch(#[from] AccountBatchError),

    /// A table could not be exported.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// The fact source could not produce a value different from the previous one.
    #[error("other error: {0}")]
    Other(Cow<'static, str>),
}

impl DatagenEngineErrorKind {
    pub(crate) fn referential_gap<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::ReferentialGap(err.into())
    }

    pub(crate) fn other<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::Other(err.into())
    }
}
