//! Ledger transactions booked against generated accounts.

use core::fmt;

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{AccountId, TransactionId};

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Money received.
    Credit,
    /// Money spent.
    Debit,
}

/// A monetary amount in minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(i64);

impl Amount {
    /// Creates an amount from minor units.
    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units.
    pub fn minor(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    /// Formats the amount with two decimals, e.g. `1234.05`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// A transaction booked against an account.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct TransactionRecord {
    /// The transaction id.
    transaction_id: TransactionId,

    /// The account the transaction is booked against.
    account_id: AccountId,

    /// Credit or debit.
    kind: TransactionKind,

    /// The booked amount.
    amount: Amount,

    /// When the transaction was booked. Never earlier than the account's creation.
    booked_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Returns the transaction id.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Returns the account id.
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Returns the direction.
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns the amount.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Returns the booking timestamp.
    pub fn booked_at(&self) -> DateTime<Utc> {
        self.booked_at
    }
}
