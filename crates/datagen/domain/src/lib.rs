//! Domain types for the banking dataset generator.
//!
//! This crate provides the audit-style records produced by the generators: customer and
//! account audit records, customer-account links and ledger transactions. Every record is
//! an immutable snapshot; "current state" is derived by the store from the most recent
//! snapshot of an entity.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod account;
pub mod customer;
pub mod tabular;
pub mod transaction;

use core::fmt;

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Lifecycle timestamps shared by every audit record.
///
/// `created_at` is fixed when an entity first appears and is carried verbatim into every
/// later version, while `updated_at` marks the instant of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, Dissolve)]
pub struct Timestamps {
    /// The timestamp when the entity was created.
    created_at: DateTime<Utc>,
    /// The timestamp of this version of the entity.
    updated_at: DateTime<Utc>,
}

impl Timestamps {
    /// Timestamps of a freshly inserted entity, created and updated at the same instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { created_at: instant, updated_at: instant }
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// The kind of change an audit record captures.
///
/// Persisted as the single-letter tags `I` and `U`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
pub enum AuditOperation {
    /// The first snapshot of an entity.
    #[strum(serialize = "I")]
    Insert,
    /// A later snapshot of an existing entity.
    #[strum(serialize = "U")]
    Update,
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Uuid);

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from($name(uuid): $name) -> Self {
                uuid
            }
        }

        impl From<&$name> for Uuid {
            fn from($name(uuid): &$name) -> Self {
                *uuid
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id! {
    /// Identifies one audit snapshot. Never shared between two records.
    AuditId
}

entity_id! {
    /// Identifies a customer across all of its audit versions.
    CustomerId
}

entity_id! {
    /// Identifies an account across all of its audit versions.
    AccountId
}

entity_id! {
    /// Identifies a ledger transaction.
    TransactionId
}
