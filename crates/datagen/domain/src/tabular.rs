//! Mapping from record types to ordered table columns.
//!
//! The column layout of every exported table is declared here, once per record type, and
//! is independent of the field order of the in-memory records.

use alloc::{
    string::{String, ToString},
    vec,
    vec::Vec,
};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    account::{AccountAuditRecord, CustomerAccountLink},
    customer::CustomerAuditRecord,
    transaction::TransactionRecord,
};

/// A record that can be laid out as one row of a named table.
pub trait Tabular {
    /// The destination table.
    const TABLE: &'static str;

    /// Column names, in row order.
    const HEADERS: &'static [&'static str];

    /// Renders the record as one value per header, in header order.
    fn row(&self) -> Vec<String>;
}

impl Tabular for CustomerAuditRecord {
    const TABLE: &'static str = "customer_audit";

    const HEADERS: &'static [&'static str] = &[
        "audit_id",
        "customer_id",
        "first_name",
        "last_name",
        "date_of_birth",
        "kyc_status",
        "home_country_code",
        "created_at",
        "updated_at",
        "audit_operation",
    ];

    fn row(&self) -> Vec<String> {
        vec![
            self.audit_id().to_string(),
            self.customer_id().to_string(),
            self.first_name().to_string(),
            self.last_name().to_string(),
            self.date_of_birth().to_string(),
            self.kyc_status().to_string(),
            self.home_country_code().to_string(),
            timestamp(self.created_at()),
            timestamp(self.updated_at()),
            self.operation().to_string(),
        ]
    }
}

impl Tabular for AccountAuditRecord {
    const TABLE: &'static str = "account_audit";

    const HEADERS: &'static [&'static str] = &[
        "audit_id",
        "account_id",
        "status",
        "opened_at",
        "closed_at",
        "type",
        "legal_entity",
        "created_at",
        "updated_at",
        "audit_operation",
    ];

    fn row(&self) -> Vec<String> {
        vec![
            self.audit_id().to_string(),
            self.account_id().to_string(),
            self.status().to_string(),
            self.opened_at().map(timestamp).unwrap_or_default(),
            self.closed_at().map(timestamp).unwrap_or_default(),
            self.account_type().to_string(),
            self.legal_entity().to_string(),
            timestamp(self.created_at()),
            timestamp(self.updated_at()),
            self.operation().to_string(),
        ]
    }
}

impl Tabular for CustomerAccountLink {
    const TABLE: &'static str = "customer_accounts";

    const HEADERS: &'static [&'static str] =
        &["customer_id", "account_id", "role", "action", "created_at"];

    fn row(&self) -> Vec<String> {
        vec![
            self.customer_id().to_string(),
            self.account_id().to_string(),
            self.role().to_string(),
            self.action().to_string(),
            timestamp(self.created_at()),
        ]
    }
}

impl Tabular for TransactionRecord {
    const TABLE: &'static str = "transactions";

    const HEADERS: &'static [&'static str] =
        &["transaction_id", "account_id", "type", "amount", "booked_at"];

    fn row(&self) -> Vec<String> {
        vec![
            self.transaction_id().to_string(),
            self.account_id().to_string(),
            self.kind().to_string(),
            self.amount().to_string(),
            timestamp(self.booked_at()),
        ]
    }
}

fn timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}
