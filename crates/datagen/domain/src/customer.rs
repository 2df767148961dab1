//! Customer audit records.

use alloc::string::String;

use bon::Builder;
use chrono::{DateTime, NaiveDate, Utc};
use dissolve_derive::Dissolve;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{AuditId, AuditOperation, CustomerId, Timestamps};

/// Know-your-customer verification state.
///
/// Generated updates only ever move a customer from [`KycStatus::Pending`] to
/// [`KycStatus::Verified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    /// Verification has not completed yet.
    Pending,
    /// The customer passed verification.
    Verified,
    /// The customer failed verification.
    Failed,
}

/// One snapshot of a customer.
///
/// Every version carries the full set of field values, not a diff against the previous
/// version. All versions of a customer share `customer_id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct CustomerAuditRecord {
    /// The identifier of this snapshot.
    audit_id: AuditId,

    /// The customer this snapshot describes.
    customer_id: CustomerId,

    /// Given name.
    first_name: String,

    /// Family name.
    last_name: String,

    /// Date of birth.
    date_of_birth: NaiveDate,

    /// KYC verification state.
    kyc_status: KycStatus,

    /// ISO 3166 alpha-2 code of the country whose terms the customer accepted.
    home_country_code: String,

    /// Creation and snapshot timestamps.
    timestamps: Timestamps,

    /// Whether this snapshot is the first one or a later one.
    operation: AuditOperation,
}

impl CustomerAuditRecord {
    /// Returns the snapshot id.
    pub fn audit_id(&self) -> AuditId {
        self.audit_id
    }

    /// Returns the customer id.
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the given name.
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Returns the family name.
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Returns the date of birth.
    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }

    /// Returns the KYC status.
    pub fn kyc_status(&self) -> KycStatus {
        self.kyc_status
    }

    /// Returns the home country code.
    pub fn home_country_code(&self) -> &str {
        &self.home_country_code
    }

    /// Returns both lifecycle timestamps.
    pub fn timestamps(&self) -> Timestamps {
        self.timestamps
    }

    /// Returns the creation timestamp, identical across all versions of the customer.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.timestamps.created_at()
    }

    /// Returns the timestamp of this version.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.timestamps.updated_at()
    }

    /// Returns the audit operation.
    pub fn operation(&self) -> AuditOperation {
        self.operation
    }

    /// Returns `true` if no mutable field differs between `self` and `other`.
    ///
    /// The mutable fields are the first name, the last name and the date of birth.
    pub fn same_mutable_fields(&self, other: &Self) -> bool {
        self.first_name == other.first_name
            && self.last_name == other.last_name
            && self.date_of_birth == other.date_of_birth
    }
}
