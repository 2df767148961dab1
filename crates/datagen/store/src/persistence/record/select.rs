use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::Queryable;
use dissolve_derive::Dissolve;
use uuid::Uuid;

#[derive(Debug, Dissolve, Queryable)]
pub struct CustomerAuditRow {
    audit_id: Uuid,
    customer_id: Uuid,
    first_name: String,
    last_name: String,
    date_of_birth: NaiveDate,
    kyc_status: String,
    home_country_code: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    audit_operation: String,
}
