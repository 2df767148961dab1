use bon::Builder;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::Insertable;
use uuid::Uuid;

use crate::persistence::schema;

#[derive(Debug, Builder, Insertable)]
#[diesel(table_name = schema::customer_audit)]
pub struct NewCustomerAuditRecord<'a> {
    audit_id: Uuid,
    customer_id: Uuid,
    first_name: &'a str,
    last_name: &'a str,
    date_of_birth: NaiveDate,
    kyc_status: &'a str,
    home_country_code: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    audit_operation: &'a str,
}

#[derive(Debug, Builder, Insertable)]
#[diesel(table_name = schema::account_audit)]
pub struct NewAccountAuditRecord<'a> {
    audit_id: Uuid,
    account_id: Uuid,
    status: &'a str,
    opened_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    account_type: &'a str,
    legal_entity: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    audit_operation: &'a str,
}

#[derive(Debug, Builder, Insertable)]
#[diesel(table_name = schema::customer_accounts)]
pub struct NewCustomerAccountRecord<'a> {
    customer_id: Uuid,
    account_id: Uuid,
    role: &'a str,
    action: &'a str,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Builder, Insertable)]
#[diesel(table_name = schema::transactions)]
pub struct NewTransactionRecord<'a> {
    transaction_id: Uuid,
    account_id: Uuid,
    kind: &'a str,
    amount_minor: i64,
    booked_at: DateTime<Utc>,
}
