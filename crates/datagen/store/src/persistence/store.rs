mod error;

pub use self::error::StoreError;

use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, QueryDsl, dsl, result::OptionalExtension};
use diesel_async::RunQueryDsl;
use futures::{Stream, TryStreamExt};
use uuid::Uuid;

use super::{
    pool::DbConn,
    record::{
        insert::{
            NewAccountAuditRecord, NewCustomerAccountRecord, NewCustomerAuditRecord,
            NewTransactionRecord,
        },
        select::CustomerAuditRow,
    },
    schema,
};

use self::error::Result;

diesel::define_sql_function! {
    fn random() -> diesel::sql_types::Double;
}

pub async fn save_customer_audit_records(
    conn: &mut DbConn,
    records: &[NewCustomerAuditRecord<'_>],
) -> Result<usize> {
    diesel::insert_into(schema::customer_audit::table)
        .values(records)
        .execute(conn)
        .await
        .map_err(From::from)
}

pub async fn save_account_audit_records(
    conn: &mut DbConn,
    records: &[NewAccountAuditRecord<'_>],
) -> Result<usize> {
    diesel::insert_into(schema::account_audit::table)
        .values(records)
        .execute(conn)
        .await
        .map_err(From::from)
}

pub async fn save_customer_account_records(
    conn: &mut DbConn,
    records: &[NewCustomerAccountRecord<'_>],
) -> Result<usize> {
    diesel::insert_into(schema::customer_accounts::table)
        .values(records)
        .execute(conn)
        .await
        .map_err(From::from)
}

pub async fn save_transaction_records(
    conn: &mut DbConn,
    records: &[NewTransactionRecord<'_>],
) -> Result<usize> {
    diesel::insert_into(schema::transactions::table)
        .values(records)
        .execute(conn)
        .await
        .map_err(From::from)
}

pub async fn fetch_latest_customer_audit_by_customer_id(
    conn: &mut DbConn,
    customer_id: Uuid,
) -> Result<Option<CustomerAuditRow>> {
    schema::customer_audit::table
        .filter(schema::customer_audit::customer_id.eq(customer_id))
        .order_by(schema::customer_audit::updated_at.desc())
        .select(schema::customer_audit::all_columns)
        .first(conn)
        .await
        .optional()
        .map_err(From::from)
}

pub async fn fetch_random_customer_ids(
    conn: &mut DbConn,
    limit: i64,
) -> Result<Vec<Uuid>> {
    schema::customer_audit::table
        .group_by(schema::customer_audit::customer_id)
        .select(schema::customer_audit::customer_id)
        .order_by(random())
        .limit(limit)
        .load(conn)
        .await
        .map_err(From::from)
}

pub async fn stream_earliest_customer_timestamps(
    conn: &mut DbConn,
) -> Result<impl Stream<Item = Result<(Uuid, Option<DateTime<Utc>>)>>> {
    let stream = schema::customer_audit::table
        .group_by(schema::customer_audit::customer_id)
        .select((
            schema::customer_audit::customer_id,
            dsl::min(schema::customer_audit::created_at),
        ))
        .load_stream::<(Uuid, Option<DateTime<Utc>>)>(conn)
        .await?
        .map_err(From::from);

    Ok(stream)
}

pub async fn stream_earliest_account_timestamps(
    conn: &mut DbConn,
) -> Result<impl Stream<Item = Result<(Uuid, Option<DateTime<Utc>>)>>> {
    let stream = schema::account_audit::table
        .group_by(schema::account_audit::account_id)
        .select((schema::account_audit::account_id, dsl::min(schema::account_audit::created_at)))
        .load_stream::<(Uuid, Option<DateTime<Utc>>)>(conn)
        .await?
        .map_err(From::from);

    Ok(stream)
}
