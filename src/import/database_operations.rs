//! Bulk database insert operations.
//!
//! Multi-row inserts use PostgreSQL UNNEST over parallel arrays; duplicates
//! on natural keys are skipped with `ON CONFLICT ... DO NOTHING` and the
//! created counts come from `rows_affected()`. Bulk inserts cannot return
//! per-row generated ids, so dependents learn them through a natural-key
//! re-query on the same connection (read-your-writes inside the chunk's
//! transaction).

use crate::import::data_structures::{
    ClientsData, InvoiceStatusData, InvoicesData, SaleStatusData, SalesData, UsersData,
};
use sqlx::PgConnection;
use std::collections::HashMap;

/// Insert a batch of users, skipping emails that already exist.
pub async fn insert_users_batch(
    conn: &mut PgConnection,
    data: &UsersData,
) -> Result<usize, sqlx::Error> {
    if data.emails.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO users (email, display_name)
           SELECT * FROM UNNEST($1::text[], $2::text[])
           ON CONFLICT (email) DO NOTHING"#,
    )
    .bind(&data.emails)
    .bind(&data.display_names)
    .execute(&mut *conn)
    .await?;

    let rows_affected = result.rows_affected() as usize;
    log::trace!("bulk inserted {} users", rows_affected);
    Ok(rows_affected)
}

/// Insert a batch of clients, skipping external ids that already exist.
pub async fn insert_clients_batch(
    conn: &mut PgConnection,
    data: &ClientsData,
) -> Result<usize, sqlx::Error> {
    if data.external_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO clients (external_id, name)
           SELECT * FROM UNNEST($1::bigint[], $2::text[])
           ON CONFLICT (external_id) DO NOTHING"#,
    )
    .bind(&data.external_ids)
    .bind(&data.names)
    .execute(&mut *conn)
    .await?;

    let rows_affected = result.rows_affected() as usize;
    log::trace!("bulk inserted {} clients", rows_affected);
    Ok(rows_affected)
}

/// Load store-assigned client ids for a set of external ids.
pub async fn load_client_ids(
    conn: &mut PgConnection,
    external_ids: &[i64],
) -> Result<HashMap<i64, i32>, sqlx::Error> {
    if external_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i64, i32)> =
        sqlx::query_as("SELECT external_id, id FROM clients WHERE external_id = ANY($1)")
            .bind(external_ids)
            .fetch_all(&mut *conn)
            .await?;

    Ok(rows.into_iter().collect())
}

/// Insert a batch of sales, skipping external sale ids that already exist.
pub async fn insert_sales_batch(
    conn: &mut PgConnection,
    data: &SalesData,
) -> Result<usize, sqlx::Error> {
    if data.external_sale_ids.is_empty() {
        return Ok(0);
    }

    let count = data.external_sale_ids.len();

    let result = sqlx::query(
        r#"INSERT INTO sales (
            external_sale_id, quote_code, start_date, client_id, creator_email,
            total_value, quote_value, state_count, current_status_code
           )
           SELECT * FROM UNNEST(
               $1::bigint[], $2::text[], $3::date[], $4::int[], $5::text[],
               $6::float8[], $7::float8[], $8::int[], $9::int[]
           )
           ON CONFLICT (external_sale_id) DO NOTHING"#,
    )
    .bind(&data.external_sale_ids)
    .bind(&data.quote_codes)
    .bind(&data.start_dates)
    .bind(&data.client_ids)
    .bind(&data.creator_emails)
    .bind(&data.total_values)
    .bind(&data.quote_values)
    .bind(&data.state_counts)
    .bind(&data.current_status_codes)
    .execute(&mut *conn)
    .await?;

    let rows_affected = result.rows_affected() as usize;
    if rows_affected < count {
        log::debug!(
            "insert_sales_batch: {} prepared, {} inserted ({} skipped on conflict)",
            count,
            rows_affected,
            count - rows_affected
        );
    }

    log::trace!("bulk inserted {} sales", rows_affected);
    Ok(rows_affected)
}

/// Load store-assigned sale ids for a set of external sale ids.
pub async fn load_sale_ids(
    conn: &mut PgConnection,
    external_sale_ids: &[i64],
) -> Result<HashMap<i64, i32>, sqlx::Error> {
    if external_sale_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i64, i32)> =
        sqlx::query_as("SELECT external_sale_id, id FROM sales WHERE external_sale_id = ANY($1)")
            .bind(external_sale_ids)
            .fetch_all(&mut *conn)
            .await?;

    Ok(rows.into_iter().collect())
}

/// Insert a batch of invoices, skipping numbers that already exist.
pub async fn insert_invoices_batch(
    conn: &mut PgConnection,
    data: &InvoicesData,
) -> Result<usize, sqlx::Error> {
    if data.numbers.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO invoices (number, billing_date, status_event_count, external_sale_id)
           SELECT * FROM UNNEST($1::text[], $2::date[], $3::int[], $4::bigint[])
           ON CONFLICT (number) DO NOTHING"#,
    )
    .bind(&data.numbers)
    .bind(&data.billing_dates)
    .bind(&data.status_event_counts)
    .bind(&data.external_sale_ids)
    .execute(&mut *conn)
    .await?;

    let rows_affected = result.rows_affected() as usize;
    log::trace!("bulk inserted {} invoices", rows_affected);
    Ok(rows_affected)
}

/// Insert a batch of sale status history rows. No uniqueness constraint
/// exists on this table; callers only pass events of newly created sales.
pub async fn insert_sale_status_batch(
    conn: &mut PgConnection,
    data: &SaleStatusData,
) -> Result<usize, sqlx::Error> {
    if data.sale_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO sale_status_history (sale_id, status_code, event_date)
           SELECT * FROM UNNEST($1::int[], $2::int[], $3::date[])"#,
    )
    .bind(&data.sale_ids)
    .bind(&data.status_codes)
    .bind(&data.event_dates)
    .execute(&mut *conn)
    .await?;

    let rows_affected = result.rows_affected() as usize;
    log::trace!("bulk inserted {} sale status events", rows_affected);
    Ok(rows_affected)
}

/// Insert a batch of invoice status history rows.
pub async fn insert_invoice_status_batch(
    conn: &mut PgConnection,
    data: &InvoiceStatusData,
) -> Result<usize, sqlx::Error> {
    if data.invoice_numbers.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO invoice_status_history (
            invoice_number, status_code, event_date, paid, observation,
            actor_email, external_sale_id
           )
           SELECT * FROM UNNEST(
               $1::text[], $2::int[], $3::date[], $4::bool[], $5::text[],
               $6::text[], $7::bigint[]
           )"#,
    )
    .bind(&data.invoice_numbers)
    .bind(&data.status_codes)
    .bind(&data.event_dates)
    .bind(&data.paid_flags)
    .bind(&data.observations)
    .bind(&data.actor_emails)
    .bind(&data.external_sale_ids)
    .execute(&mut *conn)
    .await?;

    let rows_affected = result.rows_affected() as usize;
    log::trace!("bulk inserted {} invoice status events", rows_affected);
    Ok(rows_affected)
}
