//! Columnar data structures for bulk database operations.
//!
//! Each struct holds parallel vectors (one per column) ready for
//! PostgreSQL UNNEST bulk inserts. All vectors in a struct must have the
//! same length; each index is one row.

use chrono::NaiveDate;

/// Prepared user rows.
#[derive(Debug, Default)]
pub struct UsersData {
    pub emails: Vec<String>,
    pub display_names: Vec<String>,
}

/// Prepared client rows.
#[derive(Debug, Default)]
pub struct ClientsData {
    pub external_ids: Vec<i64>,
    pub names: Vec<String>,
}

/// Prepared sale rows.
#[derive(Debug, Default)]
pub struct SalesData {
    pub external_sale_ids: Vec<i64>,
    pub quote_codes: Vec<String>,
    pub start_dates: Vec<Option<NaiveDate>>,
    pub client_ids: Vec<i32>,
    pub creator_emails: Vec<Option<String>>,
    pub total_values: Vec<f64>,
    pub quote_values: Vec<f64>,
    pub state_counts: Vec<i32>,
    pub current_status_codes: Vec<i32>,
}

/// Prepared sale status history rows.
#[derive(Debug, Default)]
pub struct SaleStatusData {
    pub sale_ids: Vec<i32>,
    pub status_codes: Vec<i32>,
    pub event_dates: Vec<Option<NaiveDate>>,
}

/// Prepared invoice rows.
#[derive(Debug, Default)]
pub struct InvoicesData {
    pub numbers: Vec<String>,
    pub billing_dates: Vec<Option<NaiveDate>>,
    pub status_event_counts: Vec<i32>,
    pub external_sale_ids: Vec<i64>,
}

/// Prepared invoice status history rows.
#[derive(Debug, Default)]
pub struct InvoiceStatusData {
    pub invoice_numbers: Vec<String>,
    pub status_codes: Vec<i32>,
    pub event_dates: Vec<Option<NaiveDate>>,
    pub paid_flags: Vec<bool>,
    pub observations: Vec<Option<String>>,
    pub actor_emails: Vec<Option<String>>,
    pub external_sale_ids: Vec<i64>,
}
