use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ===== Persisted Row Models =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[allow(dead_code)]
pub struct User {
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[allow(dead_code)]
pub struct Client {
    /// Store-assigned identity, available only after persist.
    pub id: i32,
    /// Source natural key, unique.
    pub external_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[allow(dead_code)]
pub struct Sale {
    pub id: i32,
    /// Source natural key, unique.
    pub external_sale_id: i64,
    pub quote_code: String,
    pub start_date: Option<NaiveDate>,
    pub client_id: i32,
    pub creator_email: Option<String>,
    pub total_value: f64,
    pub quote_value: f64,
    pub state_count: i32,
    /// Status code of the status event with the latest date, 0 if none.
    pub current_status_code: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[allow(dead_code)]
pub struct SaleStatusEvent {
    pub id: i32,
    pub sale_id: i32,
    pub status_code: i32,
    pub event_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[allow(dead_code)]
pub struct Invoice {
    pub id: i32,
    /// Source natural key, unique.
    pub number: String,
    pub billing_date: Option<NaiveDate>,
    pub status_event_count: i32,
    pub external_sale_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[allow(dead_code)]
pub struct InvoiceStatusEvent {
    pub id: i32,
    pub invoice_number: String,
    pub status_code: i32,
    pub event_date: Option<NaiveDate>,
    pub paid: bool,
    pub observation: Option<String>,
    pub actor_email: Option<String>,
    pub external_sale_id: i64,
}
