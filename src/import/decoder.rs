//! Decoding of raw sale export files.
//!
//! Each input file is a JSON document whose top level must be an array of
//! sale objects. Anything else fails the whole file with
//! [`ImportError::MalformedInput`]; other files in the same run proceed
//! independently. Individual array elements that do not deserialize into a
//! [`RawSale`] are skipped and counted by the caller, they never fail the
//! file.
//!
//! Field names accept both English snake_case and the Spanish names used by
//! the source system's exports.

use crate::error::ImportError;
use serde::Deserialize;
use serde_json::Value;

/// A sale record as it appears in the export payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSale {
    #[serde(alias = "id_venta")]
    pub external_sale_id: i64,
    #[serde(default, alias = "codigo_cotizacion")]
    pub quote_code: Option<String>,
    #[serde(default, alias = "fecha_inicio")]
    pub start_date: Option<String>,
    #[serde(default, alias = "id_cliente")]
    pub external_client_id: Option<i64>,
    #[serde(default, alias = "nombre_cliente")]
    pub client_name: Option<String>,
    #[serde(default, alias = "email_creador")]
    pub creator_email: Option<String>,
    #[serde(default, alias = "valor_comercializacion_final")]
    pub total_value: Option<f64>,
    #[serde(default, alias = "valor_cotizacion_final")]
    pub quote_value: Option<f64>,
    #[serde(default, alias = "cantidad_estados")]
    pub state_count: Option<i32>,
    #[serde(default, alias = "estados")]
    pub status_events: Vec<RawStatusEvent>,
    #[serde(default, alias = "facturas")]
    pub invoices: Vec<RawInvoice>,
}

/// A status transition recorded against a sale.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStatusEvent {
    #[serde(default, alias = "estado")]
    pub status_code: Option<i32>,
    #[serde(default, alias = "fecha")]
    pub date: Option<String>,
}

/// An invoice nested inside a sale record.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInvoice {
    #[serde(alias = "numero")]
    pub number: String,
    #[serde(default, alias = "fecha_facturacion")]
    pub billing_date: Option<String>,
    #[serde(default, alias = "cantidad_estados")]
    pub status_event_count: Option<i32>,
    #[serde(default, alias = "estados")]
    pub status_events: Vec<RawInvoiceStatusEvent>,
}

/// A status transition recorded against an invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInvoiceStatusEvent {
    #[serde(default, alias = "estado")]
    pub status_code: Option<i32>,
    #[serde(default, alias = "fecha")]
    pub date: Option<String>,
    /// Kept as a raw value; the paid flag derivation only accepts numbers.
    #[serde(default, alias = "monto_pagado")]
    pub paid_amount: Option<Value>,
    #[serde(default, alias = "observacion")]
    pub observation: Option<String>,
    #[serde(default, alias = "email_usuario")]
    pub actor_email: Option<String>,
}

impl RawInvoiceStatusEvent {
    /// True when the paid amount is numeric and greater than zero.
    pub fn paid_flag(&self) -> bool {
        self.paid_amount
            .as_ref()
            .and_then(Value::as_f64)
            .map(|amount| amount > 0.0)
            .unwrap_or(false)
    }
}

/// Decode a file's bytes into its top-level array of record values.
///
/// The payload must parse as JSON and its top level must be an array;
/// anything else is a file-level `MalformedInput` error.
pub fn decode_payload(name: &str, bytes: &[u8]) -> Result<Vec<Value>, ImportError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| ImportError::MalformedInput {
        name: name.to_string(),
        reason: format!("invalid JSON: {}", e),
    })?;

    match value {
        Value::Array(records) => Ok(records),
        other => Err(ImportError::MalformedInput {
            name: name.to_string(),
            reason: format!("expected a top-level array, got {}", json_type_name(&other)),
        }),
    }
}

/// Decode one array element into a `RawSale`.
pub fn decode_record(value: Value) -> Result<RawSale, serde_json::Error> {
    serde_json::from_value(value)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_array_payloads() {
        let err = decode_payload("sales.json", br#"{"ventas": []}"#).unwrap_err();
        assert!(matches!(err, ImportError::MalformedInput { .. }));

        let err = decode_payload("sales.json", b"not json at all").unwrap_err();
        assert!(matches!(err, ImportError::MalformedInput { .. }));
    }

    #[test]
    fn decodes_english_field_names() {
        let records = decode_payload(
            "sales.json",
            br#"[{"external_sale_id": 9, "quote_code": "COT-9", "external_client_id": 42}]"#,
        )
        .unwrap();
        let sale = decode_record(records[0].clone()).unwrap();
        assert_eq!(sale.external_sale_id, 9);
        assert_eq!(sale.quote_code.as_deref(), Some("COT-9"));
        assert_eq!(sale.external_client_id, Some(42));
        assert!(sale.invoices.is_empty());
    }

    #[test]
    fn decodes_spanish_aliases() {
        let value = json!({
            "id_venta": 12,
            "codigo_cotizacion": "COT-12",
            "fecha_inicio": "10/02/2024",
            "id_cliente": 334,
            "nombre_cliente": "Acme",
            "email_creador": "a.b@x.com",
            "estados": [{"estado": 1, "fecha": "20/01/2024"}],
            "facturas": [{
                "numero": "F-1",
                "fecha_facturacion": "25/01/2024",
                "estados": [{"estado": 3, "fecha": "01/02/2024", "monto_pagado": 1000}]
            }]
        });
        let sale = decode_record(value).unwrap();
        assert_eq!(sale.external_sale_id, 12);
        assert_eq!(sale.client_name.as_deref(), Some("Acme"));
        assert_eq!(sale.status_events.len(), 1);
        assert_eq!(sale.invoices[0].number, "F-1");
        assert!(sale.invoices[0].status_events[0].paid_flag());
    }

    #[test]
    fn paid_flag_requires_a_positive_number() {
        let event = |amount: Value| RawInvoiceStatusEvent {
            status_code: Some(1),
            date: None,
            paid_amount: Some(amount),
            observation: None,
            actor_email: None,
        };
        assert!(!event(json!(0)).paid_flag());
        assert!(event(json!(15000)).paid_flag());
        assert!(!event(json!("15000")).paid_flag());
        let absent = RawInvoiceStatusEvent {
            status_code: None,
            date: None,
            paid_amount: None,
            observation: None,
            actor_email: None,
        };
        assert!(!absent.paid_flag());
    }
}
