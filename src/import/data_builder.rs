//! Materialization of staged entities into columnar batch data.
//!
//! Converts the resolver's staging into the parallel-vector structures the
//! bulk insert operations consume. Sales are materialized only once their
//! client reference is resolved; sale status events only once the sale's
//! store identity is known from the post-insert re-query.

use crate::import::cache::ImportCache;
use crate::import::data_structures::{
    ClientsData, InvoiceStatusData, InvoicesData, SaleStatusData, SalesData, UsersData,
};
use crate::import::dates::normalize_opt_date;
use crate::import::decoder::RawStatusEvent;
use crate::import::resolver::{ChunkStaging, ClientRef};
use std::collections::{HashMap, HashSet};

/// Derive the current status code from a sale's status events.
///
/// The event with the latest date wins; ties keep the first seen; events
/// without a parseable date never beat a dated one; no events at all yields
/// code 0.
pub fn current_status_code(events: &[RawStatusEvent]) -> i32 {
    let mut best_code = 0;
    let mut best_date = None;
    let mut seen_any = false;

    for event in events {
        let date = normalize_opt_date(event.date.as_deref());
        if !seen_any || date > best_date {
            best_code = event.status_code.unwrap_or(0);
            best_date = date;
            seen_any = true;
        }
    }

    best_code
}

/// Build the user batch from staged creations.
pub fn build_user_batch_data(staging: &ChunkStaging) -> UsersData {
    let mut data = UsersData::default();
    for (email, display_name) in &staging.new_users {
        data.emails.push(email.clone());
        data.display_names.push(display_name.clone());
    }
    data
}

/// Build the client batch from staged creations.
pub fn build_client_batch_data(staging: &ChunkStaging) -> ClientsData {
    let mut data = ClientsData::default();
    for (external_id, name) in &staging.new_clients {
        data.external_ids.push(*external_id);
        data.names.push(name.clone());
    }
    data
}

/// Build the sale batch from staged associations.
///
/// Skips sales whose external id already exists in the store and sales whose
/// client reference is still pending after the client insert step (the
/// latter are counted as errors). Duplicate external ids within the chunk
/// keep the first occurrence.
pub fn build_sale_batch_data(staging: &ChunkStaging, cache: &ImportCache) -> (SalesData, usize) {
    let mut data = SalesData::default();
    let mut errors = 0;
    let mut seen: HashSet<i64> = HashSet::new();

    for staged in &staging.sales {
        if cache.has_sale(staged.external_sale_id) || !seen.insert(staged.external_sale_id) {
            continue;
        }

        let client_id = match staged.client {
            ClientRef::Resolved(id) => id,
            ClientRef::Pending(external_id) => {
                errors += 1;
                log::warn!(
                    "sale {} references client {} with no assigned id, skipping",
                    staged.external_sale_id,
                    external_id
                );
                continue;
            }
        };

        let record = &staged.record;
        data.external_sale_ids.push(staged.external_sale_id);
        data.quote_codes
            .push(record.quote_code.clone().unwrap_or_default());
        data.start_dates
            .push(normalize_opt_date(record.start_date.as_deref()));
        data.client_ids.push(client_id);
        data.creator_emails.push(record.creator_email.clone());
        data.total_values.push(record.total_value.unwrap_or(0.0));
        data.quote_values.push(record.quote_value.unwrap_or(0.0));
        data.state_counts.push(record.state_count.unwrap_or(0));
        data.current_status_codes
            .push(current_status_code(&record.status_events));
    }

    (data, errors)
}

/// Build the sale status history batch.
///
/// Rewrites each event's sale reference from the natural external id to the
/// store identity learned from the re-query. Events of sales that already
/// existed before this run are skipped; the history table has no uniqueness
/// constraint to fall back on.
pub fn build_sale_status_batch_data(
    staging: &ChunkStaging,
    cache: &ImportCache,
    sale_id_map: &HashMap<i64, i32>,
) -> SaleStatusData {
    let mut data = SaleStatusData::default();
    let mut seen: HashSet<i64> = HashSet::new();

    for staged in &staging.sales {
        if cache.has_sale(staged.external_sale_id) || !seen.insert(staged.external_sale_id) {
            continue;
        }
        let Some(&sale_id) = sale_id_map.get(&staged.external_sale_id) else {
            log::warn!(
                "sale {} not found after insert, dropping its status events",
                staged.external_sale_id
            );
            continue;
        };
        for event in &staged.record.status_events {
            data.sale_ids.push(sale_id);
            data.status_codes.push(event.status_code.unwrap_or(0));
            data.event_dates
                .push(normalize_opt_date(event.date.as_deref()));
        }
    }

    data
}

/// Build the invoice and invoice status batches.
///
/// Invoices whose number already exists in the store are skipped together
/// with their nested status events, as are invoices of sales dropped for an
/// unresolved client reference (their sale row was never created). Duplicate
/// numbers within the chunk keep the first occurrence.
pub fn build_invoice_batch_data(
    staging: &ChunkStaging,
    cache: &ImportCache,
) -> (InvoicesData, InvoiceStatusData) {
    let mut invoices = InvoicesData::default();
    let mut events = InvoiceStatusData::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for staged in &staging.sales {
        if matches!(staged.client, ClientRef::Pending(_)) {
            continue;
        }
        for invoice in &staged.record.invoices {
            if cache.has_invoice(&invoice.number) || !seen.insert(invoice.number.as_str()) {
                continue;
            }

            invoices.numbers.push(invoice.number.clone());
            invoices
                .billing_dates
                .push(normalize_opt_date(invoice.billing_date.as_deref()));
            invoices
                .status_event_counts
                .push(invoice.status_event_count.unwrap_or(0));
            invoices.external_sale_ids.push(staged.external_sale_id);

            for event in &invoice.status_events {
                events.invoice_numbers.push(invoice.number.clone());
                events.status_codes.push(event.status_code.unwrap_or(0));
                events
                    .event_dates
                    .push(normalize_opt_date(event.date.as_deref()));
                events.paid_flags.push(event.paid_flag());
                events.observations.push(event.observation.clone());
                events.actor_emails.push(event.actor_email.clone());
                events.external_sale_ids.push(staged.external_sale_id);
            }
        }
    }

    (invoices, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::resolver::resolve_chunk;
    use serde_json::json;

    fn status_event(code: i32, date: &str) -> RawStatusEvent {
        serde_json::from_value(json!({"status_code": code, "date": date})).unwrap()
    }

    #[test]
    fn latest_date_wins_with_first_seen_ties() {
        let events = vec![
            status_event(0, "2024-01-01"),
            status_event(1, "2024-03-01"),
            status_event(3, "2024-02-01"),
        ];
        assert_eq!(current_status_code(&events), 1);

        let tied = vec![status_event(5, "2024-03-01"), status_event(9, "2024-03-01")];
        assert_eq!(current_status_code(&tied), 5);

        assert_eq!(current_status_code(&[]), 0);
    }

    #[test]
    fn undated_events_lose_to_dated_ones() {
        let events = vec![
            serde_json::from_value::<RawStatusEvent>(json!({"status_code": 7})).unwrap(),
            status_event(2, "2024-01-01"),
        ];
        assert_eq!(current_status_code(&events), 2);
    }

    #[test]
    fn sale_batch_skips_existing_and_unresolved() {
        let mut cache = ImportCache::default();
        cache.insert_client(334, 7, "Acme".to_string());
        cache.insert_sale(100);

        let records = vec![
            serde_json::from_value(json!({
                "external_sale_id": 100, "external_client_id": 334, "quote_code": "COT-1"
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "external_sale_id": 101, "external_client_id": 334, "quote_code": "COT-2",
                "total_value": 5000.0, "state_count": 2
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "external_sale_id": 102, "external_client_id": 999, "quote_code": "COT-3"
            }))
            .unwrap(),
        ];

        let (staging, errors) = resolve_chunk(records, &cache);
        assert_eq!(errors, 0);

        // Client 999 stays pending: no id map pass ran
        let (data, skipped) = build_sale_batch_data(&staging, &cache);
        assert_eq!(skipped, 1);
        assert_eq!(data.external_sale_ids, vec![101]);
        assert_eq!(data.client_ids, vec![7]);
        assert_eq!(data.total_values, vec![5000.0]);
        assert_eq!(data.state_counts, vec![2]);
    }

    #[test]
    fn invoice_batch_skips_cached_numbers_and_their_events() {
        let mut cache = ImportCache::default();
        cache.insert_client(334, 7, "Acme".to_string());
        cache.insert_invoice("F-OLD".to_string());

        let records = vec![serde_json::from_value(json!({
            "external_sale_id": 9, "external_client_id": 334, "quote_code": "COT-1",
            "invoices": [
                {"number": "F-OLD", "status_events": [{"status_code": 1}]},
                {"number": "F-NEW", "billing_date": "25/01/2024",
                 "status_events": [{"status_code": 3, "paid_amount": 1000}]}
            ]
        }))
        .unwrap()];

        let (staging, _) = resolve_chunk(records, &cache);
        let (invoices, events) = build_invoice_batch_data(&staging, &cache);

        assert_eq!(invoices.numbers, vec!["F-NEW"]);
        assert_eq!(events.invoice_numbers, vec!["F-NEW"]);
        assert_eq!(events.paid_flags, vec![true]);
    }

    #[test]
    fn invoice_batch_drops_invoices_of_unresolved_sales() {
        let mut cache = ImportCache::default();
        cache.insert_client(334, 7, "Acme".to_string());

        let records = vec![
            serde_json::from_value(json!({
                "external_sale_id": 1, "external_client_id": 334, "quote_code": "COT-1",
                "invoices": [{"number": "F-1"}]
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "external_sale_id": 2, "external_client_id": 999, "quote_code": "COT-2",
                "invoices": [{"number": "F-2", "status_events": [{"status_code": 1}]}]
            }))
            .unwrap(),
        ];

        // Client 999 never gets an assigned id, so sale 2 is dropped and its
        // invoice must not be materialized either
        let (staging, _) = resolve_chunk(records, &cache);
        let (invoices, events) = build_invoice_batch_data(&staging, &cache);

        assert_eq!(invoices.numbers, vec!["F-1"]);
        assert_eq!(invoices.external_sale_ids, vec![1]);
        assert!(events.invoice_numbers.is_empty());
    }

    #[test]
    fn status_batch_rewrites_to_store_ids() {
        let mut cache = ImportCache::default();
        cache.insert_client(334, 7, "Acme".to_string());

        let records = vec![serde_json::from_value(json!({
            "external_sale_id": 9, "external_client_id": 334, "quote_code": "COT-1",
            "status_events": [{"status_code": 1, "date": "20/01/2024"}, {"status_code": 2}]
        }))
        .unwrap()];

        let (staging, _) = resolve_chunk(records, &cache);
        let ids = HashMap::from([(9_i64, 55_i32)]);
        let data = build_sale_status_batch_data(&staging, &cache, &ids);

        assert_eq!(data.sale_ids, vec![55, 55]);
        assert_eq!(data.status_codes, vec![1, 2]);
    }
}
