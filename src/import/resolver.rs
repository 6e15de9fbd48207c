//! Per-record entity resolution and chunk-local staging.
//!
//! For each valid sale record the resolver decides which referenced users
//! and clients are new versus already known, stages the creations, and
//! records the sale association for materialization once client identities
//! are assigned. A record that cannot be resolved (missing or non-positive
//! client id) is logged with its natural key and counted; it never aborts
//! the chunk.

use crate::import::cache::ImportCache;
use crate::import::decoder::RawSale;
use std::collections::HashMap;

/// Fallback display name when an email's local part yields nothing.
const DEFAULT_DISPLAY_NAME: &str = "Usuario";

/// A client reference as seen by a staged sale.
///
/// `Pending` carries the external id of a client staged in this chunk whose
/// store identity is not assigned yet; it is swapped for `Resolved` in one
/// pass right after the client insert step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRef {
    Resolved(i32),
    Pending(i64),
}

/// A sale association recorded for later materialization.
#[derive(Debug)]
pub struct StagedSale {
    pub external_sale_id: i64,
    pub client: ClientRef,
    pub record: RawSale,
}

/// Entities staged by resolving one chunk of records.
#[derive(Debug, Default)]
pub struct ChunkStaging {
    /// email -> derived display name, unknown users only
    pub new_users: HashMap<String, String>,
    /// external client id -> name, unknown clients only
    pub new_clients: HashMap<i64, String>,
    pub sales: Vec<StagedSale>,
}

impl ChunkStaging {
    /// Resolve every still-pending client reference using the id map learned
    /// from the post-insert re-query.
    pub fn resolve_pending_clients(&mut self, ids: &HashMap<i64, i32>) {
        for staged in &mut self.sales {
            if let ClientRef::Pending(external_id) = staged.client {
                if let Some(&id) = ids.get(&external_id) {
                    staged.client = ClientRef::Resolved(id);
                }
            }
        }
    }
}

/// Derive a display name from an email's local part.
///
/// Splits at `@`, turns `.`, `_` and `-` into spaces and title-cases each
/// word. Empty results fall back to a generic name.
pub fn display_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or("");
    let spaced = local.replace(['.', '_', '-'], " ");

    let name = spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ");

    if name.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        name
    }
}

/// Resolve a chunk of valid records into staged entities.
///
/// Returns the staging plus the number of records rejected as invalid.
pub fn resolve_chunk(records: Vec<RawSale>, cache: &ImportCache) -> (ChunkStaging, usize) {
    let mut staging = ChunkStaging::default();
    let mut errors = 0;

    for record in records {
        match resolve_record(record, cache, &mut staging) {
            Ok(()) => {}
            Err(reason) => {
                errors += 1;
                log::warn!("skipping sale: {}", reason);
            }
        }
    }

    (staging, errors)
}

fn resolve_record(
    record: RawSale,
    cache: &ImportCache,
    staging: &mut ChunkStaging,
) -> Result<(), String> {
    stage_user(record.creator_email.as_deref(), cache, staging);

    let client = match record.external_client_id {
        Some(external_id) if external_id > 0 => match cache.client_id(external_id) {
            Some(id) => ClientRef::Resolved(id),
            None => {
                staging.new_clients.entry(external_id).or_insert_with(|| {
                    record
                        .client_name
                        .clone()
                        .filter(|name| !name.trim().is_empty())
                        .unwrap_or_else(|| format!("Cliente {}", external_id))
                });
                ClientRef::Pending(external_id)
            }
        },
        other => {
            return Err(format!(
                "sale {} has missing or invalid client id {:?}",
                record.external_sale_id, other
            ));
        }
    };

    for invoice in &record.invoices {
        for event in &invoice.status_events {
            stage_user(event.actor_email.as_deref(), cache, staging);
        }
    }

    staging.sales.push(StagedSale {
        external_sale_id: record.external_sale_id,
        client,
        record,
    });

    Ok(())
}

fn stage_user(email: Option<&str>, cache: &ImportCache, staging: &mut ChunkStaging) {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return;
    };
    if cache.has_user(email) || staging.new_users.contains_key(email) {
        return;
    }
    staging
        .new_users
        .insert(email.to_string(), display_name_from_email(email));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_sale(value: serde_json::Value) -> RawSale {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn derives_display_names_from_local_part() {
        assert_eq!(display_name_from_email("a.b@x.com"), "A B");
        assert_eq!(display_name_from_email("juan_perez@empresa.cl"), "Juan Perez");
        assert_eq!(display_name_from_email("maria-jose.soto@x.com"), "Maria Jose Soto");
        assert_eq!(display_name_from_email("JUAN@x.com"), "Juan");
        assert_eq!(display_name_from_email("@x.com"), "Usuario");
        assert_eq!(display_name_from_email("._-@x.com"), "Usuario");
    }

    #[test]
    fn stages_unknown_users_and_clients() {
        let cache = ImportCache::default();
        let records = vec![raw_sale(json!({
            "external_sale_id": 9,
            "external_client_id": 334,
            "client_name": "Acme",
            "creator_email": "a.b@x.com",
            "invoices": [{
                "number": "F-1",
                "status_events": [{"status_code": 3, "actor_email": "c.d@x.com"}]
            }]
        }))];

        let (staging, errors) = resolve_chunk(records, &cache);
        assert_eq!(errors, 0);
        assert_eq!(staging.new_users.get("a.b@x.com").unwrap(), "A B");
        assert_eq!(staging.new_users.get("c.d@x.com").unwrap(), "C D");
        assert_eq!(staging.new_clients.get(&334).unwrap(), "Acme");
        assert_eq!(staging.sales.len(), 1);
        assert_eq!(staging.sales[0].client, ClientRef::Pending(334));
    }

    #[test]
    fn reuses_cached_identities() {
        let mut cache = ImportCache::default();
        cache.insert_client(334, 7, "Acme".to_string());
        cache.insert_user("a.b@x.com".to_string(), "A B".to_string());

        let records = vec![raw_sale(json!({
            "external_sale_id": 9,
            "external_client_id": 334,
            "creator_email": "a.b@x.com"
        }))];

        let (staging, errors) = resolve_chunk(records, &cache);
        assert_eq!(errors, 0);
        assert!(staging.new_users.is_empty());
        assert!(staging.new_clients.is_empty());
        assert_eq!(staging.sales[0].client, ClientRef::Resolved(7));
    }

    #[test]
    fn rejects_missing_or_invalid_client_ids() {
        let cache = ImportCache::default();
        let records = vec![
            raw_sale(json!({"external_sale_id": 1})),
            raw_sale(json!({"external_sale_id": 2, "external_client_id": 0})),
            raw_sale(json!({"external_sale_id": 3, "external_client_id": -5})),
            raw_sale(json!({"external_sale_id": 4, "external_client_id": 10})),
        ];

        let (staging, errors) = resolve_chunk(records, &cache);
        assert_eq!(errors, 3);
        assert_eq!(staging.sales.len(), 1);
        assert_eq!(staging.sales[0].external_sale_id, 4);
    }

    #[test]
    fn pending_clients_resolve_in_one_pass() {
        let cache = ImportCache::default();
        let records = vec![raw_sale(json!({
            "external_sale_id": 9,
            "external_client_id": 334
        }))];
        let (mut staging, _) = resolve_chunk(records, &cache);

        let ids = HashMap::from([(334_i64, 7_i32)]);
        staging.resolve_pending_clients(&ids);
        assert_eq!(staging.sales[0].client, ClientRef::Resolved(7));
    }
}
