//! Run-scoped cache of existing natural keys.
//!
//! Loaded once at run start with four SELECTs, then consulted for every
//! record instead of issuing per-record lookups. The writer extends the
//! cache after each committed chunk so later chunks see identities created
//! by earlier ones. Access is strictly sequential within a run, so no
//! locking is needed here; the importer serializes concurrent runs.

use sqlx::PgPool;
use std::collections::{HashMap, HashSet};

/// Identity known for an existing client.
#[derive(Debug, Clone)]
pub struct CachedClient {
    pub id: i32,
    pub name: String,
}

/// Natural-key indexes over the store's current contents.
#[derive(Debug, Default)]
pub struct ImportCache {
    /// external client id -> store identity
    clients: HashMap<i64, CachedClient>,
    /// email -> display name
    users: HashMap<String, String>,
    /// external sale ids already persisted
    sales: HashSet<i64>,
    /// invoice numbers already persisted
    invoices: HashSet<String>,
}

impl ImportCache {
    /// Load all four indexes from the store. Called once per run.
    pub async fn preload(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let client_rows: Vec<(i64, i32, String)> =
            sqlx::query_as("SELECT external_id, id, name FROM clients")
                .fetch_all(pool)
                .await?;

        let user_rows: Vec<(String, String)> =
            sqlx::query_as("SELECT email, display_name FROM users")
                .fetch_all(pool)
                .await?;

        let sale_rows: Vec<(i64,)> = sqlx::query_as("SELECT external_sale_id FROM sales")
            .fetch_all(pool)
            .await?;

        let invoice_rows: Vec<(String,)> = sqlx::query_as("SELECT number FROM invoices")
            .fetch_all(pool)
            .await?;

        let cache = Self {
            clients: client_rows
                .into_iter()
                .map(|(external_id, id, name)| (external_id, CachedClient { id, name }))
                .collect(),
            users: user_rows.into_iter().collect(),
            sales: sale_rows.into_iter().map(|(id,)| id).collect(),
            invoices: invoice_rows.into_iter().map(|(n,)| n).collect(),
        };

        log::info!(
            "preloaded cache: {} clients, {} users, {} sales, {} invoices",
            cache.clients.len(),
            cache.users.len(),
            cache.sales.len(),
            cache.invoices.len()
        );

        Ok(cache)
    }

    pub fn client_id(&self, external_id: i64) -> Option<i32> {
        self.clients.get(&external_id).map(|c| c.id)
    }

    pub fn has_user(&self, email: &str) -> bool {
        self.users.contains_key(email)
    }

    pub fn has_sale(&self, external_sale_id: i64) -> bool {
        self.sales.contains(&external_sale_id)
    }

    pub fn has_invoice(&self, number: &str) -> bool {
        self.invoices.contains(number)
    }

    pub fn insert_client(&mut self, external_id: i64, id: i32, name: String) {
        self.clients.insert(external_id, CachedClient { id, name });
    }

    pub fn insert_user(&mut self, email: String, display_name: String) {
        self.users.insert(email, display_name);
    }

    pub fn insert_sale(&mut self, external_sale_id: i64) {
        self.sales.insert(external_sale_id);
    }

    pub fn insert_invoice(&mut self, number: String) {
        self.invoices.insert(number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_reflect_inserts() {
        let mut cache = ImportCache::default();
        assert_eq!(cache.client_id(334), None);
        assert!(!cache.has_user("a@x.com"));
        assert!(!cache.has_sale(9));
        assert!(!cache.has_invoice("F-1"));

        cache.insert_client(334, 7, "Acme".to_string());
        cache.insert_user("a@x.com".to_string(), "A".to_string());
        cache.insert_sale(9);
        cache.insert_invoice("F-1".to_string());

        assert_eq!(cache.client_id(334), Some(7));
        assert!(cache.has_user("a@x.com"));
        assert!(cache.has_sale(9));
        assert!(cache.has_invoice("F-1"));
    }
}
