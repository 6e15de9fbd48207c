//! Import coordination for bulk sale ingestion.
//!
//! The BulkImporter drives the whole pipeline per run:
//! 1. Preload the existing-state cache (once)
//! 2. Decode and filter each file
//! 3. Resolve each chunk's entities against the cache
//! 4. Write the chunk inside one transaction, parents before children
//! 5. Fold chunk stats into file stats, file stats into the run result
//!
//! The chunk loop is strictly sequential: a later chunk may reference a
//! client created by an earlier one, which it sees only through the cache
//! update that follows each commit. A chunk that fails rolls back alone;
//! chunks already committed stay committed and remain reported.

use crate::error::ImportError;
use crate::import::cache::ImportCache;
use crate::import::decoder::{self, RawSale};
use crate::import::filter;
use crate::import::resolver::resolve_chunk;
use crate::import::stats::{FileDetail, ImportResult, ImportStats};
use crate::import::{data_builder, database_operations};
use sqlx::PgPool;
use std::path::Path;
use std::time::Instant;
use tokio::sync::Mutex;

/// Default number of sale records per transactional chunk. Bounds both the
/// transaction size and the staging memory footprint; each sale fans out to
/// its status events, invoices and invoice events.
pub const SALE_IMPORT_BATCH_SIZE: usize = 500;

/// One input file for an import run.
#[derive(Debug, Clone)]
pub struct ImportFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name for reporting.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
            name: name.clone(),
            source,
        })?;
        Ok(Self { name, bytes })
    }
}

/// Identities a committed chunk contributes to the run cache.
#[derive(Debug, Default)]
struct ChunkCacheData {
    users: Vec<(String, String)>,
    clients: Vec<(i64, i32, String)>,
    sales: Vec<i64>,
    invoices: Vec<String>,
}

/// Coordinates bulk import runs against one connection pool.
pub struct BulkImporter {
    pool: PgPool,
    chunk_size: usize,
    /// Serializes runs on this importer. Two runs racing to create the same
    /// natural key could both observe "not present" before either commits;
    /// the unique constraints remain the backstop for other writers.
    run_lock: Mutex<()>,
}

impl BulkImporter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            chunk_size: SALE_IMPORT_BATCH_SIZE,
            run_lock: Mutex::new(()),
        }
    }

    /// Override the chunk size. Values below 1 are clamped to 1.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Import a set of files as one run.
    ///
    /// Always returns a success envelope when the store could be read at
    /// all; file, record and chunk failures show up in the counters. Only
    /// the initial cache preload can fail the run as a whole.
    pub async fn import_files(&self, files: &[ImportFile]) -> Result<ImportResult, ImportError> {
        let _run = self.run_lock.lock().await;

        let mut cache = ImportCache::preload(&self.pool).await?;
        let mut result = ImportResult::default();

        for file in files {
            let detail = self.import_file(file, &mut cache).await;
            log::info!(
                "file {}: {} sales created, {} filtered, {} errors in {} ms",
                detail.name,
                detail.stats.sales_created,
                detail.stats.sales_filtered,
                detail.stats.errors,
                detail.elapsed_ms
            );
            result.record_file(detail);
        }

        Ok(result)
    }

    /// Convenience entry point for paths on disk. A file that cannot be
    /// read fails alone; the other files proceed.
    pub async fn import_paths(&self, paths: &[&Path]) -> Result<ImportResult, ImportError> {
        let mut files = Vec::with_capacity(paths.len());
        let mut unreadable = Vec::new();

        for path in paths {
            match ImportFile::from_path(path) {
                Ok(file) => files.push(file),
                Err(err) => {
                    log::error!("{}", err);
                    unreadable.push(path.display().to_string());
                }
            }
        }

        let mut result = self.import_files(&files).await?;
        for name in unreadable {
            result.record_file(FileDetail {
                name,
                size_bytes: 0,
                records: 0,
                stats: ImportStats {
                    errors: 1,
                    ..Default::default()
                },
                elapsed_ms: 0,
                error: Some("file could not be read".to_string()),
            });
        }

        Ok(result)
    }

    /// Import one file: decode, filter, then the sequential chunk loop.
    async fn import_file(&self, file: &ImportFile, cache: &mut ImportCache) -> FileDetail {
        let started = Instant::now();
        let mut stats = ImportStats::default();

        let values = match decoder::decode_payload(&file.name, &file.bytes) {
            Ok(values) => values,
            Err(err) => {
                log::error!("{}", err);
                stats.errors += 1;
                return FileDetail {
                    name: file.name.clone(),
                    size_bytes: file.bytes.len(),
                    records: 0,
                    stats,
                    elapsed_ms: started.elapsed().as_millis(),
                    error: Some(err.to_string()),
                };
            }
        };

        let mut records: Vec<RawSale> = Vec::with_capacity(values.len());
        for value in values {
            match decoder::decode_record(value) {
                Ok(record) => records.push(record),
                Err(err) => {
                    stats.errors += 1;
                    log::warn!("skipping undecodable record in {}: {}", file.name, err);
                }
            }
        }
        let decoded = records.len();

        let (valid, outcome) = filter::filter_importable(records);
        stats.sales_filtered += outcome.filtered;

        for chunk in valid.chunks(self.chunk_size) {
            match self.import_chunk(chunk, cache).await {
                Ok((chunk_stats, cache_data)) => {
                    apply_cache_data(cache, cache_data);
                    stats.merge(&chunk_stats);
                }
                Err(err) => {
                    // Whole chunk rolled back; every record in it counts
                    log::error!(
                        "chunk of {} records failed and was rolled back: {}",
                        chunk.len(),
                        err
                    );
                    stats.errors += chunk.len();
                }
            }
        }

        FileDetail {
            name: file.name.clone(),
            size_bytes: file.bytes.len(),
            records: decoded,
            stats,
            elapsed_ms: started.elapsed().as_millis(),
            error: None,
        }
    }

    /// Write one chunk inside a single transaction, parents before children.
    ///
    /// Order: users, clients (then re-query assigned ids and resolve pending
    /// references), sales (then re-query), invoices, sale status events,
    /// invoice status events. The re-queries run on the transaction's own
    /// connection so they observe its uncommitted writes.
    async fn import_chunk(
        &self,
        records: &[RawSale],
        cache: &ImportCache,
    ) -> Result<(ImportStats, ChunkCacheData), sqlx::Error> {
        let (mut staging, resolve_errors) = resolve_chunk(records.to_vec(), cache);

        let mut tx = self.pool.begin().await?;

        let users_data = data_builder::build_user_batch_data(&staging);
        database_operations::insert_users_batch(&mut *tx, &users_data).await?;

        let clients_data = data_builder::build_client_batch_data(&staging);
        let clients_created =
            database_operations::insert_clients_batch(&mut *tx, &clients_data).await?;
        let client_ids =
            database_operations::load_client_ids(&mut *tx, &clients_data.external_ids).await?;
        staging.resolve_pending_clients(&client_ids);

        let (sales_data, unresolved) = data_builder::build_sale_batch_data(&staging, cache);
        let sales_created = database_operations::insert_sales_batch(&mut *tx, &sales_data).await?;
        let sale_ids =
            database_operations::load_sale_ids(&mut *tx, &sales_data.external_sale_ids).await?;

        let sale_status_data =
            data_builder::build_sale_status_batch_data(&staging, cache, &sale_ids);
        let (invoices_data, invoice_status_data) =
            data_builder::build_invoice_batch_data(&staging, cache);

        let invoices_created =
            database_operations::insert_invoices_batch(&mut *tx, &invoices_data).await?;
        let sale_status_created =
            database_operations::insert_sale_status_batch(&mut *tx, &sale_status_data).await?;
        let invoice_status_created =
            database_operations::insert_invoice_status_batch(&mut *tx, &invoice_status_data)
                .await?;

        tx.commit().await?;

        let cache_data = ChunkCacheData {
            users: staging.new_users.clone().into_iter().collect(),
            clients: client_ids
                .iter()
                .map(|(&external_id, &id)| {
                    let name = staging
                        .new_clients
                        .get(&external_id)
                        .cloned()
                        .unwrap_or_default();
                    (external_id, id, name)
                })
                .collect(),
            sales: sales_data.external_sale_ids.clone(),
            invoices: invoices_data.numbers.clone(),
        };

        let stats = ImportStats {
            sales_created,
            sales_updated: 0,
            sales_filtered: 0,
            clients_created,
            invoices_created,
            sale_status_events_created: sale_status_created,
            invoice_status_events_created: invoice_status_created,
            errors: resolve_errors + unresolved,
        };

        Ok((stats, cache_data))
    }
}

/// Fold a committed chunk's identities into the run cache so later chunks
/// resolve against them instead of re-staging.
fn apply_cache_data(cache: &mut ImportCache, data: ChunkCacheData) {
    for (email, display_name) in data.users {
        cache.insert_user(email, display_name);
    }
    for (external_id, id, name) in data.clients {
        cache.insert_client(external_id, id, name);
    }
    for external_sale_id in data.sales {
        cache.insert_sale(external_sale_id);
    }
    for number in data.invoices {
        cache.insert_invoice(number);
    }
}
