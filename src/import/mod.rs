//! Bulk sale import pipeline.
//!
//! This module ingests JSON sale exports into the relational store:
//!
//! 1. **Decoding** (`decoder`) - Parses file bytes into raw sale records
//! 2. **Filtering** (`filter`) - Drops sales excluded by quote-code rule
//! 3. **Caching** (`cache`) - One-time preload of existing natural keys
//! 4. **Resolution** (`resolver`) - Stages new users/clients per chunk
//! 5. **Materialization** (`data_builder`) - Columnar batches for UNNEST
//! 6. **Writing** (`database_operations` + `coordinator`) - Chunked,
//!    dependency-ordered transactional inserts
//! 7. **Aggregation** (`stats`) - Chunk, file and run counters
//!
//! # Architecture
//!
//! Each chunk is one transaction; writes go parents before children (users,
//! clients, sales, invoices, status histories) because bulk inserts cannot
//! return generated ids and dependents must re-query them by natural key.
//! The chunk loop is sequential by design: later chunks depend on identities
//! committed by earlier ones.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use sales_ingest::import::{BulkImporter, ImportFile};
//!
//! let importer = BulkImporter::new(pool);
//! let result = importer
//!     .import_files(&[ImportFile::new("sales.json", bytes)])
//!     .await?;
//!
//! println!("created {} sales", result.totals.sales_created);
//! ```

pub mod cache;
pub mod coordinator;
pub mod data_builder;
pub mod data_structures;
pub mod database_operations;
pub mod dates;
pub mod decoder;
pub mod filter;
pub mod resolver;
pub mod stats;

// Re-export main types
pub use coordinator::{BulkImporter, ImportFile, SALE_IMPORT_BATCH_SIZE};
pub use stats::{FileDetail, ImportResult, ImportStats};
