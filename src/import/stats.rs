//! Import statistics tracking.
//!
//! Tracks records created during an import run at chunk, file and run
//! granularity. Totals are exact arithmetic sums: run = Σ files = Σ chunks.

use serde::Serialize;

/// Counters for a single import unit (chunk, file or whole run).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    /// Number of sale records inserted
    pub sales_created: usize,
    /// Reserved; no upsert path exists, so this is always 0
    pub sales_updated: usize,
    /// Number of sale records excluded by the quote-code filter
    pub sales_filtered: usize,
    /// Number of client records inserted
    pub clients_created: usize,
    /// Number of invoice records inserted
    pub invoices_created: usize,
    /// Number of sale status history records inserted
    pub sale_status_events_created: usize,
    /// Number of invoice status history records inserted
    pub invoice_status_events_created: usize,
    /// Records or chunks that failed and were skipped
    pub errors: usize,
}

impl ImportStats {
    /// Merge another ImportStats into this one by summing all counts.
    pub fn merge(&mut self, other: &ImportStats) {
        self.sales_created += other.sales_created;
        self.sales_updated += other.sales_updated;
        self.sales_filtered += other.sales_filtered;
        self.clients_created += other.clients_created;
        self.invoices_created += other.invoices_created;
        self.sale_status_events_created += other.sale_status_events_created;
        self.invoice_status_events_created += other.invoice_status_events_created;
        self.errors += other.errors;
    }
}

/// Per-file outcome detail included in the run result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    pub name: String,
    pub size_bytes: usize,
    /// Records decoded from the file before filtering
    pub records: usize,
    pub stats: ImportStats,
    pub elapsed_ms: u128,
    /// Set when the whole file failed (e.g. payload was not an array)
    pub error: Option<String>,
}

/// Run-level result envelope returned to callers.
///
/// Always a success envelope carrying counts; partial failures show up in
/// `totals.errors` and in per-file detail.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub files_processed: usize,
    pub totals: ImportStats,
    pub files: Vec<FileDetail>,
}

impl ImportResult {
    /// Fold a file's outcome into the run totals.
    pub fn record_file(&mut self, detail: FileDetail) {
        self.files_processed += 1;
        self.totals.merge(&detail.stats);
        self.files.push(detail);
    }
}
