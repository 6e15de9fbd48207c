//! Business-rule filtering of sale records.
//!
//! Sales whose quote code is missing, empty, or carries one of the excluded
//! prefixes are dropped before any resolution or database work. This is a
//! total function: it cannot fail, it only partitions and counts.

use crate::import::decoder::RawSale;

/// Quote-code prefixes excluded from import (compared after trim + uppercase).
pub const EXCLUDED_QUOTE_PREFIXES: [&str; 3] = ["ADI", "OTR", "SPD"];

/// Counts emitted by the filter stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub processed: usize,
    pub valid: usize,
    pub filtered: usize,
}

/// True when a sale should be imported.
pub fn is_importable(sale: &RawSale) -> bool {
    let Some(code) = sale.quote_code.as_deref() else {
        return false;
    };
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return false;
    }
    !EXCLUDED_QUOTE_PREFIXES
        .iter()
        .any(|prefix| code.starts_with(prefix))
}

/// Partition records into the importable subsequence, counting the rest.
pub fn filter_importable(records: Vec<RawSale>) -> (Vec<RawSale>, FilterOutcome) {
    let mut outcome = FilterOutcome {
        processed: records.len(),
        ..Default::default()
    };

    let valid: Vec<RawSale> = records.into_iter().filter(is_importable).collect();
    outcome.valid = valid.len();
    outcome.filtered = outcome.processed - outcome.valid;

    log::debug!(
        "filter: {} processed, {} valid, {} filtered",
        outcome.processed,
        outcome.valid,
        outcome.filtered
    );

    (valid, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale_with_code(code: Option<&str>) -> RawSale {
        let code_field = match code {
            Some(c) => format!(r#""quote_code": {:?},"#, c),
            None => String::new(),
        };
        serde_json::from_str(&format!(r#"{{{} "external_sale_id": 1}}"#, code_field)).unwrap()
    }

    #[test]
    fn excludes_prefixed_missing_and_empty_codes() {
        assert!(!is_importable(&sale_with_code(Some("ADI-100"))));
        assert!(!is_importable(&sale_with_code(Some("  otr-2 "))));
        assert!(!is_importable(&sale_with_code(Some("spd999"))));
        assert!(!is_importable(&sale_with_code(Some(""))));
        assert!(!is_importable(&sale_with_code(Some("   "))));
        assert!(!is_importable(&sale_with_code(None)));
    }

    #[test]
    fn keeps_everything_else() {
        assert!(is_importable(&sale_with_code(Some("COT-1"))));
        assert!(is_importable(&sale_with_code(Some("cot-adi"))));
        // Prefix must be at the start, not anywhere in the code
        assert!(is_importable(&sale_with_code(Some("X-ADI"))));
    }

    #[test]
    fn outcome_counts_add_up() {
        let records = vec![
            sale_with_code(Some("COT-1")),
            sale_with_code(Some("ADI-1")),
            sale_with_code(None),
            sale_with_code(Some("COT-2")),
        ];
        let (valid, outcome) = filter_importable(records);
        assert_eq!(valid.len(), 2);
        assert_eq!(
            outcome,
            FilterOutcome {
                processed: 4,
                valid: 2,
                filtered: 2
            }
        );
    }
}
