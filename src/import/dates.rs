//! Date normalization for imported payloads.
//!
//! Source exports carry dates in several textual shapes, most commonly
//! `DD/MM/YYYY`. Every date-bearing field goes through [`normalize_date`]
//! before persistence so the store only ever sees canonical calendar dates.
//! Unparseable input becomes an absent value plus a warning, never an error.

use chrono::NaiveDate;

/// Formats tried before falling back to `dateparser`.
const KNOWN_FORMATS: [&str; 4] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];

/// Parse a textual date into a `NaiveDate`.
///
/// Returns `None` (with a warning) when the input is empty or matches no
/// known form.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in KNOWN_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    match dateparser::parse(trimmed) {
        Ok(dt) => Some(dt.date_naive()),
        Err(source) => {
            log::warn!("unparseable date `{}`: {}", trimmed, source);
            None
        }
    }
}

/// Convenience wrapper for optional payload fields.
pub fn normalize_opt_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(normalize_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_first_dates() {
        assert_eq!(
            normalize_date("15/01/2024"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(
            normalize_date("20/01/2024"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap())
        );
    }

    #[test]
    fn parses_iso_and_dotted_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(normalize_date("2024-03-01"), Some(expected));
        assert_eq!(normalize_date("01-03-2024"), Some(expected));
        assert_eq!(normalize_date("01.03.2024"), Some(expected));
    }

    #[test]
    fn unparseable_input_is_absent_not_an_error() {
        assert_eq!(normalize_date("not-a-date"), None);
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("   "), None);
        assert_eq!(normalize_opt_date(None), None);
    }
}
