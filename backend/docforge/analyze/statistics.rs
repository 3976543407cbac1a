//! Statistical and data extraction.
//!
//! Regex-driven extraction of numbers, percentages, currency amounts and
//! measurements. Each list is de-duplicated preserving first-appearance
//! order.

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use super::types::Statistics;

lazy_static! {
    static ref NUMBER_RE: Regex =
        Regex::new(r"-?\b\d[\d,]*(?:\.\d+)?\b").expect("Failed to compile NUMBER_RE");

    static ref PERCENT_RE: Regex =
        Regex::new(r"\d+(?:\.\d+)?\s?%").expect("Failed to compile PERCENT_RE");

    static ref CURRENCY_RE: Regex = Regex::new(
        r"(?:[$€£¥]\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:million|billion|thousand|[KMB]))?)|(?:\b\d[\d,]*(?:\.\d+)?\s?(?:USD|EUR|GBP|JPY|CNY)\b)"
    )
    .expect("Failed to compile CURRENCY_RE");

    static ref MEASUREMENT_RE: Regex = Regex::new(
        r"\b\d[\d,]*(?:\.\d+)?\s?(?:kg|mg|g|km|cm|mm|m|mi|ft|lb|oz|TB|GB|MB|KB|GHz|MHz|ms|min|hr|px)\b"
    )
    .expect("Failed to compile MEASUREMENT_RE");
}

/// Extracts all statistical values from `text`.
///
/// Each list de-duplicates while preserving first-appearance order.
pub fn extract_statistics(text: &str) -> Statistics {
    let numbers: Vec<f64> = NUMBER_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .unique()
        .filter_map(|n| n.replace(',', "").parse::<f64>().ok())
        .collect();

    let percentages: Vec<String> = PERCENT_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .unique()
        .collect();

    let currencies: Vec<String> = CURRENCY_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .unique()
        .collect();

    let measurements: Vec<String> = MEASUREMENT_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .unique()
        .collect();

    Statistics {
        numbers,
        percentages,
        currencies,
        measurements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_parsed_as_floats() {
        let s = extract_statistics("We sold 1,250 units at 3.5 stars.");
        assert!(s.numbers.contains(&1250.0));
        assert!(s.numbers.contains(&3.5));
    }

    #[test]
    fn test_percentages_keep_the_sign() {
        let s = extract_statistics("Growth of 12.5% against a 3% baseline.");
        assert_eq!(s.percentages, vec!["12.5%", "3%"]);
    }

    #[test]
    fn test_currencies_symbol_and_iso() {
        let s = extract_statistics("Priced at $4,999.99, or about 4500 EUR.");
        assert!(s.currencies.iter().any(|c| c.contains("$4,999.99")));
        assert!(s.currencies.iter().any(|c| c.contains("4500 EUR")));
    }

    #[test]
    fn test_measurements_include_units() {
        let s = extract_statistics("The 25 kg package traveled 300 km with 16GB of telemetry.");
        assert!(s.measurements.contains(&"25 kg".to_string()));
        assert!(s.measurements.contains(&"300 km".to_string()));
        assert!(s.measurements.contains(&"16GB".to_string()));
    }

    #[test]
    fn test_dedup_preserves_first_appearance() {
        let s = extract_statistics("10% then 20% then 10% again");
        assert_eq!(s.percentages, vec!["10%", "20%"]);
    }

    #[test]
    fn test_empty_text() {
        let s = extract_statistics("");
        assert!(s.numbers.is_empty());
        assert!(s.percentages.is_empty());
        assert!(s.currencies.is_empty());
        assert!(s.measurements.is_empty());
    }
}
