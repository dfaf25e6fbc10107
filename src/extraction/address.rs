// Merging of the boxed address components into one mailing address
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::normalize::{extract_postal_code, remove_numbers, remove_section_labels};
use crate::config::AddressConfig;

static REPEATED_COMMAS: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*,+").unwrap());

/// Spellings of a state that count as the same state inside an address
const STATE_VARIATIONS: &[(&str, &[&str])] = &[
    ("W.P.", &["WILAYAH PERSEKUTUAN", "WP", "W.P.", "W.P"]),
    ("WILAYAH PERSEKUTUAN", &["W.P.", "WP", "WILAYAH PERSEKUTUAN"]),
    ("KUALA LUMPUR", &["KL", "K.L.", "KUALA LUMPUR"]),
    ("SELANGOR", &["SELANGOR", "SEL"]),
    ("PULAU PINANG", &["PULAU PINANG", "PENANG", "P.PINANG"]),
    ("JOHOR", &["JOHOR", "JHR"]),
    ("MELAKA", &["MELAKA", "MALACCA", "MLK"]),
];

fn normalize(text: &str) -> String {
    text.to_uppercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn word_set(text: &str) -> HashSet<&str> {
    text.split_whitespace().collect()
}

/// Share of `part`'s words that also occur in `whole`
fn overlap_ratio(part: &str, whole: &str) -> f64 {
    let part_words = word_set(part);
    if part_words.is_empty() {
        return 0.0;
    }
    let whole_words = word_set(whole);
    part_words.intersection(&whole_words).count() as f64 / part_words.len() as f64
}

#[derive(Debug, Clone)]
pub struct AddressMerger {
    config: AddressConfig,
}

impl Default for AddressMerger {
    fn default() -> Self {
        Self::new(AddressConfig::default())
    }
}

impl AddressMerger {
    pub fn new(config: AddressConfig) -> Self {
        Self { config }
    }

    /// True when the address already names `state`, directly, through a
    /// known variant spelling, or by sharing enough of its words.
    pub fn state_in_address(&self, state: &str, address: &str) -> bool {
        if state.trim().is_empty() || address.trim().is_empty() {
            return false;
        }
        let state = normalize(state);
        let address = normalize(address);

        if address.contains(&state) {
            return true;
        }
        let variant_match = STATE_VARIATIONS
            .iter()
            .filter(|(key, _)| state.contains(key))
            .any(|(_, variants)| variants.iter().any(|v| address.contains(v)));
        if variant_match {
            return true;
        }
        overlap_ratio(&state, &address) >= self.config.state_overlap
    }

    /// Append postal code, district and state to the free-text address,
    /// skipping any component the address already carries.
    pub fn merge(&self, alamat_surat: &str, poskod: &str, bandar_daerah: &str, negeri: &str) -> String {
        let address = normalize(alamat_surat);
        let poskod = extract_postal_code(poskod);
        let bandar = remove_numbers(bandar_daerah);
        let negeri = remove_section_labels(negeri);

        let mut parts: Vec<&str> = Vec::new();
        if !alamat_surat.is_empty() {
            parts.push(alamat_surat);
        }
        if !poskod.is_empty() && !address.contains(&poskod) {
            parts.push(&poskod);
        }
        if !bandar.is_empty() {
            let district = normalize(&bandar);
            if !address.contains(&district) && overlap_ratio(&district, &address) < self.config.district_overlap {
                parts.push(&bandar);
            }
        }
        if !negeri.is_empty() && !self.state_in_address(&negeri, alamat_surat) {
            parts.push(&negeri);
        }

        let combined = remove_section_labels(&parts.join(", "));
        let combined = REPEATED_COMMAS.replace_all(&combined, ",");
        let combined = combined.split_whitespace().collect::<Vec<_>>().join(" ");
        combined.trim_matches(',').trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_components_are_appended() {
        let merged = AddressMerger::default().merge("NO 12 JALAN MAWAR 3", "25200", "KUANTAN", "PAHANG");
        assert_eq!(merged, "NO 12 JALAN MAWAR 3, 25200, KUANTAN, PAHANG");
    }

    #[test]
    fn test_merge_does_not_duplicate_components() {
        let merger = AddressMerger::default();
        let address = "NO 5 JALAN SS2/3, 47300 PETALING JAYA, WP KUALA LUMPUR";
        let merged = merger.merge(address, "47300", "PETALING JAYA 1", "W.P. KUALA LUMPUR");
        assert_eq!(merged, address);
        // Merging the result again changes nothing
        assert_eq!(merger.merge(&merged, "47300", "PETALING JAYA", "W.P. KUALA LUMPUR"), merged);
    }

    #[test]
    fn test_district_with_partial_word_overlap_is_skipped() {
        let merged = AddressMerger::default().merge("LOT 7 KAMPUNG BARU SUNGAI", "", "SUNGAI PETANI", "");
        assert_eq!(merged, "LOT 7 KAMPUNG BARU SUNGAI");
    }

    #[test]
    fn test_state_synonyms() {
        let merger = AddressMerger::default();
        assert!(merger.state_in_address("Pulau Pinang", "12 LEBUH CHULIA, PENANG"));
        assert!(merger.state_in_address("MELAKA", "BUKIT BERUANG MLK"));
        assert!(!merger.state_in_address("JOHOR", "KOTA BHARU KELANTAN"));
        assert!(!merger.state_in_address("", "ANYWHERE"));
    }

    #[test]
    fn test_state_label_bleed_is_removed() {
        let merged = AddressMerger::default().merge("JALAN 1", "", "", "PAHANG Pasangan");
        assert_eq!(merged, "JALAN 1, PAHANG");
    }

    #[test]
    fn test_overlap_threshold_is_configurable() {
        let strict = AddressMerger::new(AddressConfig {
            district_overlap: 1.1,
            state_overlap: 1.1,
        });
        let merged = strict.merge("LOT 7 KAMPUNG BARU SUNGAI", "", "SUNGAI PETANI", "");
        assert_eq!(merged, "LOT 7 KAMPUNG BARU SUNGAI, SUNGAI PETANI");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(AddressMerger::default().merge("", "", "", ""), "");
        assert_eq!(AddressMerger::default().merge("", "25200", "", ""), "25200");
    }
}
