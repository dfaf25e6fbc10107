// Per-field text cleaners
//
// Every function here is total: empty input gives an empty string and no
// input makes it panic.
use once_cell::sync::Lazy;
use regex::Regex;

static AGE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\s*TAHUN)").unwrap());
static SECTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(pemohon|pasangan|waris|anak).*$").unwrap());
static TRAILING_RM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*RM\s*$").unwrap());

const CANONICAL_GENDERS: [&str; 2] = ["PEREMPUAN", "LELAKI"];

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// "51 TAHUN LELAKI" → "51 TAHUN". Text without an age pattern is kept as is.
pub fn clean_age(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let upper = text.to_uppercase();
    match AGE_PATTERN.find(&upper) {
        Some(m) => m.as_str().to_string(),
        None => text.to_string(),
    }
}

/// Cut stray section labels ("Pemohon", "Pasangan", "Waris", "Anak") that
/// bleed in from neighbouring boxes, along with everything after them.
pub fn remove_section_labels(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let stripped = SECTION_LABEL.replace(text, "");
    let trimmed = stripped.trim();
    trimmed.trim_end_matches(',').trim().to_string()
}

pub fn extract_postal_code(text: &str) -> String {
    digits(text)
}

pub fn extract_numbers_only(text: &str) -> String {
    digits(text)
}

/// Drop digits and collapse the remaining whitespace
pub fn remove_numbers(text: &str) -> String {
    let letters: String = text.chars().filter(|c| !c.is_ascii_digit()).collect();
    collapse_whitespace(&letters)
}

/// Emails wrap across print columns, so every space is an artifact
pub fn remove_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn remove_trailing_rm(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    TRAILING_RM.replace(text, "").trim().to_string()
}

/// First token only, digits only, at most 12 of them.
///
/// "740307015359 51" → "740307015359": the trailing number belongs to a
/// neighbouring box.
pub fn clean_mykad(text: &str) -> String {
    let first_token = text.split_whitespace().next().unwrap_or("");
    let mut id = digits(first_token);
    id.truncate(12);
    id
}

/// Canonical gender token. PEREMPUAN is checked before LELAKI.
pub fn clean_gender(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let upper = text.to_uppercase();
    if let Some(gender) = CANONICAL_GENDERS.iter().find(|g| upper.contains(*g)) {
        return gender.to_string();
    }
    extract_alphabets_only(text)
}

/// ASCII letters separated by single spaces
pub fn extract_alphabets_only(text: &str) -> String {
    let letters: String = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    collapse_whitespace(&letters)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEANERS: [(&str, fn(&str) -> String); 11] = [
        ("age", clean_age),
        ("labels", remove_section_labels),
        ("postal", extract_postal_code),
        ("numbers", extract_numbers_only),
        ("no_numbers", remove_numbers),
        ("whitespace", remove_whitespace),
        ("rm", remove_trailing_rm),
        ("mykad", clean_mykad),
        ("gender", clean_gender),
        ("alpha", extract_alphabets_only),
        ("collapse", |s| collapse_whitespace(s)),
    ];

    #[test]
    fn test_all_cleaners_are_total() {
        let inputs = [
            "",
            " ",
            "\t\n",
            "RM",
            "ÀÉÎ ünïcödé 数字 ٣٤",
            "PEMOHON",
            "123456789012345678901234567890",
            "::;;,,..",
            "\u{0}",
        ];
        for (name, cleaner) in CLEANERS {
            assert_eq!(cleaner(""), "", "{name} on empty input");
            for input in inputs {
                let _ = cleaner(input);
            }
        }
    }

    #[test]
    fn test_clean_age() {
        assert_eq!(clean_age("51 TAHUN LELAKI"), "51 TAHUN");
        assert_eq!(clean_age("umur 7 tahun"), "7 TAHUN");
        assert_eq!(clean_age("42TAHUN 3 TAHUN"), "42TAHUN");
        assert_eq!(clean_age("TIDAK DINYATAKAN"), "TIDAK DINYATAKAN");
    }

    #[test]
    fn test_remove_section_labels() {
        assert_eq!(remove_section_labels("PAHANG Pemohon"), "PAHANG");
        assert_eq!(remove_section_labels("GURU, Pasangan Lain"), "GURU");
        assert_eq!(remove_section_labels("GURU, Maklumat Pasangan"), "GURU, Maklumat");
        assert_eq!(remove_section_labels("SELANGOR waris anak"), "SELANGOR");
        assert_eq!(remove_section_labels("JOHOR"), "JOHOR");
        assert_eq!(remove_section_labels("PAHANG,, Pemohon"), "PAHANG");
    }

    #[test]
    fn test_digit_extractors() {
        assert_eq!(extract_postal_code("25200 KUANTAN"), "25200");
        assert_eq!(extract_numbers_only("012-345 6789"), "0123456789");
        assert_eq!(extract_numbers_only("TIADA"), "");
        assert_eq!(remove_numbers("25200  KUANTAN 3"), "KUANTAN");
    }

    #[test]
    fn test_remove_whitespace_and_rm() {
        assert_eq!(remove_whitespace("ali @ g mail.com"), "ali@gmail.com");
        assert_eq!(remove_trailing_rm("PENIAGA KECIL RM"), "PENIAGA KECIL");
        assert_eq!(remove_trailing_rm("PENIAGA rm "), "PENIAGA");
        assert_eq!(remove_trailing_rm("RMAN TRADING"), "RMAN TRADING");
    }

    #[test]
    fn test_clean_mykad() {
        assert_eq!(clean_mykad("740307015359 51"), "740307015359");
        assert_eq!(clean_mykad("740307-01-5359"), "740307015359");
        assert_eq!(clean_mykad("7403070153591234"), "740307015359");
        assert_eq!(clean_mykad("74030701"), "74030701");
        assert_eq!(clean_mykad("   "), "");
    }

    #[test]
    fn test_clean_mykad_truncates_any_long_run_to_twelve() {
        for len in 12..30 {
            let input: String = "9".repeat(len);
            assert_eq!(clean_mykad(&input).len(), 12);
        }
        for len in 1..12 {
            let input: String = "1".repeat(len);
            assert_eq!(clean_mykad(&input), input);
        }
    }

    #[test]
    fn test_clean_gender() {
        assert_eq!(clean_gender("PEREMPUAN TIDAK BEKERJA"), "PEREMPUAN");
        assert_eq!(clean_gender("lelaki 45"), "LELAKI");
        assert_eq!(clean_gender("X 12 Y!"), "X Y");
    }

    #[test]
    fn test_clean_gender_perempuan_wins_over_lelaki() {
        assert_eq!(clean_gender("LELAKI PEREMPUAN"), "PEREMPUAN");
        assert_eq!(clean_gender("PEREMPUAN LELAKI"), "PEREMPUAN");
    }

    #[test]
    fn test_extract_alphabets_only() {
        assert_eq!(extract_alphabets_only("ABANG 2 (KANDUNG)"), "ABANG KANDUNG");
        assert_eq!(extract_alphabets_only("SITI   BINTI  ALI."), "SITI BINTI ALI");
    }
}
