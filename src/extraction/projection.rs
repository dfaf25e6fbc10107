// Flat spreadsheet rows built from an ExtractedRecord
use super::record::ExtractedRecord;
use crate::config::MAX_CHILDREN;

/// Ordered `(column, value)` pairs
pub type Row = Vec<(String, String)>;

const SECTION_SEPARATOR: &str = "----------------------------";
const GROUP_SEPARATOR: &str = "------------------";

/// Headline labels and values, numbered 1 to 13 in the summary
fn headline(record: &ExtractedRecord) -> [(&'static str, &str); 13] {
    let (pemohon, pasangan, waris) = (&record.pemohon, &record.pasangan, &record.waris);
    [
        ("NAME", pemohon.nama.as_str()),
        ("IC", pemohon.no_mykad.as_str()),
        ("PH1", pemohon.telefon_bimbit.as_str()),
        ("PH2", pemohon.telefon_rumah.as_str()),
        ("ADDRESS", pemohon.alamat.as_str()),
        ("SPOUSE IC", pasangan.no_mykad.as_str()),
        ("SPOUSE NAME", pasangan.nama.as_str()),
        ("SPOUSE PH", pasangan.telefon.as_str()),
        ("RELATION", waris.hubungan.as_str()),
        ("REL-IC", waris.no_pengenalan.as_str()),
        ("REL-NAME", waris.nama.as_str()),
        ("REL-PH1", waris.telefon.as_str()),
        ("EMAIL", pemohon.email.as_str()),
    ]
}

/// The 13 numbered headline lines
pub fn format_minimal_details(record: &ExtractedRecord) -> String {
    headline_lines(record).join("\n")
}

fn headline_lines(record: &ExtractedRecord) -> Vec<String> {
    headline(record)
        .iter()
        .enumerate()
        .map(|(i, (label, value))| format!("({}) {} :- {}", i + 1, label, value))
        .collect()
}

/// Headline followed by every field of every section, and all children
pub fn format_details(record: &ExtractedRecord) -> String {
    let mut lines = headline_lines(record);
    lines.push(SECTION_SEPARATOR.to_string());

    let groups = [
        ("pemohon", record.pemohon.fields()),
        ("pasangan", record.pasangan.fields()),
        ("waris", record.waris.fields()),
    ];
    for (prefix, fields) in groups {
        for (key, value) in fields {
            lines.push(format!("{}_{} :- {}", prefix, key, value));
        }
        lines.push(GROUP_SEPARATOR.to_string());
    }

    for (i, child) in record.anak_anak.iter().enumerate() {
        for (key, value) in child.entries() {
            lines.push(format!("anak_{}_{} :- {}", i + 1, key, value));
        }
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Copy)]
pub struct RowProjector {
    max_children: usize,
}

impl Default for RowProjector {
    fn default() -> Self {
        Self::new(MAX_CHILDREN)
    }
}

impl RowProjector {
    pub fn new(max_children: usize) -> Self {
        Self { max_children }
    }

    /// Every field as its own column
    pub fn everything(&self, record: &ExtractedRecord) -> Row {
        let mut row: Row = vec![
            ("Card Number".to_string(), String::new()),
            ("Minimal Detail".to_string(), format_minimal_details(record)),
            ("Details".to_string(), format_details(record)),
        ];

        let groups = [
            ("pemohon", record.pemohon.fields()),
            ("pasangan", record.pasangan.fields()),
            ("waris", record.waris.fields()),
        ];
        for (prefix, fields) in groups {
            row.extend(
                fields
                    .into_iter()
                    .map(|(key, value)| (format!("{}_{}", prefix, key), value.to_string())),
            );
        }

        let info = &record.document_info;
        row.push(("document_type".to_string(), info.document_type.clone()));
        row.push(("document_tarikh_cetak".to_string(), info.tarikh_cetak.clone()));
        row.push((
            "document_v2_format_detected".to_string(),
            info.v2_format_detected.to_string(),
        ));

        for (i, child) in record.anak_anak.iter().take(self.max_children).enumerate() {
            for (key, value) in child.entries() {
                row.push((format!("anak_{}_{}", i + 1, key), value.to_string()));
            }
        }
        row
    }

    /// IC, card number, the full dump and the headline fields
    pub fn minimal(&self, record: &ExtractedRecord) -> Row {
        let mut row: Row = vec![
            ("IC".to_string(), record.pemohon.no_mykad.clone()),
            ("Card Number".to_string(), String::new()),
            ("Details".to_string(), format_details(record)),
        ];
        row.extend(
            headline(record)
                .iter()
                .filter(|(label, _)| *label != "IC")
                .map(|(label, value)| (label.to_string(), value.to_string())),
        );
        row
    }
}

pub fn project_everything(record: &ExtractedRecord) -> Row {
    RowProjector::default().everything(record)
}

pub fn project_minimal(record: &ExtractedRecord) -> Row {
    RowProjector::default().minimal(record)
}
