// Recovery of the dependents table from detected page tables
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::page::{PageLayout, TableRows};

/// One row of the children table. Only columns present in the table are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nama: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_mykad: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub umur: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ChildRecord {
    pub fn is_empty(&self) -> bool {
        self.nama.is_none() && self.no_mykad.is_none() && self.umur.is_none() && self.status.is_none()
    }

    /// Present columns as `(key, value)` pairs in column order
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("nama", &self.nama),
            ("no_mykad", &self.no_mykad),
            ("umur", &self.umur),
            ("status", &self.status),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildColumn {
    Nama,
    NoMykad,
    Umur,
    Status,
}

impl ChildColumn {
    fn from_header(header: &str) -> Option<Self> {
        let header = header.trim().to_lowercase();
        if header.contains("mykad") || header.contains("mykid") {
            Some(Self::NoMykad)
        } else if header.contains("nama") {
            Some(Self::Nama)
        } else if header.contains("umur") {
            Some(Self::Umur)
        } else if header.contains("status") || header.contains("hubungan") {
            Some(Self::Status)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChildTableExtractor;

impl ChildTableExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Children from the first table on the page whose header names the
    /// name, ID and age columns.
    pub fn extract(&self, page: &PageLayout) -> Vec<ChildRecord> {
        self.extract_from_tables(&page.tables)
    }

    pub fn extract_from_tables(&self, tables: &[TableRows]) -> Vec<ChildRecord> {
        let Some(table) = tables.iter().find(|t| is_children_table(t)) else {
            debug!("No children table among {} tables", tables.len());
            return Vec::new();
        };

        let columns: Vec<Option<ChildColumn>> = table[0]
            .iter()
            .map(|cell| cell.as_deref().and_then(ChildColumn::from_header))
            .collect();

        let children: Vec<ChildRecord> = table[1..]
            .iter()
            .filter(|row| !is_blank_row(row))
            .map(|row| {
                let mut child = ChildRecord::default();
                for (cell, column) in row.iter().zip(&columns) {
                    let Some(column) = column else { continue };
                    let value = Some(cell.as_deref().unwrap_or("").trim().to_string());
                    match column {
                        ChildColumn::Nama => child.nama = value,
                        ChildColumn::NoMykad => child.no_mykad = value,
                        ChildColumn::Umur => child.umur = value,
                        ChildColumn::Status => child.status = value,
                    }
                }
                child
            })
            .filter(|child| !child.is_empty())
            .collect();

        debug!("Children table yielded {} records", children.len());
        children
    }
}

fn is_children_table(table: &TableRows) -> bool {
    if table.len() < 2 {
        return false;
    }
    let header = table[0]
        .iter()
        .map(|cell| cell.as_deref().unwrap_or("").to_uppercase())
        .collect::<Vec<_>>()
        .join(" ");
    header.contains("NAMA") && (header.contains("MYKAD") || header.contains("MYKID")) && header.contains("UMUR")
}

fn is_blank_row(row: &[Option<String>]) -> bool {
    row.iter()
        .all(|cell| cell.as_deref().map_or(true, |c| c.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[Option<&str>]) -> Vec<Option<String>> {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    fn children_table() -> TableRows {
        vec![
            row(&[Some("BIL"), Some("NAMA"), Some("NO. MYKAD/MYKID"), Some("UMUR"), Some("STATUS")]),
            row(&[Some("1"), Some(" AISYAH BINTI ALI "), Some("120304101234"), Some("12"), Some("ANAK KANDUNG")]),
            row(&[None, Some(""), Some("  "), None, None]),
            row(&[Some("2"), Some("HARIS BIN ALI"), Some("150607101234"), Some("9"), None]),
        ]
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let children = ChildTableExtractor::new().extract_from_tables(&[children_table()]);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].nama.as_deref(), Some("AISYAH BINTI ALI"));
        assert_eq!(children[0].no_mykad.as_deref(), Some("120304101234"));
        assert_eq!(children[0].status.as_deref(), Some("ANAK KANDUNG"));
        assert_eq!(children[1].umur.as_deref(), Some("9"));
        assert_eq!(children[1].status.as_deref(), Some(""));
    }

    #[test]
    fn test_first_matching_table_wins() {
        let other = vec![
            row(&[Some("NAMA BANK"), Some("NO AKAUN")]),
            row(&[Some("MAYBANK"), Some("1234")]),
        ];
        let page = PageLayout::default().with_tables(vec![other, children_table()]);
        let children = ChildTableExtractor::new().extract(&page);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_mykid_header_maps_to_id_column() {
        let table = vec![
            row(&[Some("Nama Anak"), Some("MyKID"), Some("Umur")]),
            row(&[Some("ADAM"), Some("200101101234"), Some("4")]),
        ];
        let children = ChildTableExtractor::new().extract_from_tables(&[table]);
        assert_eq!(
            children,
            vec![ChildRecord {
                nama: Some("ADAM".into()),
                no_mykad: Some("200101101234".into()),
                umur: Some("4".into()),
                status: None,
            }]
        );
        assert_eq!(children[0].entries().len(), 3);
    }

    #[test]
    fn test_header_only_table_is_ignored() {
        let table = vec![row(&[Some("NAMA"), Some("MYKAD"), Some("UMUR")])];
        assert!(ChildTableExtractor::new().extract_from_tables(&[table]).is_empty());
        assert!(ChildTableExtractor::new().extract(&PageLayout::default()).is_empty());
    }
}
