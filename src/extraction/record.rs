// The structured extraction result and its assembly from raw box text
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::address::AddressMerger;
use super::children::ChildRecord;
use super::normalize::{
    clean_age, clean_gender, clean_mykad, extract_alphabets_only, extract_numbers_only, extract_postal_code,
    remove_numbers, remove_section_labels, remove_trailing_rm, remove_whitespace,
};
use crate::config::{DOCUMENT_TYPE, EXTRACTION_VERSION};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(rename = "type")]
    pub document_type: String,
    pub tarikh_cetak: String,
    pub extraction_date: String,
    pub extraction_version: String,
    pub v2_format_detected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    pub nama_bank: String,
    pub no_akaun: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pemohon {
    pub nama: String,
    pub no_mykad: String,
    pub umur: String,
    pub jantina: String,
    pub alamat: String,
    pub poskod: String,
    pub bandar_daerah: String,
    pub negeri: String,
    pub telefon_bimbit: String,
    pub telefon_rumah: String,
    pub email: String,
    pub pekerjaan: String,
    pub pendapatan_bulanan: String,
    pub status_perkahwinan: String,
    pub tarikh_perkahwinan: String,
    pub bank: Bank,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pasangan {
    pub nama: String,
    pub no_mykad: String,
    pub telefon: String,
    pub jantina: String,
    pub pekerjaan: String,
    pub bank: Bank,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waris {
    pub hubungan: String,
    pub no_pengenalan: String,
    pub nama: String,
    pub telefon: String,
}

/// Everything extracted from one application form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub document_info: DocumentInfo,
    pub pemohon: Pemohon,
    pub pasangan: Pasangan,
    pub anak_anak: Vec<ChildRecord>,
    pub waris: Waris,
}

impl Bank {
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![("nama_bank", self.nama_bank.as_str()), ("no_akaun", self.no_akaun.as_str())]
    }
}

impl Pemohon {
    /// Flattened `(key, value)` pairs; bank fields become `bank_*`
    pub fn fields(&self) -> Vec<(String, &str)> {
        let mut fields: Vec<(String, &str)> = [
            ("nama", &self.nama),
            ("no_mykad", &self.no_mykad),
            ("umur", &self.umur),
            ("jantina", &self.jantina),
            ("alamat", &self.alamat),
            ("poskod", &self.poskod),
            ("bandar_daerah", &self.bandar_daerah),
            ("negeri", &self.negeri),
            ("telefon_bimbit", &self.telefon_bimbit),
            ("telefon_rumah", &self.telefon_rumah),
            ("email", &self.email),
            ("pekerjaan", &self.pekerjaan),
            ("pendapatan_bulanan", &self.pendapatan_bulanan),
            ("status_perkahwinan", &self.status_perkahwinan),
            ("tarikh_perkahwinan", &self.tarikh_perkahwinan),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.as_str()))
        .collect();
        fields.extend(self.bank.fields().into_iter().map(|(k, v)| (format!("bank_{}", k), v)));
        fields
    }
}

impl Pasangan {
    pub fn fields(&self) -> Vec<(String, &str)> {
        let mut fields: Vec<(String, &str)> = [
            ("nama", &self.nama),
            ("no_mykad", &self.no_mykad),
            ("telefon", &self.telefon),
            ("jantina", &self.jantina),
            ("pekerjaan", &self.pekerjaan),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.as_str()))
        .collect();
        fields.extend(self.bank.fields().into_iter().map(|(k, v)| (format!("bank_{}", k), v)));
        fields
    }
}

impl Waris {
    pub fn fields(&self) -> Vec<(String, &str)> {
        [
            ("hubungan", &self.hubungan),
            ("no_pengenalan", &self.no_pengenalan),
            ("nama", &self.nama),
            ("telefon", &self.telefon),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.as_str()))
        .collect()
    }
}

/// Raw box text grouped by section, with section prefixes already stripped
#[derive(Debug, Clone, Default)]
pub struct RawFields {
    pub pemohon: HashMap<String, String>,
    pub pasangan: HashMap<String, String>,
    pub waris: HashMap<String, String>,
}

impl RawFields {
    fn pemohon(&self, key: &str) -> &str {
        self.pemohon.get(key).map(String::as_str).unwrap_or("")
    }

    fn pasangan(&self, key: &str) -> &str {
        self.pasangan.get(key).map(String::as_str).unwrap_or("")
    }

    fn waris(&self, key: &str) -> &str {
        self.waris.get(key).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    address: AddressMerger,
}

impl RecordBuilder {
    pub fn new(address: AddressMerger) -> Self {
        Self { address }
    }

    pub fn build(&self, raw: &RawFields, children: Vec<ChildRecord>, v2_format_detected: bool) -> ExtractedRecord {
        let alamat = self.address.merge(
            raw.pemohon("alamat_surat"),
            raw.pemohon("poskod"),
            raw.pemohon("bandar_daerah"),
            raw.pemohon("negeri"),
        );

        ExtractedRecord {
            document_info: DocumentInfo {
                document_type: DOCUMENT_TYPE.to_string(),
                tarikh_cetak: raw.pemohon("tarikh_cetak").to_string(),
                extraction_date: Local::now().to_rfc3339(),
                extraction_version: EXTRACTION_VERSION.to_string(),
                v2_format_detected,
            },
            pemohon: Pemohon {
                nama: raw.pemohon("nama").to_string(),
                no_mykad: clean_mykad(raw.pemohon("no_mykad")),
                umur: clean_age(raw.pemohon("umur")),
                jantina: clean_gender(raw.pemohon("jantina")),
                alamat,
                poskod: extract_postal_code(raw.pemohon("poskod")),
                bandar_daerah: remove_numbers(raw.pemohon("bandar_daerah")),
                negeri: remove_section_labels(raw.pemohon("negeri")),
                telefon_bimbit: raw.pemohon("no_telefon_bimbit").to_string(),
                telefon_rumah: raw.pemohon("no_telefon_rumah").to_string(),
                email: remove_whitespace(raw.pemohon("alamat_emel")),
                pekerjaan: remove_trailing_rm(raw.pemohon("pekerjaan")),
                pendapatan_bulanan: raw.pemohon("pendapatan_kasar").to_string(),
                status_perkahwinan: raw.pemohon("status_perkahwinan").to_string(),
                tarikh_perkahwinan: raw.pemohon("tarikh_perkahwinan").to_string(),
                bank: Bank {
                    nama_bank: raw.pemohon("nama_bank").to_string(),
                    no_akaun: raw.pemohon("no_akaun_bank").to_string(),
                },
            },
            pasangan: Pasangan {
                nama: raw.pasangan("nama").to_string(),
                no_mykad: raw.pasangan("no_mykad").to_string(),
                telefon: extract_numbers_only(raw.pasangan("no_telefon")),
                jantina: clean_gender(raw.pasangan("jantina")),
                pekerjaan: remove_section_labels(raw.pasangan("pekerjaan")),
                bank: Bank {
                    nama_bank: raw.pasangan("nama_bank").to_string(),
                    no_akaun: raw.pasangan("no_akaun_bank").to_string(),
                },
            },
            anak_anak: children,
            waris: Waris {
                hubungan: extract_alphabets_only(raw.waris("hubungan")),
                no_pengenalan: extract_numbers_only(raw.waris("no_pengenalan")),
                nama: extract_alphabets_only(raw.waris("nama")),
                telefon: extract_numbers_only(raw.waris("no_telefon")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawFields {
        let mut raw = RawFields::default();
        for (k, v) in [
            ("tarikh_cetak", "01/02/2024"),
            ("nama", "AHMAD BIN ALI"),
            ("no_mykad", "740307015359 51"),
            ("umur", "51 TAHUN LELAKI"),
            ("jantina", "LELAKI 51"),
            ("alamat_surat", "NO 12 JALAN MAWAR"),
            ("poskod", "25200 KUANTAN"),
            ("bandar_daerah", "KUANTAN 2"),
            ("negeri", "PAHANG Pasangan"),
            ("alamat_emel", "ahmad @ g mail.com"),
            ("pekerjaan", "PENIAGA RM"),
            ("nama_bank", "MAYBANK"),
            ("no_akaun_bank", "1122334455"),
        ] {
            raw.pemohon.insert(k.to_string(), v.to_string());
        }
        raw.pasangan.insert("no_telefon".into(), "012-345 6789".into());
        raw.pasangan.insert("jantina".into(), "PEREMPUAN SURI".into());
        raw.waris.insert("hubungan".into(), "ABANG 1".into());
        raw.waris.insert("no_pengenalan".into(), "700101-01-1234".into());
        raw
    }

    #[test]
    fn test_cleaners_follow_the_field_mapping() {
        let record = RecordBuilder::default().build(&raw(), Vec::new(), true);

        assert_eq!(record.document_info.document_type, DOCUMENT_TYPE);
        assert_eq!(record.document_info.tarikh_cetak, "01/02/2024");
        assert!(record.document_info.v2_format_detected);
        assert_eq!(record.pemohon.no_mykad, "740307015359");
        assert_eq!(record.pemohon.umur, "51 TAHUN");
        assert_eq!(record.pemohon.jantina, "LELAKI");
        assert_eq!(record.pemohon.poskod, "25200");
        assert_eq!(record.pemohon.bandar_daerah, "KUANTAN");
        assert_eq!(record.pemohon.negeri, "PAHANG");
        assert_eq!(record.pemohon.alamat, "NO 12 JALAN MAWAR, 25200, KUANTAN, PAHANG");
        assert_eq!(record.pemohon.email, "ahmad@gmail.com");
        assert_eq!(record.pemohon.pekerjaan, "PENIAGA");
        assert_eq!(record.pemohon.bank.no_akaun, "1122334455");
        assert_eq!(record.pasangan.telefon, "0123456789");
        assert_eq!(record.pasangan.jantina, "PEREMPUAN");
        assert_eq!(record.waris.hubungan, "ABANG");
        assert_eq!(record.waris.no_pengenalan, "700101011234");
        assert_eq!(record.waris.nama, "");
    }

    #[test]
    fn test_missing_fields_are_empty_strings() {
        let record = RecordBuilder::default().build(&RawFields::default(), Vec::new(), false);
        assert_eq!(record.pemohon.nama, "");
        assert_eq!(record.pemohon.alamat, "");
        assert_eq!(record.document_info.extraction_version, EXTRACTION_VERSION);
        assert!(record.anak_anak.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let record = RecordBuilder::default().build(&raw(), Vec::new(), false);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["document_info"]["type"], DOCUMENT_TYPE);
        assert_eq!(json["pemohon"]["bank"]["nama_bank"], "MAYBANK");
        assert_eq!(json["document_info"]["v2_format_detected"], false);
        assert!(json["anak_anak"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_flattened_field_order() {
        let record = RecordBuilder::default().build(&raw(), Vec::new(), false);
        let keys: Vec<String> = record.pemohon.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys.first().map(String::as_str), Some("nama"));
        assert_eq!(keys[keys.len() - 2..].to_vec(), vec!["bank_nama_bank", "bank_no_akaun"]);
        assert_eq!(record.waris.fields().len(), 4);
    }
}
