// Per-section vertical drift calibration from printed section headers
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use super::page::PageLayout;
use super::word_index::{reading_order, PositionedWord, WordIndex};
use crate::config::SectionConfig;
use crate::template::Template;

/// The four role sections of the form
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Section {
    Pemohon,
    Pasangan,
    Anak,
    Waris,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Pemohon, Section::Pasangan, Section::Anak, Section::Waris];

    pub fn key(&self) -> &'static str {
        match self {
            Section::Pemohon => "pemohon",
            Section::Pasangan => "pasangan",
            Section::Anak => "anak",
            Section::Waris => "waris",
        }
    }

    pub fn header_field(&self) -> &'static str {
        match self {
            Section::Pemohon => "maklumat_pemohon_header",
            Section::Pasangan => "maklumat_pasangan_header",
            Section::Anak => "maklumat_anak_header",
            Section::Waris => "maklumat_waris_header",
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Section::Pemohon => &["MAKLUMAT", "PEMOHON"],
            Section::Pasangan => &["MAKLUMAT", "PASANGAN"],
            Section::Anak => &["MAKLUMAT", "ANAK"],
            Section::Waris => &["MAKLUMAT", "WARIS"],
        }
    }

    /// Field-name prefix routing boxes to this section. Applicant fields carry none.
    pub fn field_prefix(&self) -> Option<&'static str> {
        match self {
            Section::Pemohon => None,
            Section::Pasangan => Some("pasangan_"),
            Section::Anak => Some("anak_"),
            Section::Waris => Some("waris_"),
        }
    }

    pub fn for_field(name: &str) -> Section {
        [Section::Waris, Section::Pasangan, Section::Anak]
            .into_iter()
            .find(|s| s.field_prefix().is_some_and(|p| name.starts_with(p)))
            .unwrap_or(Section::Pemohon)
    }
}

/// Result of one header search. `Found(0)` means the header sits exactly
/// where the template expects it; `NotFound` means no anchor was seen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum SectionOffset {
    Found(i32),
    NotFound,
}

impl SectionOffset {
    pub fn is_found(&self) -> bool {
        matches!(self, SectionOffset::Found(_))
    }

    pub fn value(&self) -> Option<i32> {
        match self {
            SectionOffset::Found(v) => Some(*v),
            SectionOffset::NotFound => None,
        }
    }

    pub fn or_zero(&self) -> i32 {
        self.value().unwrap_or(0)
    }

    fn map(self, f: impl FnOnce(i32) -> i32) -> SectionOffset {
        match self {
            SectionOffset::Found(v) => SectionOffset::Found(f(v)),
            SectionOffset::NotFound => SectionOffset::NotFound,
        }
    }
}

/// Offsets for one document. Only the next-of-kin section keeps the
/// not-found state; the others fall back to 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionOffsets {
    pub pemohon: i32,
    pub pasangan: i32,
    pub anak: i32,
    pub waris: SectionOffset,
    /// Zero-based page the next-of-kin fields are read from
    pub waris_page: usize,
}

impl SectionOffsets {
    pub fn waris_exists(&self) -> bool {
        self.waris.is_found()
    }

    pub fn offset_for(&self, section: Section) -> i32 {
        match section {
            Section::Pemohon => self.pemohon,
            Section::Pasangan => self.pasangan,
            Section::Anak => self.anak,
            Section::Waris => self.waris.or_zero(),
        }
    }

    pub fn page_for(&self, section: Section) -> usize {
        match section {
            Section::Waris => self.waris_page,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SectionOffsetCalculator {
    config: SectionConfig,
    border_offset_y: f64,
}

impl SectionOffsetCalculator {
    pub fn new(config: SectionConfig, border_offset_y: f64) -> Self {
        Self {
            config,
            border_offset_y,
        }
    }

    /// Search `words` for the printed header of `section`.
    ///
    /// `unbounded` drops the vertical search radius for the next-of-kin
    /// header, which on multi-page documents can sit anywhere.
    pub fn detect(
        &self,
        words: &WordIndex,
        template: &Template,
        section: Section,
        unbounded: bool,
    ) -> SectionOffset {
        let Some(header) = template.get(section.header_field()) else {
            return SectionOffset::NotFound;
        };

        let x_min = header.x - self.config.header_x_margin;
        let x_max = header.x + header.width + self.config.header_x_margin;
        let radius = match section {
            Section::Waris => self.config.search_range_waris,
            _ => self.config.search_range_default,
        };
        let in_range = |w: &PositionedWord| {
            w.x0 >= x_min
                && w.x0 <= x_max
                && ((unbounded && section == Section::Waris) || (w.top - header.y).abs() <= radius)
        };

        let anchor = match section {
            Section::Waris => self.same_line_pair(words, &in_range, "MAKLUMAT", "WARIS"),
            _ => {
                let keywords = section.keywords();
                words
                    .words()
                    .iter()
                    .filter(|w| in_range(*w))
                    .filter(|w| {
                        let upper = w.text.to_uppercase();
                        keywords.iter().any(|kw| upper.contains(kw))
                    })
                    .min_by(|a, b| reading_order(a, b))
                    .map(|w| w.top)
            }
        };

        match anchor {
            Some(top) => SectionOffset::Found((top - header.y).trunc() as i32),
            None => SectionOffset::NotFound,
        }
    }

    /// Top of the first `first` word sharing a visual line with a `second` word.
    /// A lone keyword is never an anchor.
    fn same_line_pair(
        &self,
        words: &WordIndex,
        in_range: &impl Fn(&PositionedWord) -> bool,
        first: &str,
        second: &str,
    ) -> Option<f64> {
        let mut firsts = Vec::new();
        let mut seconds = Vec::new();
        for word in words.words().iter().filter(|w| in_range(*w)) {
            let upper = word.text.to_uppercase();
            if upper.contains(first) {
                firsts.push(word);
            } else if upper.contains(second) {
                seconds.push(word);
            }
        }
        firsts.sort_by(|a, b| a.top.partial_cmp(&b.top).unwrap_or(Ordering::Equal));

        firsts
            .iter()
            .find(|f| {
                seconds
                    .iter()
                    .any(|s| (f.top - s.top).abs() <= self.config.same_line_threshold)
            })
            .map(|f| f.top)
    }

    /// Offsets for every section of a document.
    ///
    /// Bordered documents trust the fixed border shift for everything but the
    /// next-of-kin section, whose detected value has the border shift removed.
    pub fn calculate(&self, pages: &[PageLayout], template: &Template, bordered: bool) -> SectionOffsets {
        let multi_page = pages.len() > 1;
        let Some(first) = pages.first() else {
            return SectionOffsets {
                pemohon: 0,
                pasangan: 0,
                anak: 0,
                waris: SectionOffset::NotFound,
                waris_page: 0,
            };
        };

        let border_dy = self.border_offset_y.trunc() as i32;
        let adjust = |offset: SectionOffset| {
            if bordered {
                offset.map(|v| v - border_dy)
            } else {
                offset
            }
        };

        let (pemohon, pasangan, anak) = if bordered {
            (0, 0, 0)
        } else {
            (
                self.detect(&first.words, template, Section::Pemohon, multi_page).or_zero(),
                self.detect(&first.words, template, Section::Pasangan, multi_page).or_zero(),
                self.detect(&first.words, template, Section::Anak, multi_page).or_zero(),
            )
        };

        let mut waris = adjust(self.detect(&first.words, template, Section::Waris, multi_page));
        let mut waris_page = 0;

        if !waris.is_found() {
            if let Some(second) = pages.get(1) {
                let on_second = adjust(self.detect(&second.words, template, Section::Waris, multi_page));
                if on_second.is_found() {
                    debug!("Next-of-kin header found on page 2");
                    waris = on_second;
                    waris_page = 1;
                }
            }
        }

        debug!(
            "Section offsets: pemohon={} pasangan={} anak={} waris={:?} (page {})",
            pemohon,
            pasangan,
            anak,
            waris,
            waris_page + 1
        );

        SectionOffsets {
            pemohon,
            pasangan,
            anak,
            waris,
            waris_page,
        }
    }
}
