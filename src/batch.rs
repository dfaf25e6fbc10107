// Batch orchestration over many PDFs with per-file failure collection
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::extraction::{ExtractedRecord, StrExtractor};
use crate::types::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Processing,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// 1-based position of the file in the batch
    pub current: usize,
    pub total: usize,
    pub status: ProgressStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedRecord {
    pub source_file: String,
    #[serde(flatten)]
    pub record: ExtractedRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedFile {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchResult {
    pub records: Vec<ProcessedRecord>,
    pub failed: Vec<FailedFile>,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct BatchProcessor {
    extractor: Arc<StrExtractor>,
}

impl BatchProcessor {
    pub fn new(extractor: Arc<StrExtractor>) -> Self {
        Self { extractor }
    }

    /// Extract every file in order. Failures are recorded and the batch moves on.
    pub async fn process<F>(&self, paths: &[PathBuf], mut progress: F) -> BatchResult
    where
        F: FnMut(ProgressEvent),
    {
        let total = paths.len();
        let mut result = BatchResult::default();

        for (idx, path) in paths.iter().enumerate() {
            let current = idx + 1;
            let name = display_name(path);
            progress(ProgressEvent {
                current,
                total,
                status: ProgressStatus::Processing,
                message: format!("Processing {}", name),
            });

            let extractor = Arc::clone(&self.extractor);
            let owned = path.clone();
            let outcome = tokio::task::spawn_blocking(move || extractor.extract(&owned))
                .await
                .map_err(|e| format!("extraction task failed: {}", e))
                .and_then(|r| r.map_err(|e| e.to_string()));

            match outcome {
                Ok(record) => {
                    progress(ProgressEvent {
                        current,
                        total,
                        status: ProgressStatus::Success,
                        message: format!("Completed {}", name),
                    });
                    result.records.push(ProcessedRecord {
                        source_file: name,
                        record,
                    });
                }
                Err(error) => {
                    warn!("Failed to extract {}: {}", name, error);
                    progress(ProgressEvent {
                        current,
                        total,
                        status: ProgressStatus::Error,
                        message: format!("Failed: {} - {}", name, error),
                    });
                    result.failed.push(FailedFile { filename: name, error });
                }
            }
        }

        info!(
            "Batch finished: {} extracted, {} failed",
            result.records.len(),
            result.failed.len()
        );
        result
    }
}

/// Expand directories into their `*.pdf` files (not recursive, sorted).
/// Plain file arguments are kept as given.
pub fn collect_pdf_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.is_file()
                        && p.extension()
                            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
                })
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}
