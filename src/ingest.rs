//! Directory ingestion: one [`Track`] per readable file.

use crate::error::IngestError;
use crate::parsers::parser_for;
use crate::sample::{GpsSample, RawSample, Track};
use indicatif::ParallelProgressIterator;
use log::{info, warn};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Something was skipped, but ingestion went on.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestWarning {
    /// The directory walk could not descend into an entry.
    Unreachable { path: Option<PathBuf>, reason: String },
    /// The file could not be read or parsed.
    Unparseable { path: PathBuf, reason: String },
    /// Some samples failed validation and were dropped.
    DroppedSamples {
        path: PathBuf,
        dropped: usize,
        kept: usize,
        first_reason: String,
    },
    /// No sample of the file survived validation.
    NoValidSamples { path: PathBuf, total: usize },
}

impl fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestWarning::Unreachable { path, reason } => match path {
                Some(path) => write!(f, "cannot reach {}: {}", path.display(), reason),
                None => write!(f, "cannot reach directory entry: {}", reason),
            },
            IngestWarning::Unparseable { path, reason } => {
                write!(f, "skipping {}: {}", path.display(), reason)
            }
            IngestWarning::DroppedSamples {
                path,
                dropped,
                kept,
                first_reason,
            } => write!(
                f,
                "{}: dropped {} invalid samples, kept {} (first: {})",
                path.display(),
                dropped,
                kept,
                first_reason
            ),
            IngestWarning::NoValidSamples { path, total } => write!(
                f,
                "{}: none of {} samples are valid, file skipped",
                path.display(),
                total
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub tracks: Vec<Track>,
    pub warnings: Vec<IngestWarning>,
    pub files_seen: usize,
}

impl IngestReport {
    pub fn failed_files(&self) -> usize {
        self.files_seen - self.tracks.len()
    }
}

/// Reads every regular file below `data_dir`, recursively, in parallel.
///
/// Only an unlistable directory is an error. Bad files and bad samples are
/// logged and returned as warnings.
pub fn ingest_directory(data_dir: &Path) -> Result<IngestReport, IngestError> {
    if !data_dir.is_dir() {
        return Err(IngestError::NotADirectory(data_dir.to_path_buf()));
    }
    fs::read_dir(data_dir).map_err(|source| IngestError::Unlistable {
        path: data_dir.to_path_buf(),
        source,
    })?;

    info!("Searching for track files in {}...", data_dir.display());

    let mut warnings = Vec::new();
    let mut files = Vec::new();
    for entry in WalkDir::new(data_dir) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                let warning = IngestWarning::Unreachable {
                    path: e.path().map(Path::to_path_buf),
                    reason: e.to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    info!("Processing {} files in parallel...", files.len());

    let outcomes: Vec<(Option<Track>, Vec<IngestWarning>)> = files
        .par_iter()
        .progress()
        .map(|path| ingest_file(path))
        .collect();

    let mut report = IngestReport {
        files_seen: files.len(),
        warnings,
        ..Default::default()
    };
    for (track, mut file_warnings) in outcomes {
        report.tracks.extend(track);
        report.warnings.append(&mut file_warnings);
    }

    info!(
        "✓ Ingested {} tracks from {} files ({} failed)",
        report.tracks.len(),
        report.files_seen,
        report.failed_files()
    );
    Ok(report)
}

fn ingest_file(path: &Path) -> (Option<Track>, Vec<IngestWarning>) {
    let parser = parser_for(path);
    match parser.parse(path) {
        Ok(raw) => track_from_raw(path, raw),
        Err(e) => {
            let warning = IngestWarning::Unparseable {
                path: path.to_path_buf(),
                reason: format!("{} failed: {}", parser.name(), e),
            };
            warn!("✗ {}", warning);
            (None, vec![warning])
        }
    }
}

/// Validates raw records of one file and wraps the survivors into a track.
pub fn track_from_raw(path: &Path, raw: Vec<RawSample>) -> (Option<Track>, Vec<IngestWarning>) {
    let total = raw.len();
    let mut first_reason = None;
    let samples: Vec<GpsSample> = raw
        .into_iter()
        .filter_map(|record| match GpsSample::try_from(record) {
            Ok(sample) => Some(sample),
            Err(e) => {
                first_reason.get_or_insert_with(|| e.to_string());
                None
            }
        })
        .collect();

    let mut warnings = Vec::new();
    let dropped = total - samples.len();
    if dropped > 0 && !samples.is_empty() {
        warnings.push(IngestWarning::DroppedSamples {
            path: path.to_path_buf(),
            dropped,
            kept: samples.len(),
            first_reason: first_reason.unwrap_or_default(),
        });
    }

    let track = Track::new(path.display().to_string(), samples);
    if track.is_none() {
        warnings.push(IngestWarning::NoValidSamples {
            path: path.to_path_buf(),
            total,
        });
    }

    for warning in &warnings {
        warn!("{}", warning);
    }
    (track, warnings)
}
