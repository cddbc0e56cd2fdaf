//! Error types used by the crate.

use std::path::PathBuf;

use thiserror::Error;

/// A single value rejected by the validation layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be a finite number, got: {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("{field} must be within [{min}, {max}], got: {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} is missing")]
    MissingField { field: &'static str },
    #[error("timestamp must be non-negative, got: {value}")]
    NegativeTimestamp { value: i64 },
    #[error("{low_name} ({low}) must be less than {high_name} ({high})")]
    InvertedBounds {
        low_name: &'static str,
        low: f64,
        high_name: &'static str,
        high: f64,
    },
}

/// Failure of [`project`](crate::projection::project).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("invalid projection input: {0}")]
    InvalidInput(#[from] ValidationError),
    #[error("no tracks to project")]
    EmptyInput,
    #[error("tracks contain no samples")]
    NoSamples,
    #[error("bounding extent is degenerate ({width} x {height} m)")]
    DegenerateExtent { width: f64, height: f64 },
}

/// Failure to read one source file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse GPX: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("failed to parse FIT: {0}")]
    Fit(String),
}

/// Fatal ingestion failure. Per-file problems are reported as warnings instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("cannot list {path}: {source}")]
    Unlistable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a boundary geometry source.
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("invalid bounds: {0}")]
    InvalidBounds(#[from] ValidationError),
    #[error("cannot read boundary file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed boundary file: {0}")]
    Format(#[from] geojson::Error),
    #[error("coordinate transform failed: {0}")]
    Transform(String),
    #[error("no valid boundaries found")]
    Empty,
}

/// Failure of an aerial imagery provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImageryError {
    #[error("invalid imagery request: {0}")]
    InvalidRequest(#[from] ValidationError),
    #[error("imagery provider failed: {0}")]
    Provider(String),
}

/// Failure to load the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Format(#[from] serde_json::Error),
}
