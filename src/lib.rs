//! Replays GPS tracks on a map: ingestion of GPX/FIT files, validation, and
//! an equirectangular projection into one shared pixel space, plus the
//! boundary and imagery overlays that are placed in the same space.

pub mod boundaries;
pub mod config;
pub mod error;
pub mod imagery;
pub mod ingest;
pub mod parsers;
pub mod projection;
pub mod sample;
pub mod stats;
pub mod validation;

pub use error::{ProjectionError, ValidationError};
pub use ingest::{IngestReport, IngestWarning, ingest_directory};
pub use projection::{ProjectedPoint, ProjectedTrack, ProjectionContext, ProjectionResult, project};
pub use sample::{GeoBounds, GpsSample, RawSample, Track};
