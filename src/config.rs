use crate::error::ConfigError;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const GPX_DIRECTORY: &str = "data/gpx";
pub const DEFAULT_WIDTH: u32 = 1400;
pub const DEFAULT_HEIGHT: u32 = 900;
pub const SCALE_FACTOR: f64 = 0.015;
pub const MAP_SCALE_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    pub gpx_directory: PathBuf,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Pixels per meter; `None` fits the tracks into the canvas.
    pub scale: Option<f64>,
    /// Meters trimmed from every side of the track extent.
    pub border: f64,
    pub boundaries: Option<BoundaryConfig>,
    pub imagery_multiplier: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryConfig {
    pub path: PathBuf,
    /// CRS of the boundary file, e.g. `"EPSG:3812"`. WGS84 when unset.
    #[serde(default)]
    pub source_crs: Option<String>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            gpx_directory: PathBuf::from(GPX_DIRECTORY),
            canvas_width: DEFAULT_WIDTH,
            canvas_height: DEFAULT_HEIGHT,
            scale: Some(SCALE_FACTOR),
            border: 0.0,
            boundaries: None,
            imagery_multiplier: MAP_SCALE_MULTIPLIER,
        }
    }
}

impl ReplayConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(reader)?)
    }
}
