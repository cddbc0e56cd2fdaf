//! Administrative boundary overlay.
//!
//! Boundaries are read from a GeoJSON FeatureCollection whose features carry
//! `name` and `region_code` properties, optionally reprojected to WGS84 and
//! clipped to a box. Features without a polygon are skipped one by one.

use crate::error::BoundaryError;
use crate::sample::GeoBounds;
use crate::validation::{validate_latitude, validate_longitude};
use geo::{Coord, coord};
use geojson::{Feature, FeatureCollection, GeoJson, Position, Value};
use log::{info, warn};
use proj::Proj;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};

pub const EPSG_WGS84: &str = "EPSG:4326";

/// One region outline in degrees, `x` is longitude and `y` latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub name: String,
    pub region_code: String,
    pub vertices: Vec<Coord<f64>>,
}

/// A [`Boundary`] placed in the pixel space of a projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedBoundary {
    pub name: String,
    pub region_code: String,
    pub vertices: Vec<Coord<f64>>,
}

pub trait BoundarySource {
    /// Boundaries with at least one vertex inside `bounds`.
    fn load(&self, bounds: &GeoBounds) -> Result<Vec<Boundary>, BoundaryError>;
}

/// Name, region code and outline of one feature, or `None` when the feature
/// carries no polygon.
fn feature_parts(feature: &Feature) -> Option<(String, String, Vec<Coord<f64>>)> {
    let name = feature
        .property("name")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();
    // region codes show up both as numbers and as strings
    let region_code = match feature.property("region_code") {
        Some(JsonValue::String(code)) => code.clone(),
        Some(JsonValue::Number(code)) => code.to_string(),
        _ => String::new(),
    };

    let rings: Vec<&Vec<Position>> = match &feature.geometry.as_ref()?.value {
        Value::Polygon(rings) => rings.iter().collect(),
        Value::MultiPolygon(polygons) => polygons.iter().flatten().collect(),
        _ => {
            warn!("Skipping boundary {:?}: geometry is not a polygon", name);
            return None;
        }
    };
    let vertices = rings
        .into_iter()
        .flatten()
        .filter_map(|position| match position.as_slice() {
            [x, y, ..] => Some(coord! { x: *x, y: *y }),
            _ => None,
        })
        .collect();
    Some((name, region_code, vertices))
}

/// Reads boundaries from a GeoJSON file.
///
/// With `source_crs` set (e.g. `"EPSG:3812"`), coordinates are transformed to
/// WGS84 before clipping.
pub struct GeoJsonBoundarySource {
    path: PathBuf,
    source_crs: Option<String>,
}

impl GeoJsonBoundarySource {
    pub fn new(path: impl AsRef<Path>, source_crs: Option<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            source_crs,
        }
    }

    fn read_collection(&self) -> Result<FeatureCollection, BoundaryError> {
        let json = fs::read_to_string(&self.path).map_err(|source| BoundaryError::Io {
            path: self.path.clone(),
            source,
        })?;
        let geojson = json.parse::<GeoJson>()?;
        Ok(FeatureCollection::try_from(geojson)?)
    }

    fn transformer(&self) -> Result<Option<Proj>, BoundaryError> {
        match &self.source_crs {
            None => Ok(None),
            Some(crs) if crs == EPSG_WGS84 => Ok(None),
            Some(crs) => Proj::new_known_crs(crs, EPSG_WGS84, None)
                .map(Some)
                .map_err(|e| BoundaryError::Transform(format!("{crs} -> {EPSG_WGS84}: {e}"))),
        }
    }
}

impl BoundarySource for GeoJsonBoundarySource {
    fn load(&self, bounds: &GeoBounds) -> Result<Vec<Boundary>, BoundaryError> {
        bounds.validate()?;

        let collection = self.read_collection()?;
        let transformer = self.transformer()?;

        let total = collection.features.len();
        let boundaries: Vec<Boundary> = collection
            .features
            .iter()
            .filter_map(|feature| {
                let (name, region_code, vertices) = feature_parts(feature)?;
                let vertices = reproject(vertices, transformer.as_ref());
                clip_boundary(name, region_code, vertices, bounds)
            })
            .collect();

        info!(
            "Loaded {} of {} boundaries from {}",
            boundaries.len(),
            total,
            self.path.display()
        );
        if boundaries.is_empty() {
            return Err(BoundaryError::Empty);
        }
        Ok(boundaries)
    }
}

fn reproject(vertices: Vec<Coord<f64>>, transformer: Option<&Proj>) -> Vec<Coord<f64>> {
    let Some(proj) = transformer else {
        return vertices;
    };
    vertices
        .into_iter()
        .filter_map(|vertex| match proj.convert((vertex.x, vertex.y)) {
            Ok((x, y)) => Some(coord! { x: x, y: y }),
            Err(e) => {
                warn!("Skipping vertex ({}, {}): {}", vertex.x, vertex.y, e);
                None
            }
        })
        .collect()
}

/// Keeps the valid vertices inside `bounds`. Drops the feature if it has no
/// name or nothing is left.
pub fn clip_boundary(
    name: String,
    region_code: String,
    vertices: Vec<Coord<f64>>,
    bounds: &GeoBounds,
) -> Option<Boundary> {
    if name.trim().is_empty() {
        warn!(
            "Skipping boundary with missing name ({} vertices)",
            vertices.len()
        );
        return None;
    }

    let vertices: Vec<Coord<f64>> = vertices
        .into_iter()
        .filter(|vertex| {
            validate_longitude(vertex.x).is_ok() && validate_latitude(vertex.y).is_ok()
        })
        .filter(|vertex| bounds.contains(*vertex))
        .collect();

    if vertices.is_empty() {
        return None;
    }
    Some(Boundary {
        name,
        region_code,
        vertices,
    })
}
