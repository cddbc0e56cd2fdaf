//! Range and finiteness checks for every number entering the pipeline.

use crate::error::ValidationError;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;
pub const MIN_SCALE: f64 = 0.000_001;
pub const MAX_SCALE: f64 = 1_000_000.0;
pub const MIN_DIMENSION: u32 = 1;
pub const MAX_DIMENSION: u32 = 100_000;
pub const MIN_TOLERANCE: f64 = 0.000_000_001;
pub const MAX_TOLERANCE: f64 = 1.0;

pub fn validate_finite(value: f64, field: &'static str) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonFinite { field, value })
    }
}

fn validate_range(
    value: f64,
    field: &'static str,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    let value = validate_finite(value, field)?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

pub fn validate_latitude(latitude: f64) -> Result<f64, ValidationError> {
    validate_range(latitude, "latitude", MIN_LATITUDE, MAX_LATITUDE)
}

pub fn validate_longitude(longitude: f64) -> Result<f64, ValidationError> {
    validate_range(longitude, "longitude", MIN_LONGITUDE, MAX_LONGITUDE)
}

pub fn validate_elevation(elevation: Option<f64>) -> Result<f64, ValidationError> {
    let elevation = elevation.ok_or(ValidationError::MissingField { field: "elevation" })?;
    validate_finite(elevation, "elevation")
}

pub fn validate_timestamp(epoch_seconds: Option<i64>) -> Result<i64, ValidationError> {
    match epoch_seconds {
        None => Err(ValidationError::MissingField { field: "timestamp" }),
        Some(value) if value < 0 => Err(ValidationError::NegativeTimestamp { value }),
        Some(value) => Ok(value),
    }
}

pub fn validate_scale(scale: f64) -> Result<f64, ValidationError> {
    validate_range(scale, "scale", MIN_SCALE, MAX_SCALE)
}

/// Grid size in degrees that bounding boxes are snapped to.
pub fn validate_tolerance(tolerance: f64) -> Result<f64, ValidationError> {
    validate_range(tolerance, "tolerance", MIN_TOLERANCE, MAX_TOLERANCE)
}

/// Border is a margin in metric-plane meters; zero disables it.
pub fn validate_border(border: f64) -> Result<f64, ValidationError> {
    validate_range(border, "border", 0.0, f64::MAX)
}

pub fn validate_aspect_ratio(aspect_ratio: f64) -> Result<f64, ValidationError> {
    let aspect_ratio = validate_finite(aspect_ratio, "aspect ratio")?;
    if aspect_ratio > 0.0 && aspect_ratio <= 1.0 {
        Ok(aspect_ratio)
    } else {
        Err(ValidationError::OutOfRange {
            field: "aspect ratio",
            value: aspect_ratio,
            min: f64::MIN_POSITIVE,
            max: 1.0,
        })
    }
}

pub fn validate_dimension(dimension: u32, field: &'static str) -> Result<u32, ValidationError> {
    if (MIN_DIMENSION..=MAX_DIMENSION).contains(&dimension) {
        Ok(dimension)
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value: f64::from(dimension),
            min: f64::from(MIN_DIMENSION),
            max: f64::from(MAX_DIMENSION),
        })
    }
}

/// Checks a lat/lon box: every edge in range, west edge left of east edge,
/// south edge below north edge.
pub fn validate_bounds(
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
) -> Result<(), ValidationError> {
    validate_longitude(min_lon)?;
    validate_latitude(min_lat)?;
    validate_longitude(max_lon)?;
    validate_latitude(max_lat)?;

    if min_lon >= max_lon {
        return Err(ValidationError::InvertedBounds {
            low_name: "min longitude",
            low: min_lon,
            high_name: "max longitude",
            high: max_lon,
        });
    }
    if min_lat >= max_lat {
        return Err(ValidationError::InvertedBounds {
            low_name: "min latitude",
            low: min_lat,
            high_name: "max latitude",
            high: max_lat,
        });
    }
    Ok(())
}

/// Checks the parameters of a finished projection. Center coordinates are in
/// radians.
pub fn validate_transformation_parameters(
    center_latitude: f64,
    center_longitude: f64,
    aspect_ratio: f64,
    scale: f64,
) -> Result<(), ValidationError> {
    validate_latitude(center_latitude.to_degrees())?;
    validate_longitude(center_longitude.to_degrees())?;
    validate_aspect_ratio(aspect_ratio)?;
    validate_scale(scale)?;
    Ok(())
}
