use crate::error::ValidationError;
use crate::validation::{
    validate_bounds, validate_elevation, validate_latitude, validate_longitude,
    validate_timestamp,
};
use geo::Coord;

/// One record as delivered by a file parser, before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub latitude: f64,
    pub longitude: f64,
    pub epoch_seconds: Option<i64>,
    pub elevation: Option<f64>,
}

/// A validated GPS fix. Can only be built through [`GpsSample::new`] or
/// `TryFrom<RawSample>`, so every instance is in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsSample {
    latitude: f64,
    longitude: f64,
    timestamp: i64,
    elevation: f64,
}

impl GpsSample {
    pub fn new(
        latitude: f64,
        longitude: f64,
        timestamp: i64,
        elevation: f64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            latitude: validate_latitude(latitude)?,
            longitude: validate_longitude(longitude)?,
            timestamp: validate_timestamp(Some(timestamp))?,
            elevation: validate_elevation(Some(elevation))?,
        })
    }

    /// Degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Epoch seconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Meters.
    pub fn elevation(&self) -> f64 {
        self.elevation
    }
}

impl TryFrom<RawSample> for GpsSample {
    type Error = ValidationError;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        Ok(Self {
            latitude: validate_latitude(raw.latitude)?,
            longitude: validate_longitude(raw.longitude)?,
            timestamp: validate_timestamp(raw.epoch_seconds)?,
            elevation: validate_elevation(raw.elevation)?,
        })
    }
}

/// A non-empty, time-ordered run of samples from one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    source: String,
    samples: Vec<GpsSample>,
}

impl Track {
    /// Returns `None` for an empty sample list.
    pub fn new(source: impl Into<String>, samples: Vec<GpsSample>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        Some(Self {
            source: source.into(),
            samples,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn samples(&self) -> &[GpsSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Axis-aligned lat/lon box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_bounds(self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }

    /// `x` is longitude, `y` latitude. Edges are inclusive.
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        (self.min_lon..=self.max_lon).contains(&coord.x)
            && (self.min_lat..=self.max_lat).contains(&coord.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_sample_conversion_checks_every_field() {
        let raw = RawSample {
            latitude: 50.85,
            longitude: 4.35,
            epoch_seconds: Some(1_693_055_671),
            elevation: Some(58.2),
        };
        let sample = GpsSample::try_from(raw).unwrap();
        assert_eq!(sample.latitude(), 50.85);
        assert_eq!(sample.timestamp(), 1_693_055_671);

        let no_time = RawSample {
            epoch_seconds: None,
            ..raw
        };
        assert!(GpsSample::try_from(no_time).is_err());

        let bad_lon = RawSample {
            longitude: 200.0,
            ..raw
        };
        assert!(GpsSample::try_from(bad_lon).is_err());
    }

    #[test]
    fn empty_track_is_rejected() {
        assert!(Track::new("empty.gpx", Vec::new()).is_none());

        let sample = GpsSample::new(50.0, 4.0, 0, 10.0).unwrap();
        let track = Track::new("one.gpx", vec![sample]).unwrap();
        assert_eq!(track.len(), 1);
        assert_eq!(track.source(), "one.gpx");
    }
}
