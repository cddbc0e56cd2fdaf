use super::Parser;
use crate::error::ParseError;
use crate::sample::RawSample;
use gpx::{Gpx, Waypoint};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use time::OffsetDateTime;

pub struct GpxParser;

impl Parser for GpxParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawSample>, ParseError> {
        let file = File::open(file_path)?;
        read_samples(BufReader::new(file))
    }

    fn name(&self) -> &'static str {
        "GPX Parser"
    }
}

/// Flattens the track points of every track and segment, in document order.
pub fn read_samples<R: BufRead>(reader: R) -> Result<Vec<RawSample>, ParseError> {
    let gpx: Gpx = gpx::read(reader)?;

    let samples = gpx
        .tracks
        .iter()
        .flat_map(|track| &track.segments)
        .flat_map(|segment| &segment.points)
        .map(raw_sample)
        .collect();

    Ok(samples)
}

fn raw_sample(waypoint: &Waypoint) -> RawSample {
    let point = waypoint.point();
    RawSample {
        latitude: point.y(),
        longitude: point.x(),
        epoch_seconds: waypoint
            .time
            .clone()
            .map(|time| OffsetDateTime::from(time).unix_timestamp()),
        elevation: waypoint.elevation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>ride</name>
    <trkseg>
      <trkpt lat="50.8503" lon="4.3517"><ele>58.0</ele><time>2023-08-26T11:14:31Z</time></trkpt>
      <trkpt lat="50.8510" lon="4.3525"><ele>59.5</ele><time>2023-08-26T11:15:31Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="50.8520" lon="4.3530"><time>2023-08-26T11:16:31Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn reads_all_segments_in_order() {
        let samples = read_samples(RIDE.as_bytes()).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].latitude, 50.8503);
        assert_eq!(samples[0].longitude, 4.3517);
        assert_eq!(samples[0].epoch_seconds, Some(1_693_048_471));
        assert_eq!(samples[1].epoch_seconds, Some(1_693_048_531));
        assert_eq!(samples[1].elevation, Some(59.5));
        assert_eq!(samples[2].elevation, None);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(read_samples("<gpx><trk>".as_bytes()).is_err());
        assert!(read_samples("not xml at all".as_bytes()).is_err());
    }
}
