use super::Parser;
use crate::error::ParseError;
use crate::sample::RawSample;
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const SEMICIRCLES_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/**
 * Parse .fit and .fit.gz activity files, as exported by Strava and most
 * bike computers.
 */
pub struct FitParser;

impl Parser for FitParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawSample>, ParseError> {
        let mut file = File::open(file_path)?;
        let mut data = Vec::new();

        let gzipped = file_path
            .to_str()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".gz"));
        if gzipped {
            GzDecoder::new(file).read_to_end(&mut data)?;
        } else {
            file.read_to_end(&mut data)?;
        }

        read_samples(&data)
    }

    fn name(&self) -> &'static str {
        "FIT Parser"
    }
}

pub fn read_samples(data: &[u8]) -> Result<Vec<RawSample>, ParseError> {
    let fit_file = fitparser::from_bytes(data).map_err(|e| ParseError::Fit(e.to_string()))?;

    Ok(fit_file
        .iter()
        .filter(|record| record.kind() == MesgNum::Record)
        .filter_map(extract_sample_from_record)
        .collect())
}

fn extract_sample_from_record(record: &FitDataRecord) -> Option<RawSample> {
    sample_from_fields(
        record
            .fields()
            .iter()
            .map(|field| (field.name(), field.value())),
    )
}

// records without a position fix are skipped here; missing time or altitude
// is left for validation to report
fn sample_from_fields<'a>(
    fields: impl IntoIterator<Item = (&'a str, &'a Value)>,
) -> Option<RawSample> {
    let mut latitude: Option<f64> = None;
    let mut longitude: Option<f64> = None;
    let mut epoch_seconds: Option<i64> = None;
    let mut altitude: Option<f64> = None;
    let mut enhanced_altitude: Option<f64> = None;

    for (name, value) in fields {
        match name {
            "position_lat" => latitude = extract_numeric_value(value),
            "position_long" => longitude = extract_numeric_value(value),
            "timestamp" => {
                if let Value::Timestamp(time) = value {
                    epoch_seconds = Some(time.timestamp());
                }
            }
            "altitude" => altitude = extract_numeric_value(value),
            "enhanced_altitude" => enhanced_altitude = extract_numeric_value(value),
            _ => {} // ignore other fields
        }
    }

    let (lat, lon) = (latitude?, longitude?);
    Some(RawSample {
        latitude: lat * SEMICIRCLES_TO_DEGREES,
        longitude: lon * SEMICIRCLES_TO_DEGREES,
        epoch_seconds,
        elevation: enhanced_altitude.or(altitude),
    })
}

fn extract_numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::SInt32(v) => Some(*v as f64),
        Value::UInt32(v) => Some(*v as f64),
        Value::SInt16(v) => Some(*v as f64),
        Value::UInt16(v) => Some(*v as f64),
        Value::SInt8(v) => Some(*v as f64),
        Value::UInt8(v) => Some(*v as f64),
        Value::Float32(v) => Some(*v as f64),
        Value::Float64(v) => Some(*v),
        _ => None,
    }
}
