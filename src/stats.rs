//! Per-track figures for the statistics overlay of a replay.

use crate::projection::{ProjectedPoint, ProjectedTrack};

pub const MPS_TO_KMH: f64 = 3.6;
pub const METERS_PER_KM: f64 = 1000.0;
const SECONDS_PER_HOUR: u64 = 3600;
const SECONDS_PER_MINUTE: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub source: String,
    pub total_distance: f64,
    pub total_time: u64,
    pub min_elevation: f64,
    pub max_elevation: f64,
    /// Meters per second, `None` for a track without elapsed time.
    pub average_speed: Option<f64>,
}

impl TrackSummary {
    pub fn from_track(track: &ProjectedTrack) -> Self {
        let (min_elevation, max_elevation) = track.points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), point| (min.min(point.elevation), max.max(point.elevation)),
        );
        Self {
            source: track.source.clone(),
            total_distance: track.total_distance,
            total_time: track.total_time,
            min_elevation,
            max_elevation,
            average_speed: track.average_speed(),
        }
    }
}

/// Points already passed after `elapsed` seconds of replay.
pub fn points_done(track: &ProjectedTrack, elapsed: u64) -> &[ProjectedPoint] {
    let done = track
        .points
        .partition_point(|point| point.elapsed_time < elapsed);
    &track.points[..done]
}

/// Meters per second over the last `sample_size` points.
pub fn recent_speed(points: &[ProjectedPoint], sample_size: usize) -> Option<f64> {
    if sample_size == 0 || points.is_empty() {
        return None;
    }
    let window = &points[points.len().saturating_sub(sample_size)..];
    let first = window.first()?;
    let last = window.last()?;
    let seconds = last.elapsed_time.checked_sub(first.elapsed_time)?;
    if seconds == 0 {
        return None;
    }
    let meters = last.cumulative_distance - first.cumulative_distance;
    Some(meters / seconds as f64)
}

pub fn mps_to_kmh(speed: f64) -> f64 {
    speed * MPS_TO_KMH
}

pub fn meters_to_km(meters: f64) -> f64 {
    meters / METERS_PER_KM
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_duration(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / SECONDS_PER_HOUR,
        (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
        seconds % SECONDS_PER_MINUTE
    )
}
