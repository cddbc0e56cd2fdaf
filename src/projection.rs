//! Equirectangular projection of GPS tracks into a shared pixel space.
//!
//! The metric plane is `x = R·λ·cos(φ0)`, `y = R·φ`, with `φ0` the mean
//! latitude of the whole batch, so every track of one call shares a frame.
//! Pixel space has its origin at the top left and y growing downwards.

use crate::boundaries::{Boundary, ProjectedBoundary};
use crate::error::ProjectionError;
use crate::sample::{GeoBounds, GpsSample, Track};
use crate::validation::{
    validate_border, validate_dimension, validate_scale, validate_transformation_parameters,
};
use geo::{Coord, Point, Rect, coord};
use log::{debug, warn};
use rayon::prelude::*;

/// Mean earth radius in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Projects degrees onto the metric plane for the given aspect ratio factor.
pub fn to_metric(latitude: f64, longitude: f64, aspect_ratio_factor: f64) -> Coord<f64> {
    coord! {
        x: EARTH_RADIUS * longitude.to_radians() * aspect_ratio_factor,
        y: EARTH_RADIUS * latitude.to_radians(),
    }
}

/// Inverse of [`to_metric`]. Returns `(latitude, longitude)` in degrees.
pub fn from_metric(metric: Coord<f64>, aspect_ratio_factor: f64) -> (f64, f64) {
    let latitude = (metric.y / EARTH_RADIUS).to_degrees();
    let longitude = (metric.x / (EARTH_RADIUS * aspect_ratio_factor)).to_degrees();
    (latitude, longitude)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub pixel_position: Coord<f64>,
    /// Seconds since the first sample of the track.
    pub elapsed_time: u64,
    /// Metric-plane meters from the previous point, zero for the first.
    pub segment_length: f64,
    pub cumulative_distance: f64,
    /// Original fix, `x` is longitude and `y` latitude.
    pub real_coordinates: Point<f64>,
    pub elevation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedTrack {
    pub source: String,
    pub points: Vec<ProjectedPoint>,
    pub total_time: u64,
    pub total_distance: f64,
}

impl ProjectedTrack {
    /// Meters per second over the whole track; `None` when no time elapsed.
    pub fn average_speed(&self) -> Option<f64> {
        (self.total_time > 0).then(|| self.total_distance / self.total_time as f64)
    }
}

/// Everything needed to put more geometry into the same pixel space as a
/// projected batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionContext {
    /// Radians.
    pub center_latitude: f64,
    /// Radians.
    pub center_longitude: f64,
    pub aspect_ratio_factor: f64,
    /// Pixels per metric-plane meter.
    pub scale: f64,
    pub border: f64,
    /// Metric coordinate that lands on the bottom-left pixel corner.
    pub origin: Coord<f64>,
    pub canvas_height: f64,
}

impl ProjectionContext {
    pub fn metric_to_pixel(&self, metric: Coord<f64>) -> Coord<f64> {
        coord! {
            x: (metric.x - (self.origin.x + self.border)) * self.scale,
            y: self.canvas_height - (metric.y - (self.origin.y + self.border)) * self.scale,
        }
    }

    pub fn pixel_to_metric(&self, pixel: Coord<f64>) -> Coord<f64> {
        coord! {
            x: pixel.x / self.scale + self.origin.x + self.border,
            y: (self.canvas_height - pixel.y) / self.scale + self.origin.y + self.border,
        }
    }

    pub fn geo_to_pixel(&self, latitude: f64, longitude: f64) -> Coord<f64> {
        self.metric_to_pixel(to_metric(latitude, longitude, self.aspect_ratio_factor))
    }

    /// Reverse mapping for cursor queries. Returns `(latitude, longitude)`.
    pub fn pixel_to_geo(&self, pixel: Coord<f64>) -> (f64, f64) {
        from_metric(self.pixel_to_metric(pixel), self.aspect_ratio_factor)
    }

    pub fn project_boundary(&self, boundary: &Boundary) -> ProjectedBoundary {
        ProjectedBoundary {
            name: boundary.name.clone(),
            region_code: boundary.region_code.clone(),
            vertices: boundary
                .vertices
                .iter()
                .map(|vertex| self.geo_to_pixel(vertex.y, vertex.x))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    pub tracks: Vec<ProjectedTrack>,
    pub content_width: f64,
    pub content_height: f64,
    pub context: ProjectionContext,
    /// Bounding extent on the metric plane, before the border is trimmed.
    pub extent: Rect<f64>,
}

impl ProjectionResult {
    /// Lat/lon box around every projected sample.
    pub fn geographic_bounds(&self) -> GeoBounds {
        let mut bounds = GeoBounds {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for point in self.tracks.iter().flat_map(|track| &track.points) {
            let real = point.real_coordinates;
            bounds.min_lon = bounds.min_lon.min(real.x());
            bounds.max_lon = bounds.max_lon.max(real.x());
            bounds.min_lat = bounds.min_lat.min(real.y());
            bounds.max_lat = bounds.max_lat.max(real.y());
        }
        bounds
    }

    pub fn project_boundaries(&self, boundaries: &[Boundary]) -> Vec<ProjectedBoundary> {
        boundaries
            .iter()
            .map(|boundary| self.context.project_boundary(boundary))
            .collect()
    }
}

/// Scale that fits `extent_width x extent_height` meters into the canvas
/// without stretching.
pub fn fit_scale(
    extent_width: f64,
    extent_height: f64,
    canvas_width: f64,
    canvas_height: f64,
) -> f64 {
    if canvas_width / canvas_height > extent_width / extent_height {
        canvas_height / extent_height
    } else {
        canvas_width / extent_width
    }
}

// metric position and kinematics, before the pixel mapping is known
struct MetricTrack<'a> {
    track: &'a Track,
    positions: Vec<Coord<f64>>,
    segment_lengths: Vec<f64>,
    cumulative: Vec<f64>,
    elapsed: Vec<u64>,
}

fn measure_track(track: &Track, aspect_ratio_factor: f64) -> MetricTrack<'_> {
    let samples = track.samples();
    let start_time = samples[0].timestamp();

    let positions: Vec<Coord<f64>> = samples
        .iter()
        .map(|s| to_metric(s.latitude(), s.longitude(), aspect_ratio_factor))
        .collect();

    let mut segment_lengths = Vec::with_capacity(positions.len());
    let mut cumulative = Vec::with_capacity(positions.len());
    let mut distance = 0.0;
    for (i, position) in positions.iter().enumerate() {
        let length = match i {
            0 => 0.0,
            _ => {
                let previous = positions[i - 1];
                (position.x - previous.x).hypot(position.y - previous.y)
            }
        };
        distance += length;
        segment_lengths.push(length);
        cumulative.push(distance);
    }

    let mut out_of_order = false;
    let elapsed: Vec<u64> = samples
        .iter()
        .map(|s| {
            let delta = s.timestamp() - start_time;
            out_of_order |= delta < 0;
            delta.max(0) as u64
        })
        .collect();
    if out_of_order {
        warn!(
            "{}: timestamps go back before the first sample, clamped to 0",
            track.source()
        );
    }

    MetricTrack {
        track,
        positions,
        segment_lengths,
        cumulative,
        elapsed,
    }
}

fn to_pixels(metric: MetricTrack<'_>, context: &ProjectionContext) -> ProjectedTrack {
    let samples: &[GpsSample] = metric.track.samples();
    let points: Vec<ProjectedPoint> = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| ProjectedPoint {
            pixel_position: context.metric_to_pixel(metric.positions[i]),
            elapsed_time: metric.elapsed[i],
            segment_length: metric.segment_lengths[i],
            cumulative_distance: metric.cumulative[i],
            real_coordinates: Point::new(sample.longitude(), sample.latitude()),
            elevation: sample.elevation(),
        })
        .collect();

    let last = points.last();
    ProjectedTrack {
        source: metric.track.source().to_owned(),
        total_time: last.map_or(0, |p| p.elapsed_time),
        total_distance: last.map_or(0.0, |p| p.cumulative_distance),
        points,
    }
}

/// Projects a batch of tracks into a `canvas_width x canvas_height` pixel
/// space.
///
/// With `scale` unset the whole metric extent is fitted into the canvas.
/// `border` is in metric-plane meters and trimmed from every side afterwards,
/// so the content is `(extent - 2 * border) * scale`.
pub fn project(
    tracks: &[Track],
    canvas_width: u32,
    canvas_height: u32,
    scale: Option<f64>,
    border: f64,
) -> Result<ProjectionResult, ProjectionError> {
    validate_dimension(canvas_width, "canvas width")?;
    validate_dimension(canvas_height, "canvas height")?;
    if let Some(scale) = scale {
        validate_scale(scale)?;
    }
    validate_border(border)?;
    if tracks.is_empty() {
        return Err(ProjectionError::EmptyInput);
    }

    let sample_count: usize = tracks.iter().map(Track::len).sum();
    if sample_count == 0 {
        return Err(ProjectionError::NoSamples);
    }
    let (latitude_sum, longitude_sum) = tracks
        .iter()
        .flat_map(Track::samples)
        .fold((0.0, 0.0), |(lat, lon), s| {
            (lat + s.latitude().to_radians(), lon + s.longitude().to_radians())
        });
    let center_latitude = latitude_sum / sample_count as f64;
    let center_longitude = longitude_sum / sample_count as f64;
    let aspect_ratio_factor = center_latitude.cos();

    let measured: Vec<MetricTrack<'_>> = tracks
        .par_iter()
        .map(|track| measure_track(track, aspect_ratio_factor))
        .collect();

    let (mut min, mut max) = (
        coord! { x: f64::INFINITY, y: f64::INFINITY },
        coord! { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY },
    );
    for position in measured.iter().flat_map(|m| &m.positions) {
        min.x = min.x.min(position.x);
        min.y = min.y.min(position.y);
        max.x = max.x.max(position.x);
        max.y = max.y.max(position.y);
    }
    let extent = Rect::new(min, max);

    if extent.width() <= 0.0 || extent.height() <= 0.0 {
        return Err(ProjectionError::DegenerateExtent {
            width: extent.width(),
            height: extent.height(),
        });
    }
    let trimmed_width = extent.width() - 2.0 * border;
    let trimmed_height = extent.height() - 2.0 * border;
    if trimmed_width <= 0.0 || trimmed_height <= 0.0 {
        return Err(ProjectionError::DegenerateExtent {
            width: trimmed_width,
            height: trimmed_height,
        });
    }

    let scale = scale.unwrap_or_else(|| {
        fit_scale(
            extent.width(),
            extent.height(),
            f64::from(canvas_width),
            f64::from(canvas_height),
        )
    });
    validate_transformation_parameters(
        center_latitude,
        center_longitude,
        aspect_ratio_factor,
        scale,
    )?;

    let context = ProjectionContext {
        center_latitude,
        center_longitude,
        aspect_ratio_factor,
        scale,
        border,
        origin: extent.min(),
        canvas_height: f64::from(canvas_height),
    };
    debug!("Projection context: {:?}", context);

    let projected: Vec<ProjectedTrack> = measured
        .into_par_iter()
        .map(|metric| to_pixels(metric, &context))
        .collect();

    Ok(ProjectionResult {
        tracks: projected,
        content_width: trimmed_width * scale,
        content_height: trimmed_height * scale,
        context,
        extent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use approx::assert_abs_diff_eq;

    fn track(source: &str, samples: &[(f64, f64, i64, f64)]) -> Track {
        let samples = samples
            .iter()
            .map(|&(lat, lon, t, e)| GpsSample::new(lat, lon, t, e).unwrap())
            .collect();
        Track::new(source, samples).unwrap()
    }

    fn example_tracks() -> Vec<Track> {
        vec![
            track("a", &[(50.0, 4.0, 0, 10.0), (50.001, 4.001, 60, 15.0)]),
            track("b", &[(50.0005, 4.0005, 0, 12.0), (50.0015, 4.0015, 30, 8.0)]),
        ]
    }

    #[test]
    fn two_tracks_into_a_square_canvas() {
        let result = project(&example_tracks(), 1000, 1000, None, 0.0).unwrap();

        for point in result.tracks.iter().flat_map(|t| &t.points) {
            let p = point.pixel_position;
            assert!(p.x.is_finite() && p.y.is_finite());
            assert!((-1e-9..=1000.0 + 1e-9).contains(&p.x), "x = {}", p.x);
            assert!((-1e-9..=1000.0 + 1e-9).contains(&p.y), "y = {}", p.y);
        }

        let a = &result.tracks[0];
        let b = &result.tracks[1];
        assert_eq!(a.points[1].elapsed_time, 60);
        assert_eq!(b.points[1].elapsed_time, 30);
        assert!(a.points[1].segment_length > 0.0);
        assert!(b.points[1].segment_length > 0.0);
        assert_eq!(a.points[0].segment_length, 0.0);
        assert_eq!(a.total_time, 60);
        assert_eq!(a.total_distance, a.points[1].cumulative_distance);
        assert_eq!(a.points[0].real_coordinates, Point::new(4.0, 50.0));
        assert_eq!(b.points[1].elevation, 8.0);
    }

    #[test]
    fn origin_is_the_batch_mean() {
        let result = project(&example_tracks(), 1000, 1000, None, 0.0).unwrap();
        let context = result.context;

        let mean_lat = (50.0 + 50.001 + 50.0005 + 50.0015) / 4.0;
        let mean_lon = (4.0 + 4.001 + 4.0005 + 4.0015) / 4.0;
        assert_abs_diff_eq!(context.center_latitude.to_degrees(), mean_lat, epsilon = 1e-9);
        assert_abs_diff_eq!(context.center_longitude.to_degrees(), mean_lon, epsilon = 1e-9);
        assert_abs_diff_eq!(
            context.aspect_ratio_factor,
            context.center_latitude.cos(),
            epsilon = 1e-15
        );
        assert!(context.aspect_ratio_factor > 0.0 && context.aspect_ratio_factor <= 1.0);
    }

    #[test]
    fn segment_length_is_metric_plane_distance() {
        let result = project(&example_tracks(), 1000, 1000, None, 0.0).unwrap();
        let aspect = result.context.aspect_ratio_factor;

        let p0 = to_metric(50.0, 4.0, aspect);
        let p1 = to_metric(50.001, 4.001, aspect);
        let expected = ((p1.x - p0.x).powi(2) + (p1.y - p0.y).powi(2)).sqrt();
        assert_abs_diff_eq!(result.tracks[0].points[1].segment_length, expected, epsilon = 1e-9);
        // roughly 111 m north and 72 m east at this latitude
        assert!(expected > 120.0 && expected < 140.0);
    }

    #[test]
    fn cumulative_distance_never_decreases() {
        let zigzag = track(
            "zigzag",
            &[
                (50.0, 4.0, 0, 1.0),
                (50.01, 4.0, 10, 1.0),
                (50.01, 4.0, 20, 1.0),
                (50.0, 4.01, 30, 1.0),
                (50.02, 4.02, 40, 1.0),
            ],
        );
        let result = project(&[zigzag], 800, 600, None, 0.0).unwrap();
        let points = &result.tracks[0].points;
        for pair in points.windows(2) {
            assert!(pair[1].cumulative_distance >= pair[0].cumulative_distance);
        }
        assert_eq!(points[2].segment_length, 0.0);
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        let cases = [
            (300.0, 100.0, 1000.0, 1000.0),
            (100.0, 300.0, 1000.0, 1000.0),
            (50.0, 50.0, 1400.0, 900.0),
            (1234.5, 17.0, 640.0, 480.0),
        ];
        for (w, h, cw, ch) in cases {
            let s = fit_scale(w, h, cw, ch);
            assert!(s * w <= cw + 1e-9);
            assert!(s * h <= ch + 1e-9);
            assert!((s * w - cw).abs() < 1e-9 || (s * h - ch).abs() < 1e-9);
        }
    }

    #[test]
    fn content_size_matches_fitted_canvas() {
        let result = project(&example_tracks(), 1400, 900, None, 0.0).unwrap();
        assert!(result.content_width <= 1400.0 + 1e-9);
        assert!(result.content_height <= 900.0 + 1e-9);
        assert!(
            (result.content_width - 1400.0).abs() < 1e-9
                || (result.content_height - 900.0).abs() < 1e-9
        );
    }

    #[test]
    fn explicit_scale_is_used_as_is() {
        let result = project(&example_tracks(), 1400, 900, Some(0.015), 0.0).unwrap();
        assert_eq!(result.context.scale, 0.015);
        assert_abs_diff_eq!(
            result.content_width,
            result.extent.width() * 0.015,
            epsilon = 1e-12
        );
    }

    #[test]
    fn fitted_scale_ignores_the_border() {
        let tracks = vec![track(
            "diagonal",
            &[(50.0, 4.0, 0, 10.0), (50.01, 4.01, 600, 20.0)],
        )];
        let result = project(&tracks, 1000, 1000, None, 100.0).unwrap();
        let plain = project(&tracks, 1000, 1000, None, 0.0).unwrap();

        let expected = fit_scale(result.extent.width(), result.extent.height(), 1000.0, 1000.0);
        assert_abs_diff_eq!(result.context.scale, expected, epsilon = 1e-15);
        assert_abs_diff_eq!(result.context.scale, plain.context.scale, epsilon = 1e-15);
        assert_abs_diff_eq!(
            result.content_height,
            (result.extent.height() - 200.0) * expected,
            epsilon = 1e-9
        );
        assert!(result.content_height < 1000.0);
    }

    #[test]
    fn border_is_trimmed_from_both_sides() {
        let plain = project(&example_tracks(), 1000, 1000, Some(1.0), 0.0).unwrap();
        let framed = project(&example_tracks(), 1000, 1000, Some(1.0), 10.0).unwrap();

        assert_abs_diff_eq!(
            framed.content_width,
            plain.content_width - 20.0,
            epsilon = 1e-9
        );
        let shift = plain.tracks[0].points[0].pixel_position.x
            - framed.tracks[0].points[0].pixel_position.x;
        assert_abs_diff_eq!(shift, 10.0, epsilon = 1e-9);

        assert!(matches!(
            project(&example_tracks(), 1000, 1000, None, 1_000.0),
            Err(ProjectionError::DegenerateExtent { .. })
        ));
    }

    #[test]
    fn repeated_sample_is_degenerate() {
        let still = track("still", &[(50.0, 4.0, 0, 1.0); 5]);
        assert!(matches!(
            project(&[still], 1000, 1000, None, 0.0),
            Err(ProjectionError::DegenerateExtent { .. })
        ));
    }

    #[test]
    fn single_sample_track_has_zero_totals() {
        let single = track("single", &[(50.0007, 4.0002, 500, 3.0)]);
        let mut tracks = example_tracks();
        tracks.push(single);

        let result = project(&tracks, 1000, 1000, None, 0.0).unwrap();
        let single = &result.tracks[2];
        assert_eq!(single.total_time, 0);
        assert_eq!(single.total_distance, 0.0);
        assert_eq!(single.average_speed(), None);
        assert!(result.tracks[0].average_speed().unwrap() > 0.0);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let tracks = example_tracks();
        assert!(matches!(
            project(&tracks, 0, 1000, None, 0.0),
            Err(ProjectionError::InvalidInput(ValidationError::OutOfRange { .. }))
        ));
        assert!(project(&tracks, 1000, 100_001, None, 0.0).is_err());
        assert!(project(&tracks, 1000, 1000, Some(0.0), 0.0).is_err());
        assert!(project(&tracks, 1000, 1000, Some(f64::NAN), 0.0).is_err());
        assert!(project(&tracks, 1000, 1000, Some(2e6), 0.0).is_err());
        assert!(project(&tracks, 1000, 1000, None, -1.0).is_err());
        assert_eq!(
            project(&[], 1000, 1000, None, 0.0),
            Err(ProjectionError::EmptyInput)
        );
    }

    #[test]
    fn metric_round_trip() {
        let aspect = 50.5_f64.to_radians().cos();
        for (lat, lon) in [(50.0, 4.0), (-33.9, 151.2), (0.0, 0.0), (89.9, -179.9)] {
            let (back_lat, back_lon) = from_metric(to_metric(lat, lon, aspect), aspect);
            assert_abs_diff_eq!(back_lat, lat, epsilon = 1e-9);
            assert_abs_diff_eq!(back_lon, lon, epsilon = 1e-9);
        }
    }

    #[test]
    fn pixel_round_trip() {
        let result = project(&example_tracks(), 1000, 1000, None, 5.0).unwrap();
        let context = result.context;
        for point in result.tracks.iter().flat_map(|t| &t.points) {
            let (lat, lon) = context.pixel_to_geo(point.pixel_position);
            assert_abs_diff_eq!(lat, point.real_coordinates.y(), epsilon = 1e-9);
            assert_abs_diff_eq!(lon, point.real_coordinates.x(), epsilon = 1e-9);
        }

        let pixel = context.geo_to_pixel(50.0008, 4.0003);
        let (lat, lon) = context.pixel_to_geo(pixel);
        assert_abs_diff_eq!(lat, 50.0008, epsilon = 1e-9);
        assert_abs_diff_eq!(lon, 4.0003, epsilon = 1e-9);
    }

    #[test]
    fn north_is_up() {
        let result = project(&example_tracks(), 1000, 1000, None, 0.0).unwrap();
        let a = &result.tracks[0];
        assert!(a.points[1].pixel_position.y < a.points[0].pixel_position.y);
        assert!(a.points[1].pixel_position.x > a.points[0].pixel_position.x);
    }

    #[test]
    fn geographic_bounds_cover_all_samples() {
        let result = project(&example_tracks(), 1000, 1000, None, 0.0).unwrap();
        let bounds = result.geographic_bounds();
        assert_eq!(bounds.min_lat, 50.0);
        assert_eq!(bounds.max_lat, 50.0015);
        assert_eq!(bounds.min_lon, 4.0);
        assert_eq!(bounds.max_lon, 4.0015);
    }
}
