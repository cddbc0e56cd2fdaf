use log::{info, warn};
use std::path::Path;
use track_replay::boundaries::{BoundarySource, GeoJsonBoundarySource};
use track_replay::config::ReplayConfig;
use track_replay::imagery::ImageDimensions;
use track_replay::stats::{TrackSummary, format_duration, meters_to_km, mps_to_kmh};
use track_replay::{ingest_directory, project};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => ReplayConfig::from_file(Path::new(&path))?,
        None => ReplayConfig::default(),
    };

    println!("\n--- Reading tracks ---");
    let report = ingest_directory(&config.gpx_directory)?;
    for warning in &report.warnings {
        println!("✗ {}", warning);
    }

    if report.tracks.is_empty() {
        println!("No tracks to process.");
        return Ok(());
    }

    println!("\n--- Projecting ---");
    let result = project(
        &report.tracks,
        config.canvas_width,
        config.canvas_height,
        config.scale,
        config.border,
    )?;
    println!(
        "✓ Projected {} tracks into {:.0} x {:.0} px (scale {:.5} px/m)",
        result.tracks.len(),
        result.content_width,
        result.content_height,
        result.context.scale
    );

    let bounds = result.geographic_bounds();
    let dimensions = ImageDimensions::for_content(&result, config.imagery_multiplier);
    info!(
        "Aerial view request: {},{},{},{} at {}x{}",
        bounds.min_lon,
        bounds.min_lat,
        bounds.max_lon,
        bounds.max_lat,
        dimensions.width,
        dimensions.height
    );

    if let Some(boundary_config) = &config.boundaries {
        let source =
            GeoJsonBoundarySource::new(&boundary_config.path, boundary_config.source_crs.clone());
        match source.load(&bounds) {
            Ok(boundaries) => {
                let projected = result.project_boundaries(&boundaries);
                let vertices: usize = projected.iter().map(|b| b.vertices.len()).sum();
                println!(
                    "✓ Placed {} boundaries ({} vertices) on the canvas",
                    projected.len(),
                    vertices
                );
            }
            Err(e) => warn!("✗ Boundaries unavailable: {}", e),
        }
    }

    println!("\n--- Summary ---");
    let mut total_distance = 0.0;
    for track in &result.tracks {
        let summary = TrackSummary::from_track(track);
        total_distance += summary.total_distance;
        let speed = summary
            .average_speed
            .map_or_else(|| "n/a".to_string(), |s| format!("{:.2} km/h", mps_to_kmh(s)));
        println!(
            "{}: {:.2} km in {}, {}, elevation {:.0}-{:.0} m",
            summary.source,
            meters_to_km(summary.total_distance),
            format_duration(summary.total_time),
            speed,
            summary.min_elevation,
            summary.max_elevation
        );
    }
    println!(
        "Total distance over {} tracks: {:.2} km",
        result.tracks.len(),
        meters_to_km(total_distance)
    );

    Ok(())
}
