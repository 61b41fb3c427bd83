//! Geographic math shared by the route and clustering pipelines

use crate::{Result, TelemetryError};
use geo::{Coord, Rect};

/// Mean Earth radius in meters, as used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Zoom level at which [`scaled_radius`] returns the base radius unchanged
pub const REFERENCE_ZOOM: f64 = 15.0;

/// Clamp range for zoom-scaled clustering radii, in meters.
/// Prevents runaway cluster sizes at extreme zoom values.
pub const MIN_SCALED_RADIUS_METERS: f64 = 10.0;
pub const MAX_SCALED_RADIUS_METERS: f64 = 50_000.0;

/// Half-width of the degenerate bounding box around a single point,
/// in degrees (roughly 1 km). Keeps a one-fix route visible on a map.
const SINGLE_POINT_HALF_WIDTH_DEG: f64 = 0.01;

/// Minimum absolute padding for multi-point bounding boxes, in degrees.
/// Avoids a zero-size box for nearly-collinear point sets.
const MIN_PADDING_DEG: f64 = 0.001;

/// Reject non-finite coordinates
#[inline]
pub(crate) fn require_finite(latitude: f64, longitude: f64) -> Result<()> {
    if latitude.is_finite() && longitude.is_finite() {
        Ok(())
    } else {
        Err(TelemetryError::InvalidCoordinate {
            latitude,
            longitude,
        })
    }
}

/// Great-circle distance between two WGS84 coordinates in meters
///
/// Uses the haversine formula. Non-finite coordinates are rejected with
/// [`TelemetryError::InvalidCoordinate`].
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
    require_finite(lat1, lon1)?;
    require_finite(lat2, lon2)?;
    Ok(haversine_meters(lat1, lon1, lat2, lon2))
}

/// Haversine distance for coordinates already known to be finite
#[inline]
pub(crate) fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Initial bearing from the first coordinate to the second, in degrees
///
/// Normalized to `[0, 360)`. Non-finite coordinates are rejected with
/// [`TelemetryError::InvalidCoordinate`].
pub fn bearing_degrees(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
    require_finite(lat1, lon1)?;
    require_finite(lat2, lon2)?;
    Ok(initial_bearing(lat1, lon1, lat2, lon2))
}

/// Bearing for coordinates already known to be finite
#[inline]
pub(crate) fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let delta_lon = (lon2 - lon1).to_radians();
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();

    let y = delta_lon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Bounding box over `(latitude, longitude)` points, padded for display
///
/// Returns `None` for an empty input (or one with no finite points). A single
/// point produces a fixed ~1 km half-width box so a degenerate route stays
/// visible. Two or more points produce the tight box expanded by
/// `padding_fraction` of the larger coordinate span, with a 0.001° floor.
///
/// The returned rect uses geographic axes: x = longitude, y = latitude.
pub fn bounding_box(points: &[(f64, f64)], padding_fraction: f64) -> Option<Rect<f64>> {
    let mut min_lat = f64::INFINITY;
    let mut min_lon = f64::INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    let mut max_lon = f64::NEG_INFINITY;
    let mut finite_count = 0usize;

    for &(lat, lon) in points {
        if !(lat.is_finite() && lon.is_finite()) {
            continue;
        }
        min_lat = min_lat.min(lat);
        max_lat = max_lat.max(lat);
        min_lon = min_lon.min(lon);
        max_lon = max_lon.max(lon);
        finite_count += 1;
    }

    match finite_count {
        0 => None,
        1 => Some(Rect::new(
            Coord {
                x: min_lon - SINGLE_POINT_HALF_WIDTH_DEG,
                y: min_lat - SINGLE_POINT_HALF_WIDTH_DEG,
            },
            Coord {
                x: max_lon + SINGLE_POINT_HALF_WIDTH_DEG,
                y: max_lat + SINGLE_POINT_HALF_WIDTH_DEG,
            },
        )),
        _ => {
            let span = (max_lat - min_lat).max(max_lon - min_lon);
            let padding = (span * padding_fraction).max(MIN_PADDING_DEG);
            Some(Rect::new(
                Coord {
                    x: min_lon - padding,
                    y: min_lat - padding,
                },
                Coord {
                    x: max_lon + padding,
                    y: max_lat + padding,
                },
            ))
        }
    }
}

/// Scale a base radius for the given map zoom level
///
/// Doubles per zoom level below [`REFERENCE_ZOOM`] and halves above it,
/// clamped to `[10 m, 50 000 m]`. A non-positive or non-finite base radius
/// and a non-finite zoom are programmer errors surfaced immediately.
pub fn scaled_radius(base_radius_meters: f64, zoom_level: f64) -> Result<f64> {
    if !(base_radius_meters.is_finite() && base_radius_meters > 0.0) {
        return Err(TelemetryError::InvalidRadius(base_radius_meters));
    }
    if !zoom_level.is_finite() {
        return Err(TelemetryError::InvalidZoom(zoom_level));
    }

    let scaled = base_radius_meters * (REFERENCE_ZOOM - zoom_level).exp2();
    Ok(scaled.clamp(MIN_SCALED_RADIUS_METERS, MAX_SCALED_RADIUS_METERS))
}

/// Format a millisecond duration as a compact human-readable string
///
/// Examples: `2d 3h 10m`, `1h 5m`, `4m 30s`, `45s`. Negative durations are
/// treated as zero.
pub fn format_duration_ms(duration_ms: i64) -> String {
    let seconds = duration_ms.max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h {}m", days, hours % 24, minutes % 60)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
