//! Render budget filtering for the live vehicle roster
//!
//! Caps how many vehicles are worth drawing individually at a given zoom
//! level, trading completeness for bounded rendering cost. Truncation keeps
//! the first N in input order; callers needing a priority ordering pre-sort.

use crate::VehicleSnapshot;
use geo::{Point, Rect};

/// Marker cap when fully zoomed out (moving or alerting vehicles only)
const LOW_ZOOM_CAP: usize = 50;
/// Marker cap at medium zoom (online vehicles only)
const MEDIUM_ZOOM_CAP: usize = 100;
/// Marker cap at high zoom (no status filter)
const HIGH_ZOOM_CAP: usize = 200;

#[inline]
fn contains(viewport: &Rect<f64>, position: Point<f64>) -> bool {
    position.x() >= viewport.min().x
        && position.x() <= viewport.max().x
        && position.y() >= viewport.min().y
        && position.y() <= viewport.max().y
}

/// Select the vehicles worth rendering individually at the given zoom
///
/// Rules, applied in order: vehicles without a finite position are dropped;
/// vehicles outside `viewport` (geographic degrees, x = longitude) are
/// dropped when one is given; then a zoom-tiered cap applies —
/// below zoom 10 only moving-or-alerting vehicles (cap 50), below 13 only
/// online vehicles (cap 100), below 15 everything up to 200, and from
/// zoom 15 up the roster passes through uncapped.
pub fn select_for_render(
    vehicles: &[VehicleSnapshot],
    zoom_level: f64,
    viewport: Option<Rect<f64>>,
) -> Vec<VehicleSnapshot> {
    let visible = vehicles.iter().filter(|vehicle| {
        match vehicle.finite_position() {
            Some(position) => viewport
                .as_ref()
                .is_none_or(|bounds| contains(bounds, position)),
            None => false,
        }
    });

    if zoom_level < 10.0 {
        visible
            .filter(|v| v.is_moving || v.has_alerts)
            .take(LOW_ZOOM_CAP)
            .cloned()
            .collect()
    } else if zoom_level < 13.0 {
        visible
            .filter(|v| v.is_online)
            .take(MEDIUM_ZOOM_CAP)
            .cloned()
            .collect()
    } else if zoom_level < 15.0 {
        visible.take(HIGH_ZOOM_CAP).cloned().collect()
    } else {
        visible.cloned().collect()
    }
}

/// Reduce a polyline to at most roughly `max_points` points for rendering
///
/// Keeps the first and last points and every stride-th point in between,
/// with the stride widened as the map zooms out. A polyline already within
/// the budget is returned unchanged.
pub fn decimate_polyline(
    points: &[Point<f64>],
    zoom_level: f64,
    max_points: usize,
) -> Vec<Point<f64>> {
    if points.len() <= max_points.max(2) {
        return points.to_vec();
    }

    let base_stride = (points.len() / max_points.max(1)).max(1);
    let zoom_factor = (crate::utils::REFERENCE_ZOOM - zoom_level).exp2();
    let stride = ((base_stride as f64 * zoom_factor).floor().max(1.0)) as usize;

    let mut decimated = vec![points[0]];
    let mut i = stride;
    while i < points.len() - 1 {
        decimated.push(points[i]);
        i += stride;
    }
    decimated.push(points[points.len() - 1]);

    decimated
}
