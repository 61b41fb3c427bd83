//! Greedy zoom-adaptive clustering of the live vehicle roster

use crate::{Result, utils};
use geo::Point;

/// Tunables for vehicle clustering
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterConfig {
    /// Clustering radius at the reference zoom level (default 100 m)
    pub base_radius_meters: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            base_radius_meters: 100.0,
        }
    }
}

/// Read-only view of one vehicle's live state, as supplied by the roster
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleSnapshot {
    pub id: String,
    /// Last known position, `None` for vehicles that have never reported one
    pub position: Option<Point<f64>>,
    pub is_online: bool,
    pub is_moving: bool,
    pub has_alerts: bool,
}

impl VehicleSnapshot {
    /// An online, idle, alert-free vehicle at the given coordinates
    pub fn located(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            position: Some(Point::new(longitude, latitude)),
            is_online: true,
            is_moving: false,
            has_alerts: false,
        }
    }

    /// Position, filtered to finite coordinates
    #[inline]
    pub(crate) fn finite_position(&self) -> Option<Point<f64>> {
        self.position
            .filter(|p| p.x().is_finite() && p.y().is_finite())
    }
}

/// Two or more vehicles merged for display
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster {
    /// Arithmetic mean of member positions
    pub centroid: Point<f64>,
    /// Member vehicle ids in discovery order (seed first)
    pub member_ids: Vec<String>,
    pub has_moving: bool,
    pub has_alerts: bool,
    pub has_offline: bool,
}

impl Cluster {
    /// Number of member vehicles, always at least 2
    #[inline]
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}

/// One renderable map entry: either a cluster bubble or an individual marker
///
/// The tagged split makes the single-vs-cluster distinction exhaustive at the
/// type level; a group of exactly one vehicle is always a `Single`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderItem {
    Cluster(Cluster),
    Single(VehicleSnapshot),
}

/// Partition vehicles into clusters and singles at the given zoom level
///
/// Greedy single pass in input order: each not-yet-processed vehicle seeds a
/// group and absorbs every later unprocessed vehicle within the zoom-scaled
/// radius of the seed. Vehicles without a (finite) position are dropped.
///
/// The absorption is transitive through the seed, so two vehicles slightly
/// farther apart than the radius can still merge via a third between them.
/// This is a display declutter, not an optimal spatial partition, and the
/// output depends on input order; it is deterministic for a stable roster
/// ordering. O(n²) over the roster, which [`select_for_render`] is expected
/// to cap beforehand.
///
/// [`select_for_render`]: crate::select_for_render
pub fn cluster_vehicles(
    vehicles: &[VehicleSnapshot],
    zoom_level: f64,
    config: &ClusterConfig,
) -> Result<Vec<RenderItem>> {
    let radius_meters = utils::scaled_radius(config.base_radius_meters, zoom_level)?;

    let mut processed = vec![false; vehicles.len()];
    let mut items = Vec::new();

    for i in 0..vehicles.len() {
        if processed[i] {
            continue;
        }
        processed[i] = true;

        let Some(seed) = vehicles[i].finite_position() else {
            continue;
        };

        let mut member_indices = vec![i];
        for j in (i + 1)..vehicles.len() {
            if processed[j] {
                continue;
            }
            let Some(candidate) = vehicles[j].finite_position() else {
                continue;
            };
            let distance =
                utils::haversine_meters(seed.y(), seed.x(), candidate.y(), candidate.x());
            if distance <= radius_meters {
                processed[j] = true;
                member_indices.push(j);
            }
        }

        if member_indices.len() >= 2 {
            let count = member_indices.len() as f64;
            let mut sum_lat = 0.0;
            let mut sum_lon = 0.0;
            let mut cluster = Cluster {
                centroid: Point::new(0.0, 0.0),
                member_ids: Vec::with_capacity(member_indices.len()),
                has_moving: false,
                has_alerts: false,
                has_offline: false,
            };
            for &index in &member_indices {
                let vehicle = &vehicles[index];
                // Members were admitted via finite_position, so this holds
                let position = vehicle.finite_position().unwrap_or(seed);
                sum_lat += position.y();
                sum_lon += position.x();
                cluster.member_ids.push(vehicle.id.clone());
                cluster.has_moving |= vehicle.is_moving;
                cluster.has_alerts |= vehicle.has_alerts;
                cluster.has_offline |= !vehicle.is_online;
            }
            cluster.centroid = Point::new(sum_lon / count, sum_lat / count);
            items.push(RenderItem::Cluster(cluster));
        } else {
            items.push(RenderItem::Single(vehicles[i].clone()));
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(positions: &[(f64, f64)]) -> Vec<VehicleSnapshot> {
        positions
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon))| VehicleSnapshot::located(format!("v{i}"), lat, lon))
            .collect()
    }

    #[test]
    fn test_empty_roster() {
        let items = cluster_vehicles(&[], 12.0, &ClusterConfig::default()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_distant_vehicles_stay_single() {
        // Spread far beyond any clamped radius
        let vehicles = roster(&[(51.5, -0.1), (48.85, 2.35), (40.41, -3.70)]);
        let items = cluster_vehicles(&vehicles, 12.0, &ClusterConfig::default()).unwrap();

        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| matches!(i, RenderItem::Single(_))));
    }

    #[test]
    fn test_nearby_vehicles_merge() {
        // ~100 m apart; radius at zoom 12 is 800 m
        let vehicles = roster(&[(51.5000, -0.1000), (51.5009, -0.1000), (51.5018, -0.1000)]);
        let items = cluster_vehicles(&vehicles, 12.0, &ClusterConfig::default()).unwrap();

        assert_eq!(items.len(), 1);
        let RenderItem::Cluster(cluster) = &items[0] else {
            panic!("expected a cluster");
        };
        assert_eq!(cluster.len(), 3);
        assert_eq!(cluster.member_ids, vec!["v0", "v1", "v2"]);

        // Centroid is the arithmetic mean of member coordinates
        assert!((cluster.centroid.y() - 51.5009).abs() < 1e-9);
        assert!((cluster.centroid.x() - -0.1000).abs() < 1e-9);
    }

    #[test]
    fn test_partition_invariant() {
        let vehicles = roster(&[
            (51.5000, -0.1000),
            (51.5005, -0.1005),
            (51.6000, -0.2000),
            (51.6002, -0.2002),
            (52.0000, -0.5000),
        ]);
        let items = cluster_vehicles(&vehicles, 13.0, &ClusterConfig::default()).unwrap();

        let mut seen: Vec<String> = Vec::new();
        for item in &items {
            match item {
                RenderItem::Cluster(c) => seen.extend(c.member_ids.iter().cloned()),
                RenderItem::Single(v) => seen.push(v.id.clone()),
            }
        }
        seen.sort();
        let mut expected: Vec<String> = vehicles.iter().map(|v| v.id.clone()).collect();
        expected.sort();
        // Every vehicle appears in exactly one output entry
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_status_flags_or_over_members() {
        let mut vehicles = roster(&[(51.5000, -0.1000), (51.5003, -0.1000)]);
        vehicles[0].is_moving = true;
        vehicles[1].is_online = false;

        let items = cluster_vehicles(&vehicles, 12.0, &ClusterConfig::default()).unwrap();
        let RenderItem::Cluster(cluster) = &items[0] else {
            panic!("expected a cluster");
        };
        assert!(cluster.has_moving);
        assert!(cluster.has_offline);
        assert!(!cluster.has_alerts);
    }

    #[test]
    fn test_positionless_vehicles_dropped() {
        let mut vehicles = roster(&[(51.5, -0.1)]);
        vehicles.push(VehicleSnapshot {
            id: "ghost".to_string(),
            position: None,
            is_online: true,
            is_moving: false,
            has_alerts: false,
        });

        let items = cluster_vehicles(&vehicles, 12.0, &ClusterConfig::default()).unwrap();
        assert_eq!(items.len(), 1);
        let RenderItem::Single(v) = &items[0] else {
            panic!("expected a single");
        };
        assert_eq!(v.id, "v0");
    }

    #[test]
    fn test_zoom_widens_radius() {
        // ~700 m apart: separate markers at zoom 15, one cluster at zoom 11
        let vehicles = roster(&[(51.5000, -0.1000), (51.5063, -0.1000)]);
        let config = ClusterConfig::default();

        let zoomed_in = cluster_vehicles(&vehicles, 15.0, &config).unwrap();
        assert_eq!(zoomed_in.len(), 2);

        let zoomed_out = cluster_vehicles(&vehicles, 11.0, &config).unwrap();
        assert_eq!(zoomed_out.len(), 1);
    }

    #[test]
    fn test_invalid_radius_rejected() {
        let vehicles = roster(&[(51.5, -0.1)]);
        let config = ClusterConfig {
            base_radius_meters: -1.0,
        };
        assert!(cluster_vehicles(&vehicles, 12.0, &config).is_err());
    }
}
