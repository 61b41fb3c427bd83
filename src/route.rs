//! Route processing pipeline
//!
//! Consumes one vehicle's time-ordered sample batch and produces an immutable
//! [`ProcessedRoute`]: speed-colored segments, detected stops, aggregate
//! statistics, and the display bounding box. Malformed individual samples are
//! skipped and reported, never fatal to the batch.

use crate::stops::detect_stops;
use crate::{
    DEFAULT_MIN_STOP_DURATION_MS, LocationSample, SpeedClass, StopInterval, TelemetryError, utils,
};
use geo::{Point, Rect};
use rayon::prelude::*;

/// Tunables for route processing
///
/// All thresholds are explicit here; nothing in the pipeline reads ambient
/// state such as wall-clock time.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteConfig {
    /// Minimum duration for a detected stop (default 60 000 ms)
    pub min_stop_duration_ms: i64,
    /// Bounding box padding as a fraction of the larger coordinate span
    /// (default 0.10)
    pub bounding_box_padding: f64,
    /// Speed above which a sample is recorded as a violation
    /// (default 90 km/h)
    pub speeding_threshold_kmh: f64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            min_stop_duration_ms: DEFAULT_MIN_STOP_DURATION_MS,
            bounding_box_padding: 0.10,
            speeding_threshold_kmh: 90.0,
        }
    }
}

/// Speed-classified straight-line connection between two consecutive samples
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteSegment {
    pub start: Point<f64>,
    pub end: Point<f64>,
    /// Speed of the leading sample, km/h
    pub speed_kmh: f64,
    pub speed_class: SpeedClass,
    pub line_weight: u8,
    pub opacity: f32,
    pub distance_meters: f64,
    pub duration_ms: i64,
    /// Ignition state of the leading sample, if reported
    pub ignition_on: Option<bool>,
    /// Initial bearing from start to end, degrees in [0, 360)
    pub bearing_degrees: f64,
}

/// A sample exceeding the configured speed limit
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeedViolation {
    pub sample_index: usize,
    pub timestamp_ms: i64,
    pub speed_kmh: f64,
    pub position: Point<f64>,
}

/// A sample or sample pair skipped during processing, with the reason
///
/// The index refers to the leading sample of the affected pair within the
/// input batch. Issues are inspectable by the caller; presentation is the
/// renderer's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleIssue {
    pub sample_index: usize,
    pub error: TelemetryError,
}

/// Share of samples per speed band, as percentages summing to ~100
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeedDistribution {
    percentages: [f64; 6],
}

impl SpeedDistribution {
    fn from_counts(counts: [usize; 6], total: usize) -> Self {
        let mut percentages = [0.0; 6];
        if total > 0 {
            for (pct, count) in percentages.iter_mut().zip(counts) {
                *pct = count as f64 / total as f64 * 100.0;
            }
        }
        Self { percentages }
    }

    /// Percentage of samples falling in the given band
    #[inline]
    pub fn percent(&self, class: SpeedClass) -> f64 {
        self.percentages[class.index()]
    }

    /// Iterate bands with their percentages, in ascending speed order
    pub fn iter(&self) -> impl Iterator<Item = (SpeedClass, f64)> + '_ {
        SpeedClass::ALL
            .iter()
            .map(move |&class| (class, self.percentages[class.index()]))
    }
}

/// Aggregate statistics for one processed route
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteStatistics {
    /// Sum of all segment distances, not the direct start-to-end distance
    pub total_distance_meters: f64,
    /// Sum of all valid segment durations
    pub total_duration_ms: i64,
    /// Arithmetic mean of sample speeds
    pub average_speed_kmh: f64,
    /// Moving distance over moving time; 0 when the vehicle never moved
    pub moving_average_speed_kmh: f64,
    pub max_speed_kmh: f64,
    /// Minimum over samples with speed > 0; 0 when the vehicle never moved
    pub min_speed_kmh: f64,
    pub stop_count: usize,
    pub sample_count: usize,
    pub speed_distribution: SpeedDistribution,
    pub moving_duration_ms: i64,
    pub stopped_duration_ms: i64,
}

/// Immutable result of processing one vehicle's sample batch
#[derive(Debug, Clone)]
pub struct ProcessedRoute {
    pub segments: Vec<RouteSegment>,
    pub stops: Vec<StopInterval>,
    /// `None` only when no sample had finite coordinates
    pub bounding_box: Option<Rect<f64>>,
    pub statistics: RouteStatistics,
    pub speed_violations: Vec<SpeedViolation>,
    /// Samples and pairs skipped during processing, with reasons
    pub issues: Vec<SampleIssue>,
}

/// Process a time-ordered sample batch into a [`ProcessedRoute`]
///
/// Returns `None` for an empty batch; "no route" is distinct from a
/// zero-length route. A single sample yields zero segments, zeroed totals,
/// and a degenerate ~1 km bounding box.
///
/// One linear pass over consecutive sample pairs builds the segments and
/// distance/duration totals. Pairs with non-finite coordinates or
/// out-of-order timestamps are skipped and recorded as [`SampleIssue`]s.
/// Stop detection runs separately over the same samples, keeping the two
/// algorithms independently testable.
pub fn process_route(samples: &[LocationSample], config: &RouteConfig) -> Option<ProcessedRoute> {
    if samples.is_empty() {
        return None;
    }

    let mut segments = Vec::with_capacity(samples.len().saturating_sub(1));
    let mut issues = Vec::new();

    let mut total_distance_meters = 0.0f64;
    let mut total_duration_ms = 0i64;
    let mut moving_distance_meters = 0.0f64;
    let mut moving_duration_ms = 0i64;
    let mut stopped_duration_ms = 0i64;

    for (i, pair) in samples.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);

        let distance_meters = match utils::distance_meters(
            current.latitude,
            current.longitude,
            next.latitude,
            next.longitude,
        ) {
            Ok(d) => d,
            Err(error) => {
                tracing::warn!(sample_index = i, %error, "skipping segment");
                issues.push(SampleIssue {
                    sample_index: i,
                    error,
                });
                continue;
            }
        };

        let duration_ms = next.timestamp_ms - current.timestamp_ms;
        if duration_ms < 0 {
            let error = TelemetryError::OutOfOrderTimestamps {
                previous_ms: current.timestamp_ms,
                current_ms: next.timestamp_ms,
            };
            tracing::warn!(sample_index = i, %error, "skipping segment");
            issues.push(SampleIssue {
                sample_index: i,
                error,
            });
            continue;
        }

        let speed_class = SpeedClass::classify(current.speed_kmh);
        segments.push(RouteSegment {
            start: current.position(),
            end: next.position(),
            speed_kmh: current.speed_kmh,
            speed_class,
            line_weight: speed_class.line_weight(),
            opacity: speed_class.opacity(),
            distance_meters,
            duration_ms,
            ignition_on: current.ignition_on,
            bearing_degrees: utils::initial_bearing(
                current.latitude,
                current.longitude,
                next.latitude,
                next.longitude,
            ),
        });

        total_distance_meters += distance_meters;
        total_duration_ms += duration_ms;
        if current.speed_kmh > 0.0 {
            moving_distance_meters += distance_meters;
            moving_duration_ms += duration_ms;
        } else {
            stopped_duration_ms += duration_ms;
        }
    }

    // Sample-level accumulation: banding, extrema, and violations are over
    // samples rather than segments, so the trailing sample counts too.
    let mut band_counts = [0usize; 6];
    let mut max_speed_kmh = 0.0f64;
    let mut min_moving_speed: Option<f64> = None;
    let mut speed_sum = 0.0f64;
    let mut finite_speed_count = 0usize;
    let mut speed_violations = Vec::new();

    for (i, sample) in samples.iter().enumerate() {
        band_counts[SpeedClass::classify(sample.speed_kmh).index()] += 1;

        if !sample.speed_kmh.is_finite() {
            continue;
        }
        speed_sum += sample.speed_kmh;
        finite_speed_count += 1;
        if sample.speed_kmh > max_speed_kmh {
            max_speed_kmh = sample.speed_kmh;
        }
        if sample.speed_kmh > 0.0 {
            min_moving_speed = Some(match min_moving_speed {
                Some(min) => min.min(sample.speed_kmh),
                None => sample.speed_kmh,
            });
        }
        if sample.speed_kmh > config.speeding_threshold_kmh && sample.has_finite_coordinates() {
            speed_violations.push(SpeedViolation {
                sample_index: i,
                timestamp_ms: sample.timestamp_ms,
                speed_kmh: sample.speed_kmh,
                position: sample.position(),
            });
        }
    }

    let stops = detect_stops(samples, config.min_stop_duration_ms);

    let coordinates: Vec<(f64, f64)> = samples
        .iter()
        .filter(|s| s.has_finite_coordinates())
        .map(|s| (s.latitude, s.longitude))
        .collect();
    let bounding_box = utils::bounding_box(&coordinates, config.bounding_box_padding);

    let average_speed_kmh = if finite_speed_count > 0 {
        speed_sum / finite_speed_count as f64
    } else {
        0.0
    };
    let moving_average_speed_kmh = if moving_duration_ms > 0 {
        (moving_distance_meters / 1000.0) / (moving_duration_ms as f64 / 3_600_000.0)
    } else {
        0.0
    };

    let statistics = RouteStatistics {
        total_distance_meters,
        total_duration_ms,
        average_speed_kmh,
        moving_average_speed_kmh,
        max_speed_kmh,
        min_speed_kmh: min_moving_speed.unwrap_or(0.0),
        stop_count: stops.len(),
        sample_count: samples.len(),
        speed_distribution: SpeedDistribution::from_counts(band_counts, samples.len()),
        moving_duration_ms,
        stopped_duration_ms,
    };

    tracing::debug!(
        segments = segments.len(),
        stops = stops.len(),
        skipped = issues.len(),
        "route processed"
    );

    Some(ProcessedRoute {
        segments,
        stops,
        bounding_box,
        statistics,
        speed_violations,
        issues,
    })
}

/// Process many vehicles' batches in parallel
///
/// Results keep the input order; each batch is processed independently with
/// the same configuration.
pub fn process_routes_parallel(
    batches: &[Vec<LocationSample>],
    config: &RouteConfig,
) -> Vec<Option<ProcessedRoute>> {
    batches
        .par_iter()
        .map(|batch| process_route(batch, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(lat: f64, lon: f64, timestamp_ms: i64, speed_kmh: f64) -> LocationSample {
        LocationSample::new(lat, lon, timestamp_ms, speed_kmh)
    }

    /// A short drive through central London with a parked interval at the end
    fn test_drive() -> Vec<LocationSample> {
        vec![
            sample(51.5074, -0.1278, 0, 0.0),
            sample(51.5080, -0.1290, 60_000, 25.0),
            sample(51.5090, -0.1305, 120_000, 45.0),
            sample(51.5101, -0.1322, 180_000, 30.0),
            sample(51.5102, -0.1323, 240_000, 0.0),
            sample(51.5102, -0.1323, 360_000, 0.0),
        ]
    }

    #[test]
    fn test_empty_input_is_none() {
        assert!(process_route(&[], &RouteConfig::default()).is_none());
    }

    #[test]
    fn test_single_sample_route() {
        let route = process_route(&[sample(51.5, -0.12, 0, 0.0)], &RouteConfig::default())
            .expect("single sample is a route");

        assert!(route.segments.is_empty());
        assert_eq!(route.statistics.total_distance_meters, 0.0);
        assert_eq!(route.statistics.sample_count, 1);

        // Degenerate bounding box is still present, ~1 km half-width
        let bbox = route.bounding_box.expect("bbox present");
        assert!((bbox.width() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_segment_count_and_totals() {
        let route = process_route(&test_drive(), &RouteConfig::default()).unwrap();

        assert_eq!(route.segments.len(), 5);
        assert!(route.statistics.total_distance_meters > 0.0);
        assert_eq!(route.statistics.total_duration_ms, 360_000);

        // Distance total is the sum of segment distances
        let summed: f64 = route.segments.iter().map(|s| s.distance_meters).sum();
        assert!((route.statistics.total_distance_meters - summed).abs() < 1e-9);
    }

    #[test]
    fn test_segments_styled_by_leading_sample() {
        let route = process_route(&test_drive(), &RouteConfig::default()).unwrap();

        assert_eq!(route.segments[0].speed_class, SpeedClass::Stopped);
        assert_eq!(route.segments[0].line_weight, 2);
        assert_eq!(route.segments[1].speed_class, SpeedClass::Slow);
        assert_eq!(route.segments[2].speed_class, SpeedClass::Medium);
    }

    #[test]
    fn test_invalid_pair_skipped_not_fatal() {
        let mut samples = test_drive();
        samples[2].latitude = f64::NAN;

        let route = process_route(&samples, &RouteConfig::default()).unwrap();
        // Both pairs touching the bad sample are skipped
        assert_eq!(route.segments.len(), 3);
        assert_eq!(route.issues.len(), 2);
        assert!(matches!(
            route.issues[0].error,
            TelemetryError::InvalidCoordinate { .. }
        ));
        // The bad coordinate never reaches the bounding box
        assert!(route.bounding_box.is_some());
    }

    #[test]
    fn test_out_of_order_pair_reported_and_skipped() {
        let samples = vec![
            sample(51.50, -0.12, 120_000, 20.0),
            sample(51.51, -0.13, 60_000, 25.0), // clock went backwards
            sample(51.52, -0.14, 180_000, 30.0),
        ];

        let route = process_route(&samples, &RouteConfig::default()).unwrap();
        assert_eq!(route.segments.len(), 1);
        assert_eq!(route.issues.len(), 1);
        assert_eq!(route.issues[0].sample_index, 0);
        assert!(matches!(
            route.issues[0].error,
            TelemetryError::OutOfOrderTimestamps { .. }
        ));
    }

    #[test]
    fn test_speed_distribution_and_extrema() {
        let speeds = [0.0, 5.0, 25.0, 45.0, 80.0];
        let samples: Vec<LocationSample> = speeds
            .iter()
            .enumerate()
            .map(|(i, &v)| sample(51.5 + i as f64 * 0.001, -0.12, i as i64 * 60_000, v))
            .collect();

        let route = process_route(&samples, &RouteConfig::default()).unwrap();
        let stats = &route.statistics;

        assert_eq!(stats.max_speed_kmh, 80.0);
        // Zero speeds are excluded from the minimum
        assert_eq!(stats.min_speed_kmh, 5.0);

        let total: f64 = stats.speed_distribution.iter().map(|(_, pct)| pct).sum();
        assert!((total - 100.0).abs() < 0.01);
        assert_eq!(stats.speed_distribution.percent(SpeedClass::Stopped), 20.0);
        assert_eq!(stats.speed_distribution.percent(SpeedClass::VeryFast), 20.0);
    }

    #[test]
    fn test_min_speed_zero_when_never_moving() {
        let samples = vec![
            sample(51.5, -0.12, 0, 0.0),
            sample(51.5, -0.12, 60_000, 0.0),
        ];
        let route = process_route(&samples, &RouteConfig::default()).unwrap();
        assert_eq!(route.statistics.min_speed_kmh, 0.0);
    }

    #[test]
    fn test_moving_and_stopped_durations_partition_total() {
        let route = process_route(&test_drive(), &RouteConfig::default()).unwrap();
        let stats = &route.statistics;
        assert_eq!(
            stats.moving_duration_ms + stats.stopped_duration_ms,
            stats.total_duration_ms
        );
        assert_eq!(stats.stopped_duration_ms, 180_000);
    }

    #[test]
    fn test_stops_detected_within_route() {
        let route = process_route(&test_drive(), &RouteConfig::default()).unwrap();
        assert_eq!(route.stops.len(), 1);
        assert_eq!(route.statistics.stop_count, 1);
        assert_eq!(route.stops[0].duration_ms, 120_000);
    }

    #[test]
    fn test_speed_violations_recorded() {
        let mut samples = test_drive();
        samples[2].speed_kmh = 110.0;

        let route = process_route(&samples, &RouteConfig::default()).unwrap();
        assert_eq!(route.speed_violations.len(), 1);
        assert_eq!(route.speed_violations[0].sample_index, 2);
        assert_eq!(route.speed_violations[0].speed_kmh, 110.0);
    }

    #[test]
    fn test_moving_average_uses_moving_time_only() {
        // 1 km covered in one moving minute, then parked for an hour
        let samples = vec![
            sample(51.5000, -0.1278, 0, 60.0),
            sample(51.5090, -0.1278, 60_000, 0.0),
            sample(51.5090, -0.1278, 3_660_000, 0.0),
        ];
        let route = process_route(&samples, &RouteConfig::default()).unwrap();
        let stats = &route.statistics;
        // ~1 km in 60 s is ~60 km/h regardless of the hour parked
        assert!(stats.moving_average_speed_kmh > 55.0);
        assert!(stats.moving_average_speed_kmh < 65.0);
        assert!(stats.average_speed_kmh < stats.moving_average_speed_kmh);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let batches = vec![test_drive(), Vec::new(), test_drive()[..2].to_vec()];
        let config = RouteConfig::default();

        let parallel = process_routes_parallel(&batches, &config);
        assert_eq!(parallel.len(), 3);
        assert!(parallel[1].is_none());

        for (batch, result) in batches.iter().zip(&parallel) {
            let sequential = process_route(batch, &config);
            assert_eq!(
                sequential.as_ref().map(|r| r.segments.len()),
                result.as_ref().map(|r| r.segments.len())
            );
            assert_eq!(
                sequential.as_ref().map(|r| r.statistics.clone()),
                result.as_ref().map(|r| r.statistics.clone())
            );
        }
    }
}
