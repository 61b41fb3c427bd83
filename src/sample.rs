//! Location sample input type and batch-level helpers

use geo::Point;

/// One GPS fix for a single vehicle
///
/// Samples are owned by the caller's batch and never mutated by this crate.
/// Timestamps are expected to be monotonically non-decreasing within one
/// route; out-of-order pairs are skipped and reported during processing
/// rather than rejected up front.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationSample {
    /// Latitude in degrees (WGS84)
    pub latitude: f64,
    /// Longitude in degrees (WGS84)
    pub longitude: f64,
    /// Fix time as Unix milliseconds
    pub timestamp_ms: i64,
    /// Instantaneous speed in km/h, never negative in well-formed input
    pub speed_kmh: f64,
    /// Heading in degrees, if the device reports one
    pub heading_degrees: Option<f64>,
    /// Altitude in meters, if the device reports one
    pub altitude_meters: Option<f64>,
    /// Ignition state, if the device reports one
    pub ignition_on: Option<bool>,
    /// Reverse-geocoded address, if the telemetry source attaches one
    pub address: Option<String>,
}

impl LocationSample {
    /// Create a sample with the required fields; optional telemetry is `None`
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64, speed_kmh: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
            speed_kmh,
            heading_degrees: None,
            altitude_meters: None,
            ignition_on: None,
            address: None,
        }
    }

    /// Position as a geographic point (x = longitude, y = latitude)
    #[inline]
    pub fn position(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    #[inline]
    pub(crate) fn has_finite_coordinates(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// A sample counts as stationary when it reports zero speed or the
    /// ignition is known to be off.
    #[inline]
    pub(crate) fn is_stationary(&self) -> bool {
        self.speed_kmh == 0.0 || self.ignition_on == Some(false)
    }
}

/// Moving-average smoothing of sample positions to reduce GPS jitter
///
/// Each interior sample's coordinates are replaced by the mean over a
/// `window`-sized neighborhood of finite coordinates; the leading and
/// trailing half-windows keep their original positions so the route
/// endpoints never move. All other sample fields are preserved.
pub fn smooth_positions(samples: &[LocationSample], window: usize) -> Vec<LocationSample> {
    if window < 2 || samples.len() <= window {
        return samples.to_vec();
    }

    let half = window / 2;
    let mut smoothed = Vec::with_capacity(samples.len());

    for (i, sample) in samples.iter().enumerate() {
        if i < half || i >= samples.len() - half {
            smoothed.push(sample.clone());
            continue;
        }

        let mut sum_lat = 0.0;
        let mut sum_lon = 0.0;
        let mut count = 0usize;
        for neighbor in &samples[i - half..=i + half] {
            if neighbor.has_finite_coordinates() {
                sum_lat += neighbor.latitude;
                sum_lon += neighbor.longitude;
                count += 1;
            }
        }

        if count > 0 {
            let mut adjusted = sample.clone();
            adjusted.latitude = sum_lat / count as f64;
            adjusted.longitude = sum_lon / count as f64;
            smoothed.push(adjusted);
        } else {
            smoothed.push(sample.clone());
        }
    }

    smoothed
}
