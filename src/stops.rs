//! Stop detection over a sample sequence

use crate::LocationSample;
use geo::Point;

/// Default minimum duration for a detected stop, in milliseconds
pub const DEFAULT_MIN_STOP_DURATION_MS: i64 = 60_000;

/// Duration above which a stop counts as long (2 hours)
const LONG_STOP_MS: i64 = 2 * 60 * 60 * 1000;

/// Duration above which a stop counts as overnight (8 hours)
const OVERNIGHT_STOP_MS: i64 = 8 * 60 * 60 * 1000;

/// Coarse classification of a stop by its duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopKind {
    /// Under 2 hours
    Short,
    /// 2 to 8 hours
    Long,
    /// Over 8 hours
    Overnight,
}

impl StopKind {
    fn from_duration_ms(duration_ms: i64) -> Self {
        if duration_ms > OVERNIGHT_STOP_MS {
            StopKind::Overnight
        } else if duration_ms > LONG_STOP_MS {
            StopKind::Long
        } else {
            StopKind::Short
        }
    }
}

/// A maintained interval of no motion (or ignition off) within one route
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopInterval {
    /// Position of the sample that opened the stop
    pub position: Point<f64>,
    /// Unix milliseconds of the first stationary sample
    pub start_time_ms: i64,
    /// Unix milliseconds of the last stationary sample
    pub end_time_ms: i64,
    /// Always at least the minimum stop duration used for detection
    pub duration_ms: i64,
    /// Ignition state of the opening sample, if reported
    pub ignition_on: Option<bool>,
    /// Address of the opening sample, if the telemetry source attached one
    pub address: Option<String>,
    pub kind: StopKind,
}

/// Detect stop intervals in a time-ordered sample batch
///
/// A sample is stationary when its speed is exactly zero or its ignition is
/// reported off. A candidate opens at the first stationary sample and extends
/// while samples stay stationary; when movement resumes the candidate closes
/// at the previous (still stationary) sample's timestamp. A candidate still
/// open at the end of the batch closes at the final sample's timestamp.
/// Candidates shorter than `min_stop_duration_ms` are discarded.
///
/// Fewer than two samples produce no stops.
pub fn detect_stops(samples: &[LocationSample], min_stop_duration_ms: i64) -> Vec<StopInterval> {
    if samples.len() < 2 {
        return Vec::new();
    }

    let mut stops = Vec::new();
    // Open candidate: (index of opening sample, timestamp of last stationary sample)
    let mut open: Option<(usize, i64)> = None;

    for (index, sample) in samples.iter().enumerate() {
        if sample.is_stationary() {
            open = match open {
                Some((start_index, _)) => Some((start_index, sample.timestamp_ms)),
                None => Some((index, sample.timestamp_ms)),
            };
        } else if let Some((start_index, end_time_ms)) = open.take() {
            push_if_long_enough(
                samples,
                start_index,
                end_time_ms,
                min_stop_duration_ms,
                &mut stops,
            );
        }
    }

    if let Some((start_index, end_time_ms)) = open {
        push_if_long_enough(
            samples,
            start_index,
            end_time_ms,
            min_stop_duration_ms,
            &mut stops,
        );
    }

    stops
}

fn push_if_long_enough(
    samples: &[LocationSample],
    start_index: usize,
    end_time_ms: i64,
    min_stop_duration_ms: i64,
    stops: &mut Vec<StopInterval>,
) {
    let opening = &samples[start_index];
    let duration_ms = end_time_ms - opening.timestamp_ms;
    if duration_ms < min_stop_duration_ms {
        return;
    }

    stops.push(StopInterval {
        position: opening.position(),
        start_time_ms: opening.timestamp_ms,
        end_time_ms,
        duration_ms,
        ignition_on: opening.ignition_on,
        address: opening.address.clone(),
        kind: StopKind::from_duration_ms(duration_ms),
    });
}
