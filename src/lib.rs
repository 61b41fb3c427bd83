//! Fleet Track Library - Analytical Core for Live Fleet-Tracking Maps
//!
//! This library turns raw vehicle telemetry into the structures a live
//! fleet-tracking map renders: speed-classified route segments, detected
//! stops, aggregate trip statistics, route bounding boxes, and a
//! zoom-adaptive clustering of many vehicles into renderable groups.
//!
//! # Architecture
//!
//! - **[`LocationSample`]**: Immutable GPS fix supplied by the caller
//! - **[`process_route`]**: One-pass pipeline producing a [`ProcessedRoute`]
//! - **[`detect_stops`]**: Stationary-interval detection over a sample batch
//! - **[`cluster_vehicles`]**: Greedy zoom-scaled clustering of the live roster
//! - **[`select_for_render`]**: Zoom-tiered render budget over the roster
//! - **[`ExpiringCache`]**: TTL cache keyed by an input fingerprint
//!
//! # Execution model
//!
//! Every function is a pure, synchronous computation over an in-memory batch;
//! nothing here performs I/O or holds shared mutable state. Each call
//! allocates fresh outputs, so concurrent recomputations for different inputs
//! are safe by construction. The only stateful component is [`ExpiringCache`],
//! which takes `&mut self` and expects multi-threaded users to wrap it in a
//! single `Mutex`.

mod budget;
mod cache;
mod cluster;
mod route;
mod sample;
mod speed;
mod stops;
pub mod utils;

// Public API exports
pub use budget::{decimate_polyline, select_for_render};
pub use cache::{ExpiringCache, fingerprint_samples};
pub use cluster::{Cluster, ClusterConfig, RenderItem, VehicleSnapshot, cluster_vehicles};
pub use route::{
    ProcessedRoute, RouteConfig, RouteSegment, RouteStatistics, SampleIssue, SpeedDistribution,
    SpeedViolation, process_route, process_routes_parallel,
};
pub use sample::{LocationSample, smooth_positions};
pub use speed::SpeedClass;
pub use stops::{DEFAULT_MIN_STOP_DURATION_MS, StopInterval, StopKind, detect_stops};

/// Error types for telemetry processing
///
/// Malformed individual records are never fatal: the route pipeline records
/// these per-sample as [`SampleIssue`]s and keeps going. Only invalid call
/// shapes (a non-positive clustering radius, a non-finite zoom) surface as an
/// `Err` from the public API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TelemetryError {
    #[error("non-finite coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("timestamps out of order: {previous_ms} ms followed by {current_ms} ms")]
    OutOfOrderTimestamps { previous_ms: i64, current_ms: i64 },

    #[error("radius must be finite and positive, got {0}")]
    InvalidRadius(f64),

    #[error("zoom level must be finite, got {0}")]
    InvalidZoom(f64),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
