//! Speed banding for segment styling and statistics
//!
//! The six bands double as the statistics keys for the per-route speed
//! distribution. Segments are never merged across bands: every consecutive
//! sample pair stays its own segment to preserve raw fidelity.

/// Speed band of a sample or segment, in km/h
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedClass {
    /// Exactly 0 km/h
    Stopped,
    /// (0, 10) km/h
    VerySlow,
    /// [10, 30) km/h
    Slow,
    /// [30, 50) km/h
    Medium,
    /// [50, 70) km/h
    Fast,
    /// 70 km/h and above
    VeryFast,
}

impl SpeedClass {
    /// All bands in ascending speed order
    pub const ALL: [SpeedClass; 6] = [
        SpeedClass::Stopped,
        SpeedClass::VerySlow,
        SpeedClass::Slow,
        SpeedClass::Medium,
        SpeedClass::Fast,
        SpeedClass::VeryFast,
    ];

    /// Classify an instantaneous speed in km/h
    ///
    /// Non-finite speeds band with `Stopped` rather than leaking into the
    /// open-ended top band.
    pub fn classify(speed_kmh: f64) -> Self {
        if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
            SpeedClass::Stopped
        } else if speed_kmh < 10.0 {
            SpeedClass::VerySlow
        } else if speed_kmh < 30.0 {
            SpeedClass::Slow
        } else if speed_kmh < 50.0 {
            SpeedClass::Medium
        } else if speed_kmh < 70.0 {
            SpeedClass::Fast
        } else {
            SpeedClass::VeryFast
        }
    }

    /// Hex color token used when drawing segments of this band
    pub fn color(&self) -> &'static str {
        match self {
            SpeedClass::Stopped => "#6B7280",
            SpeedClass::VerySlow => "#10B981",
            SpeedClass::Slow => "#3B82F6",
            SpeedClass::Medium => "#F59E0B",
            SpeedClass::Fast => "#8B5CF6",
            SpeedClass::VeryFast => "#EF4444",
        }
    }

    /// Polyline weight in pixels, increasing with speed
    pub fn line_weight(&self) -> u8 {
        match self {
            SpeedClass::Stopped => 2,
            SpeedClass::VerySlow => 3,
            SpeedClass::Slow => 4,
            SpeedClass::Medium => 5,
            SpeedClass::Fast => 6,
            SpeedClass::VeryFast => 7,
        }
    }

    /// Polyline opacity
    pub fn opacity(&self) -> f32 {
        match self {
            SpeedClass::Stopped => 0.4,
            SpeedClass::VerySlow => 0.6,
            _ => 0.8,
        }
    }

    /// Human-readable band label
    pub fn label(&self) -> &'static str {
        match self {
            SpeedClass::Stopped => "Stopped",
            SpeedClass::VerySlow => "Very slow (0-10 km/h)",
            SpeedClass::Slow => "Slow (10-30 km/h)",
            SpeedClass::Medium => "Medium (30-50 km/h)",
            SpeedClass::Fast => "Fast (50-70 km/h)",
            SpeedClass::VeryFast => "Very fast (70+ km/h)",
        }
    }

    /// Position of this band within [`SpeedClass::ALL`]
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            SpeedClass::Stopped => 0,
            SpeedClass::VerySlow => 1,
            SpeedClass::Slow => 2,
            SpeedClass::Medium => 3,
            SpeedClass::Fast => 4,
            SpeedClass::VeryFast => 5,
        }
    }
}
