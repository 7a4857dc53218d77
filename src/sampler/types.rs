//! Value types published by the sampler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cursor position in screen pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift the point by an offset on each axis, saturating at the i32 range.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// One published reading: a jittered point and the time it was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedSample {
    pub point: Point,
    pub timestamp: DateTime<Utc>,
}

impl TimestampedSample {
    pub fn new(point: Point, timestamp: DateTime<Utc>) -> Self {
        Self { point, timestamp }
    }
}

/// Bound of the jitter applied to each axis.
///
/// Derived once from the primary screen height so the obscuring effect
/// scales with display size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoiseMagnitude(u32);

impl NoiseMagnitude {
    /// Fraction of the screen height used when none is configured.
    pub const DEFAULT_FRACTION: f64 = 0.1;

    /// Values above `i32::MAX` are clamped so offsets stay representable.
    pub fn new(pixels: u32) -> Self {
        Self(pixels.min(i32::MAX as u32))
    }

    /// `round(fraction * height)`, with negative or non-finite inputs giving 0.
    pub fn from_screen_height(height: i32, fraction: f64) -> Self {
        let scaled = (height as f64 * fraction).round();
        if scaled.is_finite() && scaled > 0.0 {
            Self(scaled.min(i32::MAX as f64) as u32)
        } else {
            Self(0)
        }
    }

    pub fn pixels(self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}
