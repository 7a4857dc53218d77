//! Fallback primitives for targets without a cursor backend.
//!
//! This exists so the crate (and binary) can compile on targets other than
//! Windows and macOS. Cursor and screen queries report `Unsupported`; the
//! sampler routes those failures to its error channel like any other.

use super::{CursorSource, PlatformError, PreciseTimeSource, ScreenGeometry};
use crate::sampler::types::Point;
use chrono::{DateTime, Utc};

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCursor;

impl NoopCursor {
    pub fn new() -> Self {
        Self
    }
}

impl CursorSource for NoopCursor {
    fn cursor_position(&self) -> Result<Point, PlatformError> {
        Err(PlatformError::Unsupported("cursor position"))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScreen;

impl NoopScreen {
    pub fn new() -> Self {
        Self
    }
}

impl ScreenGeometry for NoopScreen {
    fn primary_screen_height(&self) -> Result<i32, PlatformError> {
        Err(PlatformError::Unsupported("screen geometry"))
    }
}

/// `clock_gettime(CLOCK_REALTIME)` backs `Utc::now()` on these targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPreciseTime;

impl NoopPreciseTime {
    pub fn new() -> Self {
        Self
    }
}

impl PreciseTimeSource for NoopPreciseTime {
    fn precise_utc_now(&self) -> Result<DateTime<Utc>, PlatformError> {
        Ok(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_unsupported() {
        let err = NoopCursor::new().cursor_position().unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_screen_unsupported() {
        assert!(NoopScreen::new().primary_screen_height().is_err());
    }

    #[test]
    fn test_precise_time_available() {
        assert!(NoopPreciseTime::new().precise_utc_now().is_ok());
    }
}
