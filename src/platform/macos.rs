//! macOS implementation of the OS primitives using Core Graphics.
//!
//! The cursor location is taken from a fresh `CGEvent`, which reports the
//! global pointer position without requiring Input Monitoring permission.

use super::{CursorSource, PlatformError, PreciseTimeSource, ScreenGeometry};
use crate::sampler::types::Point;
use chrono::{DateTime, Utc};
use core_graphics::display::CGDisplay;
use core_graphics::event::CGEvent;
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

/// Cursor position via `CGEventCreate` + `CGEventGetLocation`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacOSCursor;

impl MacOSCursor {
    pub fn new() -> Self {
        Self
    }
}

impl CursorSource for MacOSCursor {
    fn cursor_position(&self) -> Result<Point, PlatformError> {
        let source = CGEventSource::new(CGEventSourceStateID::CombinedSessionState)
            .map_err(|_| PlatformError::call("CGEventSourceCreate", "no event source"))?;
        let event = CGEvent::new(source)
            .map_err(|_| PlatformError::call("CGEventCreate", "no event"))?;

        // Core Graphics reports points as doubles
        let location = event.location();
        Ok(Point::new(
            location.x.round() as i32,
            location.y.round() as i32,
        ))
    }
}

/// Main display height in pixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacOSScreen;

impl MacOSScreen {
    pub fn new() -> Self {
        Self
    }
}

impl ScreenGeometry for MacOSScreen {
    fn primary_screen_height(&self) -> Result<i32, PlatformError> {
        let height = CGDisplay::main().pixels_high();
        i32::try_from(height)
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| PlatformError::call("CGDisplayPixelsHigh", format!("height {height}")))
    }
}

/// The system realtime clock already has sub-microsecond resolution here.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacOSPreciseTime;

impl MacOSPreciseTime {
    pub fn new() -> Self {
        Self
    }
}

impl PreciseTimeSource for MacOSPreciseTime {
    fn precise_utc_now(&self) -> Result<DateTime<Utc>, PlatformError> {
        Ok(Utc::now())
    }
}
