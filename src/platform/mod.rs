//! Operating-system primitives used by the sampler.
//!
//! This module provides platform-specific implementations for reading the
//! cursor position, the primary display height, and a precise UTC clock.
//! Targets without a backend compile against the noop implementation.

use crate::sampler::types::Point;
use chrono::{DateTime, Utc};

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub mod noop;

/// Reads the current on-screen cursor position.
///
/// Implementations must be cheap and non-blocking; the sampler calls this
/// once per iteration while holding its dispatch lock.
pub trait CursorSource: Send + Sync {
    fn cursor_position(&self) -> Result<Point, PlatformError>;
}

/// Reports the primary display height in pixels.
pub trait ScreenGeometry {
    fn primary_screen_height(&self) -> Result<i32, PlatformError>;
}

/// The highest-resolution UTC clock the host offers.
///
/// Returns [`PlatformError::Unsupported`] when the primitive does not exist
/// on the running OS, so callers can fall back instead of failing.
pub trait PreciseTimeSource: Send + Sync {
    fn precise_utc_now(&self) -> Result<DateTime<Utc>, PlatformError>;
}

/// Errors returned by OS primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The primitive does not exist on this OS or target.
    Unsupported(&'static str),
    /// The primitive exists but the call failed.
    Call { call: &'static str, message: String },
}

impl PlatformError {
    pub fn call(call: &'static str, message: impl std::fmt::Display) -> Self {
        PlatformError::Call {
            call,
            message: message.to_string(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, PlatformError::Unsupported(_))
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::Unsupported(what) => {
                write!(f, "{what} is not supported on this platform")
            }
            PlatformError::Call { call, message } => write!(f, "{call} failed: {message}"),
        }
    }
}

impl std::error::Error for PlatformError {}

#[cfg(target_os = "windows")]
pub use self::windows::{WindowsCursor, WindowsPreciseTime, WindowsScreen};

/// Platform-agnostic backend type aliases
#[cfg(target_os = "windows")]
pub type PlatformCursor = WindowsCursor;
#[cfg(target_os = "windows")]
pub type PlatformScreen = WindowsScreen;
#[cfg(target_os = "windows")]
pub type PlatformPreciseTime = WindowsPreciseTime;

#[cfg(target_os = "macos")]
pub use self::macos::{MacOSCursor, MacOSPreciseTime, MacOSScreen};

/// Platform-agnostic backend type aliases
#[cfg(target_os = "macos")]
pub type PlatformCursor = MacOSCursor;
#[cfg(target_os = "macos")]
pub type PlatformScreen = MacOSScreen;
#[cfg(target_os = "macos")]
pub type PlatformPreciseTime = MacOSPreciseTime;

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub use self::noop::{NoopCursor, NoopPreciseTime, NoopScreen};

/// Platform-agnostic backend type aliases
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub type PlatformCursor = NoopCursor;
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub type PlatformScreen = NoopScreen;
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub type PlatformPreciseTime = NoopPreciseTime;
