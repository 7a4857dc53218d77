//! Windows implementation of the OS primitives.
//!
//! The cursor is read with `GetCursorPos` and the display height with
//! `GetSystemMetrics`. `GetSystemTimePreciseAsFileTime` only exists on
//! Windows 8 and later, so it is resolved once through `GetProcAddress`
//! instead of being linked directly.

use super::{CursorSource, PlatformError, PreciseTimeSource, ScreenGeometry};
use crate::sampler::types::Point;
use ::windows::core::{s, w};
use ::windows::Win32::Foundation::{FILETIME, POINT};
use ::windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use ::windows::Win32::UI::WindowsAndMessaging::{GetCursorPos, GetSystemMetrics, SM_CYSCREEN};
use chrono::{DateTime, Utc};

/// 100ns ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_FILETIME_TICKS: i64 = 116_444_736_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

type PreciseTimeFn = unsafe extern "system" fn(*mut FILETIME);

/// Cursor position via `GetCursorPos`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsCursor;

impl WindowsCursor {
    pub fn new() -> Self {
        Self
    }
}

impl CursorSource for WindowsCursor {
    fn cursor_position(&self) -> Result<Point, PlatformError> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }
            .map_err(|e| PlatformError::call("GetCursorPos", e))?;
        Ok(Point::new(point.x, point.y))
    }
}

/// Primary display height via `GetSystemMetrics(SM_CYSCREEN)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsScreen;

impl WindowsScreen {
    pub fn new() -> Self {
        Self
    }
}

impl ScreenGeometry for WindowsScreen {
    fn primary_screen_height(&self) -> Result<i32, PlatformError> {
        // GetSystemMetrics reports failure as 0
        match unsafe { GetSystemMetrics(SM_CYSCREEN) } {
            0 => Err(PlatformError::call(
                "GetSystemMetrics",
                "SM_CYSCREEN returned 0",
            )),
            height => Ok(height),
        }
    }
}

/// `GetSystemTimePreciseAsFileTime`, when the running kernel exports it.
#[derive(Debug, Clone, Copy)]
pub struct WindowsPreciseTime {
    entry: Option<PreciseTimeFn>,
}

impl WindowsPreciseTime {
    /// Look up the precise time entry point in kernel32.
    pub fn new() -> Self {
        let entry = unsafe {
            GetModuleHandleW(w!("kernel32.dll"))
                .ok()
                .and_then(|module| GetProcAddress(module, s!("GetSystemTimePreciseAsFileTime")))
                .map(|address| {
                    std::mem::transmute::<unsafe extern "system" fn() -> isize, PreciseTimeFn>(
                        address,
                    )
                })
        };

        if entry.is_none() {
            tracing::debug!("GetSystemTimePreciseAsFileTime not exported by kernel32");
        }

        Self { entry }
    }
}

impl Default for WindowsPreciseTime {
    fn default() -> Self {
        Self::new()
    }
}

impl PreciseTimeSource for WindowsPreciseTime {
    fn precise_utc_now(&self) -> Result<DateTime<Utc>, PlatformError> {
        let Some(precise) = self.entry else {
            return Err(PlatformError::Unsupported("GetSystemTimePreciseAsFileTime"));
        };

        let mut filetime = FILETIME::default();
        unsafe { precise(&mut filetime) };
        filetime_to_utc(filetime)
    }
}

/// Convert a FILETIME (100ns ticks since 1601) to a UTC timestamp.
fn filetime_to_utc(filetime: FILETIME) -> Result<DateTime<Utc>, PlatformError> {
    let ticks = ((filetime.dwHighDateTime as u64) << 32 | filetime.dwLowDateTime as u64) as i64;
    let since_epoch = ticks - UNIX_EPOCH_FILETIME_TICKS;
    let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
    let nanos = (since_epoch.rem_euclid(TICKS_PER_SECOND) * 100) as u32;

    DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
        PlatformError::call(
            "GetSystemTimePreciseAsFileTime",
            format!("FILETIME {ticks} out of range"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filetime(ticks: u64) -> FILETIME {
        FILETIME {
            dwLowDateTime: ticks as u32,
            dwHighDateTime: (ticks >> 32) as u32,
        }
    }

    #[test]
    fn test_filetime_unix_epoch() {
        let ts = filetime_to_utc(filetime(UNIX_EPOCH_FILETIME_TICKS as u64)).unwrap();
        assert_eq!(ts.timestamp(), 0);
        assert_eq!(ts.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_filetime_keeps_sub_microsecond_ticks() {
        let ticks = UNIX_EPOCH_FILETIME_TICKS as u64 + TICKS_PER_SECOND as u64 + 3;
        let ts = filetime_to_utc(filetime(ticks)).unwrap();
        assert_eq!(ts.timestamp(), 1);
        assert_eq!(ts.timestamp_subsec_nanos(), 300);
    }

    #[test]
    fn test_precise_time_is_close_to_system_time() {
        let source = WindowsPreciseTime::new();
        if let Ok(precise) = source.precise_utc_now() {
            let drift = (precise - Utc::now()).num_milliseconds().abs();
            assert!(drift < 1000);
        }
    }
}
