//! Sample timestamps.

use crate::platform::{PlatformError, PreciseTimeSource};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Source of sample timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<DateTime<Utc>, PlatformError>;
}

/// Uses the precise OS clock when the host has it, `Utc::now()` otherwise.
///
/// Availability is probed once at construction. An `Unsupported` answer is
/// never surfaced; any other failure from the precise path is returned.
pub struct SystemClock {
    precise: Option<Arc<dyn PreciseTimeSource>>,
}

impl SystemClock {
    /// Probe the precise primitive once and cache whether it exists.
    pub fn probe(source: Arc<dyn PreciseTimeSource>) -> Self {
        match source.precise_utc_now() {
            Err(PlatformError::Unsupported(what)) => {
                tracing::debug!("{what} unavailable, using standard resolution clock");
                Self { precise: None }
            }
            _ => Self {
                precise: Some(source),
            },
        }
    }

    /// A clock that never consults a precise primitive.
    pub fn standard() -> Self {
        Self { precise: None }
    }

    pub fn is_precise(&self) -> bool {
        self.precise.is_some()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Result<DateTime<Utc>, PlatformError> {
        match &self.precise {
            Some(source) => match source.precise_utc_now() {
                Err(PlatformError::Unsupported(_)) => Ok(Utc::now()),
                other => other,
            },
            None => Ok(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        result: Result<DateTime<Utc>, PlatformError>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(result: Result<DateTime<Utc>, PlatformError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl PreciseTimeSource for FixedSource {
        fn precise_utc_now(&self) -> Result<DateTime<Utc>, PlatformError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[test]
    fn test_precise_source_used_when_available() {
        let fixed = DateTime::from_timestamp(1_000, 123).unwrap();
        let source = FixedSource::new(Ok(fixed));
        let clock = SystemClock::probe(source.clone());

        assert!(clock.is_precise());
        assert_eq!(clock.now().unwrap(), fixed);
    }

    #[test]
    fn test_unsupported_falls_back_without_error() {
        let source = FixedSource::new(Err(PlatformError::Unsupported("precise clock")));
        let clock = SystemClock::probe(source.clone());

        assert!(!clock.is_precise());
        let before = Utc::now();
        let now = clock.now().expect("fallback must not fail");
        assert!(now >= before);

        // Probed once, never consulted again
        clock.now().unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_other_failures_are_surfaced() {
        let source = FixedSource::new(Err(PlatformError::call("precise clock", "fault")));
        let clock = SystemClock::probe(source);

        assert!(clock.is_precise());
        assert_eq!(
            clock.now().unwrap_err(),
            PlatformError::call("precise clock", "fault")
        );
    }

    #[test]
    fn test_standard_clock() {
        let clock = SystemClock::standard();
        assert!(!clock.is_precise());
        assert!(clock.now().is_ok());
    }
}
