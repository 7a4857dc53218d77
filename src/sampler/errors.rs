//! Failure side-channel for the polling loop.
//!
//! Errors raised inside one iteration never end the loop. They are logged
//! and handed to every registered listener; with no listeners they are
//! dropped.

use super::subscribers::SubscriptionId;
use crate::platform::PlatformError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Clock,
    Cursor,
    Jitter,
    Subscriber(SubscriptionId),
}

impl std::fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSource::Clock => write!(f, "clock"),
            ErrorSource::Cursor => write!(f, "cursor"),
            ErrorSource::Jitter => write!(f, "jitter"),
            ErrorSource::Subscriber(id) => write!(f, "subscriber {id}"),
        }
    }
}

/// Error returned by a sample callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberError {
    message: String,
}

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for SubscriberError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SubscriberError {}

impl From<String> for SubscriberError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for SubscriberError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Transient failures inside one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplingError {
    Clock(PlatformError),
    CursorRead(PlatformError),
    JitterPanicked(String),
    Subscriber(SubscriberError),
    SubscriberPanicked(String),
}

impl std::fmt::Display for SamplingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingError::Clock(e) => write!(f, "Clock read failed: {e}"),
            SamplingError::CursorRead(e) => write!(f, "Cursor read failed: {e}"),
            SamplingError::JitterPanicked(msg) => write!(f, "Jitter source panicked: {msg}"),
            SamplingError::Subscriber(e) => write!(f, "Subscriber failed: {e}"),
            SamplingError::SubscriberPanicked(msg) => write!(f, "Subscriber panicked: {msg}"),
        }
    }
}

impl std::error::Error for SamplingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SamplingError::Clock(e) | SamplingError::CursorRead(e) => Some(e),
            SamplingError::Subscriber(e) => Some(e),
            SamplingError::JitterPanicked(_) | SamplingError::SubscriberPanicked(_) => None,
        }
    }
}

/// What error listeners receive.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub source: ErrorSource,
    pub error: SamplingError,
    pub timestamp: DateTime<Utc>,
}

/// Identifies a registered error listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;

/// Best-effort fan-out of loop failures.
#[derive(Default)]
pub struct ErrorChannel {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl ErrorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Report a failure to every listener.
    ///
    /// Listeners run on the caller's thread after the listener list is
    /// released, so they may add or remove listeners themselves.
    pub fn publish(&self, source: ErrorSource, error: SamplingError) {
        tracing::warn!(%source, "{error}");

        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        if listeners.is_empty() {
            return;
        }

        let event = ErrorEvent {
            source,
            error,
            timestamp: Utc::now(),
        };
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                tracing::error!(%source, "error listener panicked");
            }
        }
    }
}

/// Best-effort message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_publish_without_listeners_is_dropped() {
        let channel = ErrorChannel::new();
        channel.publish(
            ErrorSource::Cursor,
            SamplingError::CursorRead(PlatformError::Unsupported("cursor position")),
        );
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn test_every_listener_notified() {
        let channel = ErrorChannel::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = hits.clone();
            channel.add_listener(move |event| {
                assert_eq!(event.source, ErrorSource::Clock);
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        channel.publish(
            ErrorSource::Clock,
            SamplingError::Clock(PlatformError::call("clock", "fault")),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_removed_listener_not_notified() {
        let channel = ErrorChannel::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = channel.add_listener(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(channel.remove_listener(id));
        assert!(!channel.remove_listener(id));

        channel.publish(
            ErrorSource::Cursor,
            SamplingError::CursorRead(PlatformError::call("GetCursorPos", "denied")),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_escape() {
        let channel = ErrorChannel::new();
        let hits = Arc::new(AtomicUsize::new(0));
        channel.add_listener(|_| panic!("listener bug"));
        let h = hits.clone();
        channel.add_listener(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        channel.publish(
            ErrorSource::Subscriber(SubscriptionId::from_raw(4)),
            SamplingError::Subscriber(SubscriberError::new("closed")),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(5_u8);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
