//! The polling loop and its lifecycle.
//!
//! One dedicated thread runs the loop while there is demand. Each iteration
//! takes the dispatch lock, reads the clock and the cursor, applies jitter
//! and hands the sample to every subscriber, then releases the lock and
//! sleeps. Cancellation is cooperative and observed at iteration
//! boundaries.

use super::clock::Clock;
use super::errors::{panic_message, ErrorChannel, ErrorSource, SamplingError};
use super::jitter::JitterSource;
use super::subscribers::SubscriberSet;
use super::types::{NoiseMagnitude, TimestampedSample};
use crate::platform::{CursorSource, PlatformError};
use crate::stats::SamplerStats;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use uuid::Uuid;

/// Default pause between iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const THREAD_NAME: &str = "pointer-sampler";

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Running,
    Disposed,
}

impl std::fmt::Display for SamplerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerState::Idle => write!(f, "idle"),
            SamplerState::Running => write!(f, "running"),
            SamplerState::Disposed => write!(f, "disposed"),
        }
    }
}

/// Errors returned by lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplerError {
    /// The sampler was disposed and cannot run again.
    Disposed,
    /// The worker thread could not be created.
    Spawn(String),
}

impl std::fmt::Display for SamplerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerError::Disposed => write!(f, "Sampler has been disposed"),
            SamplerError::Spawn(e) => write!(f, "Failed to spawn sampler thread: {e}"),
        }
    }
}

impl std::error::Error for SamplerError {}

/// Internal run state; `Stopping` means a live loop has been asked to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Stopping,
    Disposed,
}

struct Lifecycle {
    state: RunState,
    worker: Option<JoinHandle<()>>,
    run_id: Option<Uuid>,
}

/// State shared between the owning service and the worker thread.
struct SamplerCore {
    /// Held for one read-emit pass and for every subscriber mutation.
    dispatch: ReentrantMutex<()>,
    subscribers: SubscriberSet,
    errors: ErrorChannel,
    stats: SamplerStats,
    lifecycle: Mutex<Lifecycle>,
    cursor: Arc<dyn CursorSource>,
    clock: Arc<dyn Clock>,
    jitter: Mutex<Box<dyn JitterSource>>,
    magnitude: NoiseMagnitude,
    interval: Duration,
}

/// Handle to the polling loop. Clones share the same loop.
#[derive(Clone)]
pub struct Sampler {
    core: Arc<SamplerCore>,
}

impl Sampler {
    pub fn new(
        cursor: Arc<dyn CursorSource>,
        clock: Arc<dyn Clock>,
        jitter: Box<dyn JitterSource>,
        magnitude: NoiseMagnitude,
        interval: Duration,
    ) -> Self {
        Self {
            core: Arc::new(SamplerCore {
                dispatch: ReentrantMutex::new(()),
                subscribers: SubscriberSet::new(),
                errors: ErrorChannel::new(),
                stats: SamplerStats::new(),
                lifecycle: Mutex::new(Lifecycle {
                    state: RunState::Idle,
                    worker: None,
                    run_id: None,
                }),
                cursor,
                clock,
                jitter: Mutex::new(jitter),
                magnitude,
                interval,
            }),
        }
    }

    /// Begin polling on the worker thread.
    ///
    /// A no-op while running. If the previous loop was asked to stop but has
    /// not reached its next boundary yet, the request is revoked and that
    /// loop keeps going, so two loops never overlap.
    pub fn start(&self) -> Result<(), SamplerError> {
        let mut lifecycle = self.core.lifecycle.lock();

        match lifecycle.state {
            RunState::Running => Ok(()),
            RunState::Disposed => Err(SamplerError::Disposed),
            RunState::Stopping => {
                lifecycle.state = RunState::Running;
                self.core.stats.record_run_started();
                tracing::info!(run_id = ?lifecycle.run_id, "Sampling resumed");
                Ok(())
            }
            RunState::Idle => {
                let run_id = Uuid::new_v4();
                let core = self.core.clone();
                let handle = thread::Builder::new()
                    .name(THREAD_NAME.to_string())
                    .spawn(move || run_loop(core, run_id))
                    .map_err(|e| SamplerError::Spawn(e.to_string()))?;

                lifecycle.state = RunState::Running;
                lifecycle.worker = Some(handle);
                lifecycle.run_id = Some(run_id);
                self.core.stats.record_run_started();
                tracing::info!(
                    %run_id,
                    interval_ms = self.core.interval.as_millis() as u64,
                    magnitude = self.core.magnitude.pixels(),
                    "Sampling started"
                );
                Ok(())
            }
        }
    }

    /// Ask the loop to exit at its next boundary. Does not wait.
    pub fn stop(&self) {
        let mut lifecycle = self.core.lifecycle.lock();
        if lifecycle.state == RunState::Running {
            lifecycle.state = RunState::Stopping;
            self.core.stats.record_run_stopped();
            tracing::info!(run_id = ?lifecycle.run_id, "Sampling stop requested");
        }
    }

    /// Stop permanently and release the worker thread.
    ///
    /// Waits for the loop to finish its current iteration unless called from
    /// the worker thread itself (e.g. from inside a subscriber).
    pub fn dispose(&self) {
        let worker = {
            let mut lifecycle = self.core.lifecycle.lock();
            match lifecycle.state {
                RunState::Disposed => return,
                RunState::Running => self.core.stats.record_run_stopped(),
                RunState::Idle | RunState::Stopping => {}
            }
            lifecycle.state = RunState::Disposed;
            lifecycle.run_id = None;
            lifecycle.worker.take()
        };

        if let Some(handle) = worker {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::error!("Sampler thread panicked");
            }
        }
        tracing::info!("Sampler disposed");
    }

    pub fn state(&self) -> SamplerState {
        match self.core.lifecycle.lock().state {
            RunState::Running => SamplerState::Running,
            RunState::Idle | RunState::Stopping => SamplerState::Idle,
            RunState::Disposed => SamplerState::Disposed,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SamplerState::Running
    }

    pub fn magnitude(&self) -> NoiseMagnitude {
        self.core.magnitude
    }

    pub fn interval(&self) -> Duration {
        self.core.interval
    }

    pub fn stats(&self) -> &SamplerStats {
        &self.core.stats
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.core.errors
    }

    pub(crate) fn subscribers(&self) -> &SubscriberSet {
        &self.core.subscribers
    }

    /// The lock that serializes subscriber changes with emission.
    pub(crate) fn lock_dispatch(&self) -> ReentrantMutexGuard<'_, ()> {
        self.core.dispatch.lock()
    }
}

/// Puts the lifecycle back to `Idle` if the loop unwinds, so a later
/// `start()` spawns a fresh worker instead of trusting a dead one.
struct LoopGuard<'a> {
    core: &'a SamplerCore,
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }

        let mut lifecycle = self.core.lifecycle.lock();
        if lifecycle.state == RunState::Running {
            self.core.stats.record_run_stopped();
        }
        if matches!(lifecycle.state, RunState::Running | RunState::Stopping) {
            lifecycle.state = RunState::Idle;
            lifecycle.worker = None;
            lifecycle.run_id = None;
        }
        tracing::error!("Sampling loop panicked");
    }
}

fn run_loop(core: Arc<SamplerCore>, run_id: Uuid) {
    let span = tracing::info_span!("sampler", %run_id);
    let _entered = span.enter();
    let _guard = LoopGuard { core: &core };

    let mut last_timestamp = None;
    while core.keep_running() {
        core.sample_once(&mut last_timestamp);
        thread::sleep(core.interval);
    }

    tracing::debug!("Sampling loop exited");
}

fn panicked(call: &'static str, payload: &(dyn std::any::Any + Send)) -> PlatformError {
    PlatformError::call(call, format!("panicked: {}", panic_message(payload)))
}

impl SamplerCore {
    /// Iteration boundary: consume a pending stop request.
    fn keep_running(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            RunState::Running => true,
            RunState::Stopping => {
                lifecycle.state = RunState::Idle;
                lifecycle.worker = None;
                lifecycle.run_id = None;
                false
            }
            RunState::Idle | RunState::Disposed => false,
        }
    }

    /// One read-stamp-emit pass under the dispatch lock.
    fn sample_once(&self, last_timestamp: &mut Option<DateTime<Utc>>) {
        let _dispatch = self.dispatch.lock();

        let subscribers = self.subscribers.snapshot();
        if subscribers.is_empty() {
            return;
        }

        let now = catch_unwind(AssertUnwindSafe(|| self.clock.now()))
            .unwrap_or_else(|payload| Err(panicked("Clock::now", payload.as_ref())));
        let timestamp = match now {
            Ok(now) => now,
            Err(e) => {
                self.stats.record_clock_failure();
                self.errors.publish(ErrorSource::Clock, SamplingError::Clock(e));
                return;
            }
        };
        // Wall clocks can step backwards; one loop never emits out of order
        let timestamp = match *last_timestamp {
            Some(previous) if previous > timestamp => previous,
            _ => timestamp,
        };
        *last_timestamp = Some(timestamp);

        let read = catch_unwind(AssertUnwindSafe(|| self.cursor.cursor_position()))
            .unwrap_or_else(|payload| Err(panicked("cursor_position", payload.as_ref())));
        let raw = match read {
            Ok(point) => point,
            Err(e) => {
                self.stats.record_cursor_failure();
                self.errors
                    .publish(ErrorSource::Cursor, SamplingError::CursorRead(e));
                return;
            }
        };

        let offsets = catch_unwind(AssertUnwindSafe(|| {
            let mut jitter = self.jitter.lock();
            (jitter.next(self.magnitude), jitter.next(self.magnitude))
        }));
        let point = match offsets {
            Ok((dx, dy)) => raw.offset(dx, dy),
            Err(payload) => {
                self.errors.publish(
                    ErrorSource::Jitter,
                    SamplingError::JitterPanicked(panic_message(payload.as_ref())),
                );
                return;
            }
        };
        let sample = TimestampedSample::new(point, timestamp);
        tracing::trace!(x = point.x, y = point.y, "Sample");

        for (id, callback) in subscribers {
            let error = match catch_unwind(AssertUnwindSafe(|| callback(&sample))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => SamplingError::Subscriber(e),
                Err(payload) => SamplingError::SubscriberPanicked(panic_message(payload.as_ref())),
            };
            self.stats.record_subscriber_failure();
            self.errors.publish(ErrorSource::Subscriber(id), error);
        }
        self.stats.record_sample();
    }
}
