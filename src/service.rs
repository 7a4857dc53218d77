//! The point source consumed by host applications.
//!
//! [`PointService`] owns the sampler and its subscription gate. Subscribing
//! for the first time starts sampling, removing the last subscriber stops
//! it, and disposal ends it for good.

use crate::config::Config;
use crate::platform::{
    CursorSource, PlatformCursor, PlatformError, PlatformPreciseTime, PlatformScreen,
    ScreenGeometry,
};
use crate::sampler::{
    Clock, ErrorEvent, JitterSource, ListenerId, NoiseMagnitude, RandomJitter, Sampler,
    SamplerError, SamplerState, SubscriberError, SubscriptionGate, SubscriptionId, SystemClock,
    TimestampedSample, DEFAULT_POLL_INTERVAL,
};
use crate::stats::StatsSnapshot;
use crossbeam_channel::{bounded, Receiver, TrySendError};
use std::sync::Arc;
use std::time::Duration;

/// Errors raised while building a [`PointService`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The primary screen height could not be read.
    ScreenGeometry(PlatformError),
    InvalidSettings(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::ScreenGeometry(e) => write!(f, "Screen geometry unavailable: {e}"),
            ServiceError::InvalidSettings(e) => write!(f, "Invalid settings: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::ScreenGeometry(e) => Some(e),
            ServiceError::InvalidSettings(_) => None,
        }
    }
}

/// Assembles a [`PointService`], defaulting every collaborator to the
/// platform backend.
pub struct PointServiceBuilder {
    cursor: Option<Arc<dyn CursorSource>>,
    clock: Option<Arc<dyn Clock>>,
    jitter: Option<Box<dyn JitterSource>>,
    screen_height: Option<i32>,
    poll_interval: Duration,
    noise_fraction: f64,
}

impl PointServiceBuilder {
    fn new() -> Self {
        Self {
            cursor: None,
            clock: None,
            jitter: None,
            screen_height: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            noise_fraction: NoiseMagnitude::DEFAULT_FRACTION,
        }
    }

    pub fn cursor(mut self, cursor: Arc<dyn CursorSource>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn jitter(mut self, jitter: Box<dyn JitterSource>) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Use a known screen height instead of querying the display.
    pub fn screen_height(mut self, pixels: i32) -> Self {
        self.screen_height = Some(pixels);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn noise_fraction(mut self, fraction: f64) -> Self {
        self.noise_fraction = fraction;
        self
    }

    pub fn config(self, config: &Config) -> Self {
        self.poll_interval(config.poll_interval)
            .noise_fraction(config.noise_fraction)
    }

    pub fn build(self) -> Result<PointService, ServiceError> {
        if self.poll_interval.is_zero() {
            return Err(ServiceError::InvalidSettings(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.noise_fraction) {
            return Err(ServiceError::InvalidSettings(format!(
                "noise fraction {} outside [0, 1]",
                self.noise_fraction
            )));
        }

        let screen_height = match self.screen_height {
            Some(height) => height,
            None => PlatformScreen::new()
                .primary_screen_height()
                .map_err(ServiceError::ScreenGeometry)?,
        };
        let magnitude = NoiseMagnitude::from_screen_height(screen_height, self.noise_fraction);

        let cursor = self
            .cursor
            .unwrap_or_else(|| Arc::new(PlatformCursor::new()));
        let clock = self.clock.unwrap_or_else(|| {
            let clock = SystemClock::probe(Arc::new(PlatformPreciseTime::new()));
            tracing::debug!(precise = clock.is_precise(), "Clock probed");
            Arc::new(clock)
        });
        let jitter = self
            .jitter
            .unwrap_or_else(|| Box::new(RandomJitter::new()));

        tracing::debug!(
            screen_height,
            magnitude = magnitude.pixels(),
            "Point service configured"
        );

        let sampler = Sampler::new(cursor, clock, jitter, magnitude, self.poll_interval);
        Ok(PointService {
            gate: SubscriptionGate::new(sampler.clone()),
            sampler,
        })
    }
}

/// Jittered cursor positions, sampled on demand.
pub struct PointService {
    sampler: Sampler,
    gate: SubscriptionGate,
}

impl PointService {
    /// Build a service on the platform backends using `config`.
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> PointServiceBuilder {
        PointServiceBuilder::new()
    }

    /// Receive every sample. The first subscriber starts sampling.
    pub fn subscribe<F>(&self, callback: F) -> Result<SubscriptionId, SamplerError>
    where
        F: Fn(&TimestampedSample) + Send + Sync + 'static,
    {
        self.gate.add_subscriber(move |sample| {
            callback(sample);
            Ok(())
        })
    }

    /// Like [`subscribe`](Self::subscribe), for callbacks that can fail.
    ///
    /// Errors go to the error listeners; sampling continues.
    pub fn subscribe_fallible<F>(&self, callback: F) -> Result<SubscriptionId, SamplerError>
    where
        F: Fn(&TimestampedSample) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.gate.add_subscriber(callback)
    }

    /// Receive samples through a bounded channel.
    ///
    /// Samples are dropped while the channel is full. A dropped receiver is
    /// reported as a subscriber error on every sample until unsubscribed.
    /// A capacity of 0 is raised to 1; a rendezvous channel would drop
    /// nearly every sample.
    pub fn subscribe_channel(
        &self,
        capacity: usize,
    ) -> Result<(SubscriptionId, Receiver<TimestampedSample>), SamplerError> {
        let (sender, receiver) = bounded(capacity.max(1));
        let id = self.gate.add_subscriber(move |sample| match sender.try_send(*sample) {
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Disconnected(_)) => {
                Err(SubscriberError::new("sample receiver disconnected"))
            }
        })?;
        Ok((id, receiver))
    }

    /// Remove a subscriber. The last removal stops sampling.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.gate.remove_subscriber(id)
    }

    /// Observe failures raised while sampling.
    pub fn subscribe_errors<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        self.sampler.errors().add_listener(listener)
    }

    pub fn unsubscribe_errors(&self, id: ListenerId) -> bool {
        self.sampler.errors().remove_listener(id)
    }

    /// Stop sampling permanently and release the worker thread.
    ///
    /// Subscribing afterwards fails with [`SamplerError::Disposed`].
    pub fn dispose(&self) {
        if self.sampler.state() == SamplerState::Disposed {
            return;
        }
        self.sampler.dispose();

        let _dispatch = self.sampler.lock_dispatch();
        let dropped = self.sampler.subscribers().clear();
        tracing::debug!(dropped, "Subscribers released");
    }

    pub fn state(&self) -> SamplerState {
        self.sampler.state()
    }

    pub fn is_running(&self) -> bool {
        self.sampler.is_running()
    }

    pub fn subscriber_count(&self) -> usize {
        self.gate.subscriber_count()
    }

    pub fn noise_magnitude(&self) -> NoiseMagnitude {
        self.sampler.magnitude()
    }

    pub fn poll_interval(&self) -> Duration {
        self.sampler.interval()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.sampler.stats().snapshot()
    }

    pub fn stats_summary(&self) -> String {
        self.sampler.stats().summary()
    }
}

impl Drop for PointService {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::Point;

    struct StillCursor;

    impl CursorSource for StillCursor {
        fn cursor_position(&self) -> Result<Point, PlatformError> {
            Ok(Point::new(500, 500))
        }
    }

    fn service() -> PointService {
        PointService::builder()
            .cursor(Arc::new(StillCursor))
            .screen_height(1000)
            .poll_interval(Duration::from_millis(2))
            .build()
            .unwrap()
    }

    #[test]
    fn test_magnitude_from_screen_height() {
        assert_eq!(service().noise_magnitude().pixels(), 100);

        let service = PointService::builder()
            .cursor(Arc::new(StillCursor))
            .screen_height(1000)
            .noise_fraction(0.05)
            .build()
            .unwrap();
        assert_eq!(service.noise_magnitude().pixels(), 50);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = PointService::builder()
            .screen_height(1000)
            .poll_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(ServiceError::InvalidSettings(_))));

        let result = PointService::builder()
            .screen_height(1000)
            .noise_fraction(-0.1)
            .build();
        assert!(matches!(result, Err(ServiceError::InvalidSettings(_))));
    }

    #[test]
    fn test_config_applied() {
        let config = Config {
            poll_interval: Duration::from_millis(40),
            noise_fraction: 0.2,
            channel_capacity: 8,
        };
        let service = PointService::builder()
            .cursor(Arc::new(StillCursor))
            .screen_height(1000)
            .config(&config)
            .build()
            .unwrap();

        assert_eq!(service.poll_interval(), Duration::from_millis(40));
        assert_eq!(service.noise_magnitude().pixels(), 200);
    }

    #[test]
    fn test_channel_subscriber_receives_samples() {
        let service = service();
        let (id, receiver) = service.subscribe_channel(16).unwrap();
        assert!(service.is_running());

        let sample = receiver
            .recv_timeout(Duration::from_secs(2))
            .expect("sample within timeout");
        assert!((400..=600).contains(&sample.point.x));
        assert!((400..=600).contains(&sample.point.y));

        assert!(service.unsubscribe(id));
        assert!(!service.is_running());
    }

    #[test]
    fn test_zero_capacity_channel_still_buffers() {
        let service = service();
        let (id, receiver) = service.subscribe_channel(0).unwrap();

        // Nobody is blocked in recv, so a rendezvous channel would drop everything
        std::thread::sleep(Duration::from_millis(50));
        assert!(receiver.try_recv().is_ok());

        service.unsubscribe(id);
    }

    #[test]
    fn test_dropped_receiver_reported() {
        let service = service();
        let (errors_tx, errors_rx) = bounded(16);
        service.subscribe_errors(move |event| {
            let _ = errors_tx.try_send(event.error.clone());
        });

        let (_id, receiver) = service.subscribe_channel(1).unwrap();
        drop(receiver);

        let error = errors_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("error within timeout");
        assert!(matches!(error, crate::sampler::SamplingError::Subscriber(_)));
    }

    #[test]
    fn test_dispose_releases_subscribers() {
        let service = service();
        service.subscribe(|_| {}).unwrap();
        service.subscribe(|_| {}).unwrap();

        service.dispose();
        assert_eq!(service.state(), SamplerState::Disposed);
        assert_eq!(service.subscriber_count(), 0);
        assert_eq!(service.subscribe(|_| {}), Err(SamplerError::Disposed));
    }
}
