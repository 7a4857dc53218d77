//! Demand-driven start/stop of the sampler.
//!
//! The gate counts subscribers. Registering the first one starts the loop
//! and removing the last one stops it. Both run under the sampler's
//! dispatch lock, so they never interleave with an emission pass on another
//! thread. The lock is reentrant, so subscribers may call back into the
//! gate from inside their callback.

use super::errors::SubscriberError;
use super::subscribers::SubscriptionId;
use super::types::TimestampedSample;
use super::worker::{Sampler, SamplerError, SamplerState};
use std::sync::Arc;

#[derive(Clone)]
pub struct SubscriptionGate {
    sampler: Sampler,
}

impl SubscriptionGate {
    pub fn new(sampler: Sampler) -> Self {
        Self { sampler }
    }

    /// Register a callback, starting the loop on the 0 -> 1 transition.
    ///
    /// If the loop cannot be started the registration is rolled back.
    pub fn add_subscriber<F>(&self, callback: F) -> Result<SubscriptionId, SamplerError>
    where
        F: Fn(&TimestampedSample) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        let _dispatch = self.sampler.lock_dispatch();

        if self.sampler.state() == SamplerState::Disposed {
            return Err(SamplerError::Disposed);
        }

        let subscribers = self.sampler.subscribers();
        let (id, previous) = subscribers.insert(Arc::new(callback));
        // dispose() does not take the dispatch lock and may have landed
        // between the check above and the insert
        if self.sampler.state() == SamplerState::Disposed {
            subscribers.remove(id);
            return Err(SamplerError::Disposed);
        }
        if previous == 0 {
            if let Err(e) = self.sampler.start() {
                subscribers.remove(id);
                return Err(e);
            }
        }

        tracing::debug!(%id, count = previous + 1, "Subscriber added");
        Ok(id)
    }

    /// Deregister a callback, stopping the loop on the 1 -> 0 transition.
    ///
    /// Returns `false` for unknown ids. Once this returns on a thread other
    /// than the sampler's, the callback is not invoked again.
    pub fn remove_subscriber(&self, id: SubscriptionId) -> bool {
        let _dispatch = self.sampler.lock_dispatch();

        match self.sampler.subscribers().remove(id) {
            Some(remaining) => {
                if remaining == 0 {
                    self.sampler.stop();
                }
                tracing::debug!(%id, count = remaining, "Subscriber removed");
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sampler.subscribers().len()
    }
}
