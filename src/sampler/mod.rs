//! Cursor sampling: the polling loop and the pieces it is built from.

pub mod clock;
pub mod errors;
pub mod gate;
pub mod jitter;
pub mod subscribers;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use errors::{ErrorChannel, ErrorEvent, ErrorSource, ListenerId, SamplingError, SubscriberError};
pub use gate::SubscriptionGate;
pub use jitter::{JitterSource, RandomJitter};
pub use subscribers::{SampleCallback, SubscriptionId};
pub use types::{NoiseMagnitude, Point, TimestampedSample};
pub use worker::{Sampler, SamplerError, SamplerState, DEFAULT_POLL_INTERVAL};
