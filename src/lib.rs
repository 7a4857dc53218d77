//! Pointer Source - jittered cursor-position sampling for gaze and
//! accessibility hosts.
//!
//! This library polls the operating system for the cursor position at a
//! fixed cadence, stamps each reading with the most precise UTC clock the
//! host offers, adds bounded random jitter, and publishes the result to
//! subscribers.
//!
//! # Privacy
//!
//! - **Jittered positions**: every published point is offset by up to 10% of
//!   the primary screen height on each axis
//! - **On demand**: the cursor is never read while nobody is subscribed
//! - **No storage**: samples are pushed to subscribers and then forgotten
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PointService                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  subscribe ──▶ SubscriptionGate ──start/stop──▶ Sampler      │
//! │                                                  │           │
//! │         ┌──────────────┬──────────────┬──────────┤           │
//! │         ▼              ▼              ▼          ▼           │
//! │      Clock          Cursor         Jitter    ErrorChannel    │
//! │   (precise or     (platform)     (bounded)                   │
//! │    fallback)                                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pointer_source::{Config, PointService};
//!
//! let service = PointService::new(&Config::default()).expect("screen geometry");
//!
//! // Sampling starts with the first subscriber
//! let id = service
//!     .subscribe(|sample| println!("{:?} at {}", sample.point, sample.timestamp))
//!     .expect("service disposed");
//!
//! // ... and stops when the last one leaves
//! service.unsubscribe(id);
//! service.dispose();
//! ```

pub mod config;
pub mod platform;
pub mod sampler;
pub mod service;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use platform::{CursorSource, PlatformError, PreciseTimeSource, ScreenGeometry};
pub use sampler::{
    Clock, ErrorEvent, ErrorSource, JitterSource, NoiseMagnitude, Point, RandomJitter,
    SamplerError, SamplerState, SamplingError, SubscriberError, SubscriptionId, SystemClock,
    TimestampedSample,
};
pub use service::{PointService, PointServiceBuilder, ServiceError};
pub use stats::{SamplerStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              POINTER SOURCE - PRIVACY DECLARATION                ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This service reports where your pointer is, on request.         ║
║                                                                  ║
║  ✓ WHAT WE REPORT:                                               ║
║    • An approximate pointer position, ten times a second         ║
║    • The time each position was read                             ║
║                                                                  ║
║  ✗ WHAT WE NEVER DO:                                             ║
║    • Report your exact position (random jitter is always added)  ║
║    • Read the pointer while nothing is listening                 ║
║    • Store positions on disk                                     ║
║    • Capture clicks, keys or screen content                      ║
║                                                                  ║
║  Jitter scales with your display: up to 10% of the screen        ║
║  height in each direction.                                       ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
