//! Demonstration of the pointer source lifecycle.
//!
//! This example shows how to:
//! 1. Build a service around a simulated cursor (runs on any platform)
//! 2. Start sampling by subscribing
//! 3. Observe jitter around the true position
//! 4. Stop sampling by unsubscribing, then dispose
//!
//! Run with: cargo run --example watch_demo

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pointer_source::{
    CursorSource, PlatformError, Point, PointService, PRIVACY_DECLARATION,
};

/// A cursor that walks around a circle, one step per read.
struct CircleCursor {
    step: AtomicU32,
}

impl CursorSource for CircleCursor {
    fn cursor_position(&self) -> Result<Point, PlatformError> {
        let step = self.step.fetch_add(1, Ordering::Relaxed) as f64;
        let angle = step * std::f64::consts::TAU / 40.0;
        Ok(Point::new(
            (960.0 + 300.0 * angle.cos()) as i32,
            (540.0 + 300.0 * angle.sin()) as i32,
        ))
    }
}

fn main() {
    println!("Pointer Source - Watch Demo");
    println!("===========================");
    println!();
    println!("{PRIVACY_DECLARATION}");

    let service = PointService::builder()
        .cursor(Arc::new(CircleCursor {
            step: AtomicU32::new(0),
        }))
        .screen_height(1080)
        .build()
        .expect("Failed to build point service");

    println!("Jitter magnitude: ±{}px", service.noise_magnitude().pixels());
    println!("Sampling state before subscribing: {}", service.state());
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    service.subscribe_errors(|event| {
        eprintln!("  Error from {}: {}", event.source, event.error);
    });

    let (id, receiver) = service
        .subscribe_channel(64)
        .expect("Service already disposed");
    println!("Sampling state after subscribing: {}", service.state());
    println!("Watching for 5 seconds...");
    println!();

    let start = std::time::Instant::now();
    while running.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(5) {
        match receiver.recv_timeout(Duration::from_millis(200)) {
            Ok(sample) => println!(
                "  [{}] x={:>5} y={:>5}",
                sample.timestamp.format("%H:%M:%S%.6f"),
                sample.point.x,
                sample.point.y
            ),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    service.unsubscribe(id);
    println!();
    println!("Sampling state after unsubscribing: {}", service.state());

    service.dispose();
    println!();
    println!("{}", service.stats_summary());
    println!();
    println!("Demo complete!");
}
