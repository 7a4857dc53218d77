//! Pointer Source CLI
//!
//! Watch the jittered pointer stream and inspect platform capabilities.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use pointer_source::{
    platform::{
        CursorSource, PlatformCursor, PlatformPreciseTime, PlatformScreen, ScreenGeometry,
    },
    Config, NoiseMagnitude, PointService, SystemClock, PRIVACY_DECLARATION, VERSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pointer-source")]
#[command(version = VERSION)]
#[command(about = "Jittered, timestamped pointer position sampling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print samples until Ctrl+C
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Report clock precision, screen height and one raw cursor reading
    Probe,

    /// Show configuration
    Config,

    /// Display privacy declaration
    Privacy,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pointer_source=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { seconds, format } => cmd_watch(seconds, format),
        Commands::Probe => cmd_probe(),
        Commands::Config => cmd_config(),
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
    }
}

fn cmd_watch(seconds: Option<u64>, format: Format) -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    let service = PointService::new(&config).context("creating point service")?;

    eprintln!("Pointer Source v{VERSION}");
    eprintln!(
        "  Poll interval: {}ms",
        service.poll_interval().as_millis()
    );
    eprintln!("  Jitter: ±{}px", service.noise_magnitude().pixels());
    eprintln!();
    eprintln!("Press Ctrl+C to stop");
    eprintln!();

    service.subscribe_errors(|event| {
        eprintln!(
            "[{}] {} error: {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.source,
            event.error
        );
    });

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")?;

    let (id, receiver) = service.subscribe_channel(config.channel_capacity)?;
    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));

    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(sample) => match format {
                Format::Json => println!("{}", serde_json::to_string(&sample)?),
                Format::Text => println!(
                    "[{}] x={} y={}",
                    sample.timestamp.format("%H:%M:%S%.6f"),
                    sample.point.x,
                    sample.point.y
                ),
            },
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Sampler disconnected unexpectedly");
                break;
            }
        }
    }

    service.unsubscribe(id);
    service.dispose();

    eprintln!();
    eprintln!("{}", service.stats_summary());
    Ok(())
}

fn cmd_probe() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Pointer Source Capabilities");
    println!("===========================");
    println!();

    let clock = SystemClock::probe(Arc::new(PlatformPreciseTime::new()));
    println!(
        "Clock: {}",
        if clock.is_precise() {
            "high resolution"
        } else {
            "standard resolution (fallback)"
        }
    );

    match PlatformScreen::new().primary_screen_height() {
        Ok(height) => {
            let magnitude = NoiseMagnitude::from_screen_height(height, config.noise_fraction);
            println!("Primary screen height: {height}px");
            println!("Jitter magnitude: ±{}px", magnitude.pixels());
        }
        Err(e) => println!("Primary screen height: unavailable ({e})"),
    }

    match PlatformCursor::new().cursor_position() {
        Ok(point) => println!("Cursor (raw): x={} y={}", point.x, point.y),
        Err(e) => bail!("cursor position unavailable: {e}"),
    }

    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
