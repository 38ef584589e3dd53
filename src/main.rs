use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

use adalight_driver::color::{Color, ColorSource, Gradient, Rainbow, Solid};
use adalight_driver::connection::ConnectionManager;
use adalight_driver::discovery::{ControllerRegistry, DiscoveryService, InMemoryRegistry};
use adalight_driver::geometry::{DeviceVariant, VariantKind};
use adalight_driver::host::{FrameLoop, SettingsFile};
use adalight_driver::retry::ReconnectBackoff;
use adalight_driver::transport::SerialTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Pattern {
    Solid,
    Rainbow,
    Gradient,
}

#[derive(Parser)]
#[command(name = "adalight_driver")]
#[command(about = "Adalight serial LED driver\n\nRenders a color pattern to an Adalight strip, following a JSON settings file.", long_about = None)]
struct Cli {
    /// Path to host settings file (JSON: led_count, baud_rate, port)
    settings: PathBuf,

    /// Device shape
    #[arg(long, value_enum, default_value_t = VariantKind::Vertical)]
    variant: VariantKind,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Color pattern to render
    #[arg(long, value_enum, default_value_t = Pattern::Rainbow)]
    pattern: Pattern,

    /// Color for the solid pattern and start of the gradient (RRGGBB)
    #[arg(long, default_value = "ff8000")]
    color: String,

    /// End color of the gradient (RRGGBB)
    #[arg(long, default_value = "0040ff")]
    color2: String,

    /// Longest wait between reconnect attempts, in seconds
    #[arg(long, default_value_t = 8)]
    max_backoff: u64,

    /// Enable debug output (connection events and statistics)
    #[arg(long)]
    debug: bool,

    /// Enable detailed debug (hex dumps every frame)
    #[arg(long)]
    ddebug: bool,
}

fn parse_color(hex: &str) -> Result<Color> {
    Color::from_hex(hex).with_context(|| format!("Invalid color '{}', expected RRGGBB", hex))
}

fn build_source(cli: &Cli) -> Result<Box<dyn ColorSource>> {
    Ok(match cli.pattern {
        Pattern::Solid => Box::new(Solid(parse_color(&cli.color)?)),
        Pattern::Rainbow => Box::new(Rainbow::new(0.2)),
        Pattern::Gradient => Box::new(Gradient::new(parse_color(&cli.color)?, parse_color(&cli.color2)?)),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ddebug implies debug
    let level = if cli.ddebug {
        "debug"
    } else if cli.debug {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let source = build_source(&cli)?;

    // Serial ports cannot be discovered, make sure the registry holds a controller
    let discovery = DiscoveryService::default();
    let mut registry = InMemoryRegistry::default();
    discovery.initialize();
    discovery.update(&mut registry);
    let controller = registry
        .controllers()
        .first()
        .cloned()
        .context("No controller registered")?;

    let settings = SettingsFile::load(&cli.settings)?.with_fallback_port(controller.port.as_str());

    let variant = DeviceVariant::from(cli.variant);
    let backoff = ReconnectBackoff::new(
        Duration::from_millis(500),
        Duration::from_secs(cli.max_backoff.max(1)),
    );
    let manager = ConnectionManager::new(SerialTransport::new(), variant).with_backoff(backoff);
    info!("Driving {} as {}", manager.variant().name, controller.name);

    let mut frame_loop = FrameLoop::new(manager, source, settings, cli.fps);

    // Set up Ctrl-C handler with graceful shutdown
    let running = frame_loop.get_running_flag();
    let result = ctrlc::set_handler(move || {
        info!("Shutting down...");
        running.store(false, std::sync::atomic::Ordering::Relaxed);
    });

    if let Err(e) = result {
        warn!("Could not set Ctrl-C handler: {}", e);
    }

    // Run frames (blocks until shutdown)
    frame_loop.run();

    // Graceful shutdown - send a black frame to turn off LEDs
    frame_loop.shutdown();

    Ok(())
}
