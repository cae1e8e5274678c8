//! `epd` - drive a Waveshare 7.3" (E) panel from the command line.
//!
//! Every subcommand brings the panel up, runs, and shuts it down again.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use epd::display::LinuxPanelModule;
use epd::{Color, Device, FrameBuffer, VERSION_STRING};
use platform::DeviceConfig;

#[derive(Parser)]
#[command(name = "epd")]
#[command(about = "Waveshare 7.3\" (E) e-paper panel tool", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON device configuration (pins, SPI node, busy timeout)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print driver version, panel geometry and configuration
    Info,
    /// Fill the panel with one color (black, white, yellow, red, blue, green)
    Clear { color: Color },
    /// Show the built-in vertical color bars
    Show,
    /// Show the built-in horizontal color blocks
    Block,
    /// Render a six-stripe test frame on the host and display it
    Pattern,
    /// Put the panel into deep sleep
    Sleep,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&Path>) -> Result<DeviceConfig> {
    let Some(path) = path else {
        return Ok(DeviceConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: DeviceConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}

fn info(config: &DeviceConfig, device: &Device<LinuxPanelModule>) {
    let width = device.width();
    let height = device.height();
    println!("{VERSION_STRING}");
    println!("panel:   {} ({width}x{height})", epd::WAVESHARE_7_3_E_SPEC.name);
    let spec = epd::WAVESHARE_7_3_E_SPEC;
    println!(
        "color:   {:?} on {:?}, {} colors at {} bpp",
        spec.color_mode,
        spec.controller,
        spec.color_mode.palette_size(),
        spec.color_mode.bits_per_pixel()
    );
    println!("frame:   {} bytes", device.buffer_size());
    println!(
        "refresh: {:?} (full)",
        epd::WAVESHARE_7_3_E_SPEC.full_refresh_duration()
    );
    println!(
        "pins:    RST={} DC={} BUSY={} PWR={}",
        config.pins.rst, config.pins.dc, config.pins.busy, config.pins.pwr
    );
    println!("spi:     {} @ {} Hz", config.spi_path, config.spi.frequency);
    println!("busy:    {} ms", config.busy_timeout_ms);
}

fn run(command: &Commands, config: &DeviceConfig) -> Result<()> {
    let module = LinuxPanelModule::linux(config).context("invalid device configuration")?;
    let mut device = Device::new(module);
    device.initialize().context("failed to initialize panel")?;

    let result = match command {
        Commands::Info => {
            info(config, &device);
            Ok(())
        }
        Commands::Clear { color } => device.clear(*color).context("clear failed"),
        Commands::Show => device.show_test_pattern().context("test pattern failed"),
        Commands::Block => device.show_block_pattern().context("block pattern failed"),
        Commands::Pattern => {
            FrameBuffer::full_color_test_pattern(device.width(), device.height())
                .context("failed to build test frame")
                .and_then(|frame| device.display(&frame).context("display failed"))
        }
        Commands::Sleep => device.sleep().context("sleep failed"),
    };

    // Shut down even when the command failed; report the command error first.
    let shutdown = device.shutdown().context("failed to shut down panel");
    result.and(shutdown)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    config.validate().context("invalid device configuration")?;

    run(&cli.command, &config)
}
