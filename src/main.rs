//! streamplay - Main entry point
//!
//! Plays a compressed audio file by decoding it incrementally and streaming
//! fixed-size buffers to the default (or a named) output device.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamplay::audio::{CpalSink, MediaSource, SymphoniaFrameSource};
use streamplay::{EngineConfig, PlaybackEngine};

/// Command-line arguments for streamplay
#[derive(Parser, Debug)]
#[command(name = "streamplay")]
#[command(about = "Streaming audio player")]
#[command(version)]
struct Args {
    /// Audio file to play
    #[arg(required_unless_present = "list_devices")]
    file: Option<PathBuf>,

    /// Output device name (default: system default device)
    #[arg(short, long, env = "STREAMPLAY_DEVICE")]
    device: Option<String>,

    /// Output buffer capacity in bytes
    #[arg(long, env = "STREAMPLAY_BUFFER_CAPACITY")]
    buffer_capacity: Option<usize>,

    /// Number of output buffers kept in flight
    #[arg(long, env = "STREAMPLAY_BUFFER_COUNT")]
    buffer_count: Option<usize>,

    /// Path to a TOML config file
    #[arg(short, long, env = "STREAMPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// List available output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamplay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.list_devices {
        for name in CpalSink::list_devices().context("Failed to enumerate output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    // Resolve configuration: CLI/env overrides on top of file or defaults
    let mut config = EngineConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(capacity) = args.buffer_capacity {
        config.buffer_capacity = capacity;
    }
    if let Some(count) = args.buffer_count {
        config.buffer_count = count;
    }
    if args.device.is_some() {
        config.device = args.device.clone();
    }

    let file = args.file.context("No input file given")?;
    let mut media = MediaSource::open(&file)
        .with_context(|| format!("Failed to open {}", file.display()))?;

    let wave_format = media.wave_format().clone();
    info!(
        "Playing {}: {} Hz, {} channel(s), {} bits{}",
        file.display(),
        wave_format.sample_rate,
        wave_format.channels,
        wave_format.bits_per_sample(),
        media
            .duration_ms()
            .map(|ms| format!(", {:.1} s", ms as f64 / 1000.0))
            .unwrap_or_default()
    );

    let source = SymphoniaFrameSource::new(media.codec_params())
        .context("Failed to create decoder")?;
    let sink = CpalSink::new(config.device.clone());

    let mut engine = PlaybackEngine::new(config, wave_format, source, sink)
        .context("Failed to initialize playback engine")?;

    let stats = engine.run(&mut media).context("Playback failed")?;

    info!(
        "Done: {} buffers, {} bytes played",
        stats.buffers_submitted, stats.bytes_submitted
    );
    Ok(())
}
