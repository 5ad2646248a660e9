//! ndi-texture command line tool
//!
//! `list` prints the NDI sources visible on the network. `receive` runs the
//! polling receiver headless at a fixed rate and can save the last frame.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use parking_lot::Mutex;

use ndi_texture::telemetry::{init_logging, LogConfig};
use ndi_texture::{
    ExternalTexture, GpuContext, GpuFormatConverter, GpuImage, MaterialSlot, Ndi, NdiReceiver, ReceiverSettings,
};

#[derive(Debug, Parser)]
#[command(name = "ndi-texture", version, about = "Receive NDI video into GPU textures")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to the NDI runtime library
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List NDI sources on the network
    List {
        /// Seconds to wait for sources to appear
        #[arg(long, default_value_t = 2)]
        wait: u64,
    },
    /// Receive frames from a source
    Receive(ReceiveArgs),
}

#[derive(Debug, Args)]
struct ReceiveArgs {
    /// Settings file (default: the per-user config file)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source name, e.g. "STUDIO (Camera 1)"
    #[arg(long)]
    source: Option<String>,

    /// Stop after this many published frames
    #[arg(long)]
    frames: Option<u64>,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Polling rate
    #[arg(long)]
    fps: Option<u32>,

    /// Output texture width
    #[arg(long)]
    width: Option<u32>,

    /// Output texture height
    #[arg(long)]
    height: Option<u32>,

    /// Write the last published frame to this PNG file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Store the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        file_path: cli.log_file.clone(),
        json_format: cli.log_json,
        ..LogConfig::default()
    }
    .with_verbosity(cli.verbose);
    let _log_guard = init_logging(&log_config).context("failed to initialize logging")?;

    match cli.command {
        Command::List { wait } => list_sources(cli.library, Duration::from_secs(wait)),
        Command::Receive(args) => receive(cli.library, args),
    }
}

fn list_sources(library: Option<PathBuf>, wait: Duration) -> Result<()> {
    let ndi = Ndi::load(library.as_deref()).context("failed to load the NDI runtime")?;

    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !ndi.wait_for_sources(remaining) {
            break;
        }
    }

    let sources = ndi.current_sources();
    if sources.is_empty() {
        println!("No NDI sources found");
    }
    for source in sources {
        println!("{source}");
    }
    Ok(())
}

fn load_settings(args: &ReceiveArgs, library: Option<PathBuf>) -> Result<ReceiverSettings> {
    let mut settings = match &args.config {
        Some(path) => ReceiverSettings::load_from_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => ReceiverSettings::load(),
    };

    if let Some(source) = &args.source {
        settings.ndi_name = source.clone();
    }
    if let Some(fps) = args.fps {
        settings.target_fps = fps;
    }
    if let Some(width) = args.width {
        settings.output_width = width;
    }
    if let Some(height) = args.height {
        settings.output_height = height;
    }
    if let Some(library) = library {
        settings.library_path = Some(library.to_string_lossy().into_owned());
    }
    settings.clamp();

    if args.save_config {
        match &args.config {
            Some(path) => settings.save_to_file(path)?,
            None => settings.save()?,
        }
    }
    Ok(settings)
}

fn receive(library: Option<PathBuf>, args: ReceiveArgs) -> Result<()> {
    let settings = load_settings(&args, library)?;
    if settings.ndi_name.is_empty() {
        bail!("no source configured; pass --source or set ndiName in the settings file");
    }

    let ndi = Arc::new(Ndi::load(settings.library_path().as_deref()).context("failed to load the NDI runtime")?);
    let gpu = GpuContext::headless_blocking().context("failed to create a GPU device")?;

    let target = Arc::new(Mutex::new(ExternalTexture::create(
        gpu.clone(),
        settings.output_width,
        settings.output_height,
        GpuImage::FORMAT,
    )));
    let material = Arc::new(Mutex::new(MaterialSlot::<Arc<GpuImage>>::new()));

    let converter_gpu = gpu.clone();
    let mut receiver = NdiReceiver::from_settings(ndi, &settings, move || {
        Ok(GpuFormatConverter::new(converter_gpu.clone()))
    });
    receiver.set_target_renderer(Some(material.clone()));
    receiver.set_target_texture(Some(target.clone()));

    tracing::info!(
        "Receiving '{}' at {} fps into {}x{}",
        settings.ndi_name,
        settings.target_fps,
        settings.output_width,
        settings.output_height
    );

    let interval = Duration::from_secs_f64(1.0 / settings.target_fps as f64);
    let started = Instant::now();
    let stop_at = args.duration.map(|secs| started + Duration::from_secs(secs));
    let mut published: u64 = 0;
    let mut last_report = started;
    let mut published_at_report: u64 = 0;

    loop {
        let tick = Instant::now();
        if stop_at.is_some_and(|t| tick >= t) || args.frames.is_some_and(|n| published >= n) {
            break;
        }

        if receiver.update() {
            published += 1;
            if let Some(metadata) = receiver.metadata() {
                tracing::trace!("Frame metadata: {}", metadata);
            }
        }

        if tick.duration_since(last_report) >= Duration::from_secs(1) {
            let elapsed = tick.duration_since(last_report).as_secs_f64();
            let rate = (published - published_at_report) as f64 / elapsed;
            match receiver.texture() {
                Some(image) => tracing::info!(
                    "{} frames ({:.1} fps), source {}x{}, connections: {}",
                    published,
                    rate,
                    image.width(),
                    image.height(),
                    receiver.connection_count()
                ),
                None => tracing::info!("Waiting for '{}'...", settings.ndi_name),
            }
            last_report = tick;
            published_at_report = published;
        }

        if let Some(rest) = interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    tracing::info!("Published {} frames in {:.1}s", published, started.elapsed().as_secs_f64());

    if let Some(path) = &args.snapshot {
        if published == 0 {
            bail!("no frame was received, nothing to write to {}", path.display());
        }
        let image = gpu
            .read_texture_rgba(target.lock().texture())
            .context("failed to read back the output texture")?;
        image
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Saved snapshot to {}", path.display());
    }

    receiver.on_disable();
    Ok(())
}
