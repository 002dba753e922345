use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use qrnova::history::{History, ImageStore, JsonStore};
use qrnova::scanner::{
    CameraControls, Frame, LiveScanner, LumaDetector, LumaFrame, NoopControl, Rotation,
    ScanEvent, ScanSession,
};
use qrnova::{Config, QRBuilder, QRReader};

#[derive(Parser)]
#[command(name = "qrnova", version, about = "Generate and scan QR codes")]
struct Cli {
    /// Config file, defaults to qrnova.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode text into a QR code PNG
    Generate {
        text: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Bitmap side length in pixels
        #[arg(long)]
        size: Option<u32>,
        /// Also draw the code in the terminal
        #[arg(long)]
        print: bool,
        #[arg(long)]
        no_history: bool,
    },
    /// Read a QR code from an image file
    Scan {
        image: PathBuf,
        #[arg(long)]
        no_history: bool,
    },
    /// List scanned and created codes, newest first
    History,
    /// Delete history records
    Delete {
        /// Ids of scanned records
        #[arg(long, num_args = 1..)]
        scanned: Vec<u64>,
        /// Image refs of created records
        #[arg(long, num_args = 1..)]
        created: Vec<String>,
    },
    /// Replay a directory of images as camera frames
    Live {
        dir: PathBuf,
        /// Delay between frames in milliseconds
        #[arg(long, default_value_t = 33)]
        interval: u64,
        /// Frame rotation hint in degrees
        #[arg(long, default_value_t = 0)]
        rotation: u32,
        /// Stop after the first hit instead of resuming
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qrnova=info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::try_load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };

    match cli.command {
        Command::Generate { text, output, size, print, no_history } => {
            generate_cmd(&config, &text, output, size, print, no_history)
        }
        Command::Scan { image, no_history } => scan_cmd(&config, &image, no_history),
        Command::History => history_cmd(&config),
        Command::Delete { scanned, created } => delete_cmd(&config, &scanned, &created),
        Command::Live { dir, interval, rotation, once } => {
            live_cmd(&config, &dir, Duration::from_millis(interval), rotation, once).await
        }
    }
}

fn open_history(config: &Config) -> Result<History<JsonStore>> {
    let store = JsonStore::open(&config.history.path)
        .with_context(|| format!("Failed to open history {}", config.history.path.display()))?;
    Ok(History::new(store).with_images(ImageStore::new(&config.history.image_dir)))
}

fn generate_cmd(
    config: &Config,
    text: &str,
    output: Option<PathBuf>,
    size: Option<u32>,
    print: bool,
    no_history: bool,
) -> Result<()> {
    let mut builder = QRBuilder::with_config(text, &config.encoder);
    if let Some(size) = size {
        builder.size(size);
    }
    let qr = builder.build()?;

    if print {
        println!("{}", qr.to_string_art());
    }
    if let Some(output) = output {
        qr.save_png(&output)?;
        println!("Saved {}x{} QR code to {}", qr.width(), qr.height(), output.display());
    }
    if !no_history {
        let rec = open_history(config)?.add_created(&qr)?;
        println!("Stored as {}", rec.image_ref);
    }
    Ok(())
}

fn scan_cmd(config: &Config, image: &Path, no_history: bool) -> Result<()> {
    let reader = QRReader::with_config(&config.decoder);
    match reader.read_path(image)? {
        Some(text) => {
            println!("{text}");
            if !no_history {
                open_history(config)?.add_scanned(&text)?;
            }
        }
        None => println!("No QR code found"),
    }
    Ok(())
}

fn history_cmd(config: &Config) -> Result<()> {
    let history = open_history(config)?;

    println!("Scanned:");
    for rec in history.scanned() {
        println!("  #{} {} {}", rec.id, rec.timestamp.format("%Y-%m-%d %H:%M:%S"), rec.content);
    }
    println!("Created:");
    for rec in history.created() {
        println!(
            "  #{} {} {} [{}]",
            rec.id,
            rec.timestamp.format("%Y-%m-%d %H:%M:%S"),
            rec.content,
            rec.image_ref
        );
    }
    Ok(())
}

fn delete_cmd(config: &Config, scanned: &[u64], created: &[String]) -> Result<()> {
    if scanned.is_empty() && created.is_empty() {
        bail!("Nothing to delete, pass --scanned or --created");
    }
    let mut history = open_history(config)?;
    if !scanned.is_empty() {
        let n = history.delete_scanned(scanned)?;
        println!("Deleted {n} scanned record(s)");
    }
    if !created.is_empty() {
        let removed = history.delete_created(created)?;
        println!("Deleted {} created record(s)", removed.len());
    }
    Ok(())
}

async fn live_cmd(
    config: &Config,
    dir: &Path,
    interval: Duration,
    rotation: u32,
    once: bool,
) -> Result<()> {
    let rotation = Rotation::try_from(rotation)
        .map_err(|deg| anyhow::anyhow!("Rotation must be a multiple of 90, got {deg}"))?;

    let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    frames.sort();

    let detector = LumaDetector::new(config.live.formats.clone()).charset(config.decoder.character_set);
    let (scanner, events) = LiveScanner::spawn_dedicated(Arc::new(detector))?;
    let controls = CameraControls::new(NoopControl, &config.live);
    let mut session = ScanSession::new(scanner, events, controls);
    let mut history = open_history(config)?;

    for path in frames {
        let img = match image::open(&path) {
            Ok(img) => img.to_luma8(),
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        let name = path.display().to_string();
        let frame = Frame::new(LumaFrame::from_gray(&img)?, rotation)
            .on_release(move || debug!("Released {name}"));
        session.submit(frame);

        let tick = tokio::time::sleep(interval);
        tokio::pin!(tick);
        loop {
            tokio::select! {
                _ = &mut tick => break,
                event = session.next_event() => match event {
                    Some(ScanEvent::Found(text)) => {
                        println!("{text}");
                        history.add_scanned(&text)?;
                        if once {
                            return Ok(());
                        }
                        debug!("Zoom now {:.1}", session.controls().zoom());
                        session.rescan();
                    }
                    Some(ScanEvent::NotFound) => debug!("No code in frame"),
                    Some(ScanEvent::Failed(e)) => warn!("Frame analysis failed: {e}"),
                    None => bail!("Scanner stopped unexpectedly"),
                },
            }
        }
    }
    Ok(())
}
