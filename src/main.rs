// src/main.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{self, Clear, ClearType, disable_raw_mode, enable_raw_mode},
};

use wave_view::config::WaveConfig;
use wave_view::controller::ViewerController;
use wave_view::export::import_peaks_json;
use wave_view::source::DecodedBuffer;

const WAVE_HEIGHT: usize = 16;

/// Scrollable, zoomable terminal waveform viewer for WAV files.
#[derive(Parser, Debug)]
#[command(name = "wave-view", version)]
struct Args {
    /// WAV file to display
    file: PathBuf,

    /// Zoom level in columns per second
    #[arg(long)]
    px_per_sec: Option<f64>,

    /// Viewer width in columns (defaults to the terminal width)
    #[arg(long)]
    width: Option<usize>,

    /// Only extract peaks for newly visible columns
    #[arg(long)]
    partial: bool,

    /// One peak series per channel
    #[arg(long)]
    split_channels: bool,

    /// JSON file with viewer options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pre-computed peaks (JSON, as written by the export key) to draw
    /// instead of scanning the samples
    #[arg(long)]
    peaks: Option<PathBuf>,
}

fn read_wav(path: &Path) -> anyhow::Result<DecodedBuffer> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };
    log::info!(
        "{}: {} Hz, {} channel(s), {} bit {:?}",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );
    let buffer = DecodedBuffer::from_interleaved(&samples, spec.channels as usize, spec.sample_rate)?;
    Ok(buffer)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => WaveConfig::load_from_disk(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => WaveConfig {
            fill_parent: false,
            scroll_parent: true,
            ..WaveConfig::default()
        },
    };
    if let Some(pps) = args.px_per_sec {
        config.min_px_per_sec = pps;
    }
    config.partial_render |= args.partial;
    config.split_channels |= args.split_channels;

    let width = match args.width {
        Some(w) => w,
        None => terminal::size().map(|(cols, _)| cols as usize).unwrap_or(120),
    };

    let mut buffer = read_wav(&args.file)?;
    if let Some(path) = &args.peaks {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read peaks {}", path.display()))?;
        let peaks = import_peaks_json(&json).with_context(|| format!("Invalid peaks file {}", path.display()))?;
        log::info!("using {} pre-computed column(s) from {}", peaks.columns(), path.display());
        buffer.set_peaks(Some(peaks));
    }
    let title = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let export_path = args.file.with_extension("peaks.json");

    let mut viewer = ViewerController::new(config, width, WAVE_HEIGHT, Box::new(buffer), title, export_path)?;

    println!("[SPACE] Play/Pause | [←/→] Scroll | [+/-] Zoom | [ ] Skip | [Home] Stop | [E] Export | [Q] Quit");

    enable_raw_mode()?;
    execute!(std::io::stdout(), Clear(ClearType::All))?;
    let result = run(&mut viewer);
    disable_raw_mode()?;
    println!("\r\nBye.");
    result
}

fn run(viewer: &mut ViewerController) -> anyhow::Result<()> {
    // ~20 FPS
    let frame = Duration::from_millis(50);
    viewer.run_tick()?;

    loop {
        if event::poll(frame)? {
            match event::read()? {
                Event::Key(ev) if ev.kind == KeyEventKind::Press => {
                    if viewer.should_quit(ev.code, ev.modifiers) {
                        return Ok(());
                    }
                    if let Err(e) = viewer.handle_key(ev.code) {
                        log::warn!("{:#}", e);
                    }
                }
                Event::Resize(cols, _) => viewer.resize(cols as usize)?,
                _ => {}
            }
        }
        viewer.run_tick()?;
    }
}
