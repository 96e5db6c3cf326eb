//! overlay_demo - end-to-end synthetic run of the detection overlay
//!
//! A producer thread plays the streaming collaborator: it generates padded
//! RGBA frames with a bright block sliding across a dark background and runs
//! them through the frame pipeline. The main thread plays the render context:
//! on a fixed cadence it polls the overlay and prints each repaint as a JSON
//! line of draw commands.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use frame_overlay::overlay::{self, DrawList};
use frame_overlay::{
    Detector, FramePipeline, ModelBundle, OverlayConfig, OverlayHandle, StubEngine, Viewport,
};

const RENDER_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the detection overlay on synthetic frames")]
struct Args {
    /// Number of frames to generate.
    #[arg(long, default_value_t = 30)]
    frames: u32,
    /// Frame width in pixels.
    #[arg(long, default_value_t = 320)]
    width: u32,
    /// Frame height in pixels.
    #[arg(long, default_value_t = 240)]
    height: u32,
    /// Extra bytes appended to every source row.
    #[arg(long, default_value_t = 16)]
    stride_padding: usize,
    /// Frames per second produced by the synthetic source.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Render viewport as WIDTHxHEIGHT.
    #[arg(long, default_value = "1280x720")]
    viewport: String,
    /// Directory holding model assets (overrides configuration).
    #[arg(long, env = "OVERLAY_MODEL_DIR")]
    model_dir: Option<PathBuf>,
    /// Use the built-in stub engine instead of loading a model.
    #[arg(long)]
    stub: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }
    if args.width == 0 || args.height == 0 {
        return Err(anyhow!("frame dimensions must be non-zero"));
    }
    let viewport = parse_viewport(&args.viewport)?;

    let mut cfg = OverlayConfig::load()?;
    if let Some(dir) = &args.model_dir {
        cfg.model_dir = dir.clone();
    }

    let detector = if args.stub {
        Detector::with_engine(cfg.detector.clone(), StubEngine::new())
    } else {
        Detector::from_bundle(cfg.detector.clone(), &ModelBundle::new(&cfg.model_dir))
    };
    if let Some(err) = detector.load_error() {
        log::warn!("continuing without detections: {}", err);
    }

    let (handle, mut renderer) = overlay::channel(cfg.style);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("error setting Ctrl-C handler")?;
    }

    let producer = {
        let running = running.clone();
        let pipeline = FramePipeline::new(detector);
        let source = SyntheticSource::new(args.width, args.height, args.stride_padding);
        let interval = Duration::from_secs_f64(1.0 / args.fps as f64);
        let frames = args.frames;
        thread::spawn(move || produce(pipeline, source, handle, frames, interval, running))
    };

    log::info!(
        "overlay_demo: {} frames {}x{} -> viewport {}x{}",
        args.frames,
        args.width,
        args.height,
        viewport.width,
        viewport.height
    );

    let mut canvas = DrawList::new();
    let mut repaints = 0u64;
    loop {
        let producer_done = producer.is_finished();
        if renderer.poll() {
            renderer.paint(viewport, &mut canvas);
            println!("{}", serde_json::to_string(canvas.ops())?);
            repaints += 1;
        }
        if producer_done || !running.load(Ordering::SeqCst) {
            break;
        }
        thread::sleep(RENDER_INTERVAL);
    }

    running.store(false, Ordering::SeqCst);
    producer
        .join()
        .map_err(|_| anyhow!("producer thread panicked"))?;
    log::info!("overlay_demo: {} repaints", repaints);
    Ok(())
}

fn produce(
    mut pipeline: FramePipeline,
    mut source: SyntheticSource,
    handle: OverlayHandle,
    frames: u32,
    interval: Duration,
    running: Arc<AtomicBool>,
) {
    for _ in 0..frames {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let frame = source.next_frame();
        let records = pipeline.detect(&frame, source.width, source.height, source.row_stride());
        log::debug!("frame {}: {} detections", source.frame_count, records.len());
        if records.is_empty() {
            handle.clear();
        } else {
            handle.update_detections(&records);
        }
        thread::sleep(interval);
    }
    handle.clear();
}

fn parse_viewport(raw: &str) -> Result<Viewport> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("viewport must look like 1280x720, got '{}'", raw))?;
    let width: f32 = w.trim().parse().context("invalid viewport width")?;
    let height: f32 = h.trim().parse().context("invalid viewport height")?;
    if !(width > 0.0 && height > 0.0) {
        return Err(anyhow!("viewport dimensions must be positive"));
    }
    Ok(Viewport::new(width, height))
}

/// Synthetic RGBA frames: dark background with a bright block that slides
/// left to right and hides every fifth frame.
struct SyntheticSource {
    width: u32,
    height: u32,
    padding: usize,
    frame_count: u64,
}

impl SyntheticSource {
    fn new(width: u32, height: u32, padding: usize) -> Self {
        Self {
            width,
            height,
            padding,
            frame_count: 0,
        }
    }

    fn row_stride(&self) -> usize {
        self.width as usize * 4 + self.padding
    }

    fn next_frame(&mut self) -> Vec<u8> {
        self.frame_count += 1;
        let stride = self.row_stride();
        let mut pixels = vec![0u8; stride * self.height as usize];

        for row in pixels.chunks_exact_mut(stride) {
            for px in row[..self.width as usize * 4].chunks_exact_mut(4) {
                px.copy_from_slice(&[24, 24, 32, 255]);
            }
        }

        if self.frame_count % 5 == 0 {
            return pixels;
        }

        let block_w = (self.width / 4).max(1);
        let block_h = (self.height / 2).max(1);
        let travel = (self.width - block_w).max(1) as u64;
        let left = ((self.frame_count * 7) % travel) as usize;
        let top = (self.height / 4) as usize;
        for y in top..(top + block_h as usize).min(self.height as usize) {
            let row = &mut pixels[y * stride..y * stride + self.width as usize * 4];
            for x in left..(left + block_w as usize).min(self.width as usize) {
                row[x * 4..x * 4 + 4].copy_from_slice(&[240, 240, 240, 255]);
            }
        }
        pixels
    }
}
