//! sim_stream - stream simulator frames to an RTSP server through ffmpeg
//!
//! This binary:
//! 1. Loads the stream configuration (file, environment, flags)
//! 2. Opens the synthetic simulator and binds a render target to the camera
//! 3. Launches ffmpeg and writes one BGR24 frame per simulation step
//! 4. Stops on Ctrl-C (or after --frames) and tears everything down

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use sim_stream::{
    AnnotatorKind, ProcessLauncher, ShutdownSignal, StreamConfig, StreamDriver, SyntheticRenderer,
    SyntheticSimulator, TransportKind,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stream simulation frames to an RTSP endpoint")]
struct Args {
    /// Config file (TOML when the extension is .toml, JSON otherwise).
    #[arg(long, env = "SIM_STREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Frame width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Encoder frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Camera prim path in the scene.
    #[arg(long)]
    camera: Option<String>,

    /// Annotator to stream: rgb, normals, bounding_box_3d, motion_vectors.
    #[arg(long)]
    annotator: Option<AnnotatorKind>,

    /// RTSP transport: tcp or udp.
    #[arg(long)]
    transport: Option<TransportKind>,

    /// Destination RTSP URL.
    #[arg(long)]
    url: Option<String>,

    /// Scene file to load before streaming.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Encoder executable.
    #[arg(long)]
    encoder: Option<String>,

    /// Stop after this many frames instead of running until Ctrl-C.
    #[arg(long)]
    frames: Option<u64>,

    /// Pace synthetic simulation steps to the configured frame rate.
    #[arg(long)]
    pace: bool,
}

impl Args {
    fn apply(&self, cfg: &mut StreamConfig) {
        if let Some(width) = self.width {
            cfg.width = width;
        }
        if let Some(height) = self.height {
            cfg.height = height;
        }
        if let Some(fps) = self.fps {
            cfg.fps = fps;
        }
        if let Some(camera) = &self.camera {
            cfg.camera_path = camera.clone();
        }
        if let Some(annotator) = self.annotator {
            cfg.annotator = annotator;
        }
        if let Some(transport) = self.transport {
            cfg.transport = transport;
        }
        if let Some(url) = &self.url {
            cfg.url = url.clone();
        }
        if let Some(scene) = &self.scene {
            cfg.scene_path = Some(scene.clone());
        }
        if let Some(encoder) = &self.encoder {
            cfg.encoder.program = encoder.clone();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = StreamConfig::load(args.config.as_deref())?;
    args.apply(&mut cfg);
    cfg.validate().context("invalid stream configuration")?;

    log::info!(
        "sim_stream {}: {}x{} @ {} fps, annotator={}, camera={}",
        env!("CARGO_PKG_VERSION"),
        cfg.width,
        cfg.height,
        cfg.fps,
        cfg.annotator,
        cfg.camera_path
    );

    let shutdown = ShutdownSignal::new();
    shutdown.install_ctrlc()?;

    let mut renderer = SyntheticRenderer::new();
    if args.pace {
        renderer = renderer.with_pace(Duration::from_secs_f64(1.0 / f64::from(cfg.fps)));
    }

    let mut launcher = ProcessLauncher;
    let mut driver = StreamDriver::setup(cfg, SyntheticSimulator::new(), renderer, &mut launcher)?;
    if let Some(frames) = args.frames {
        driver = driver.with_frame_limit(frames);
    }

    let summary = driver.stream(&shutdown)?;
    log::info!(
        "streamed {} frames ({} MiB) in {:.2}s, mean step {:.2}ms, mean frame {:.2}ms",
        summary.frames,
        summary.bytes / (1024 * 1024),
        summary.elapsed.as_secs_f64(),
        summary.mean_step.as_secs_f64() * 1000.0,
        summary.mean_frame.as_secs_f64() * 1000.0
    );
    Ok(())
}
