//! Stream driver.
//!
//! Owns the simulator, the renderer binding and the encoder sink for the
//! whole session:
//!
//! 1. Setup: optional scene load, camera lookup, render target, encoder
//!    launch, annotator attachment.
//! 2. Loop: step, fetch, convert to BGR24, write, record timing.
//! 3. Cleanup: close the encoder input, wait for the encoder, close the
//!    simulator. Runs on every exit path and is idempotent.
//!
//! Everything is single-threaded and blocking. A slow encoder throttles the
//! simulation through pipe backpressure. Cancellation is only observed
//! between frames.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::StreamConfig;
use crate::encoder::EncoderInvocation;
use crate::error::{Result, StreamError};
use crate::frame::Frame;
use crate::metrics::{millis, FrameTiming, StreamMetrics};
use crate::signal::ShutdownSignal;
use crate::sim::{AnnotatorHandle, RenderTarget, Renderer, Simulator};
use crate::sink::{FrameSink, SinkLauncher};

/// Why the streaming loop stopped without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown signal was triggered.
    Cancelled,
    /// The configured frame limit was reached.
    FrameLimit,
}

/// Outcome of a streaming session that ended without a fatal error.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamSummary {
    pub frames: u64,
    pub bytes: u64,
    pub elapsed: Duration,
    pub throughput_reports: u64,
    pub mean_step: Duration,
    pub mean_frame: Duration,
    pub stop_reason: StopReason,
}

/// Owns one simulator, render binding and encoder for a single stream session.
pub struct StreamDriver<S: Simulator, R: Renderer> {
    config: StreamConfig,
    simulator: S,
    renderer: R,
    simulator_open: bool,
    target: Option<RenderTarget>,
    annotator: Option<AnnotatorHandle>,
    sink: Option<Box<dyn FrameSink>>,
    frame_limit: Option<u64>,
}

impl<S: Simulator, R: Renderer> StreamDriver<S, R> {
    /// Acquire every resource needed to stream.
    ///
    /// The driver takes ownership of `simulator` immediately: if any step
    /// fails, whatever was acquired so far is released (including closing
    /// the simulator) before the error is returned.
    pub fn setup(
        config: StreamConfig,
        simulator: S,
        renderer: R,
        launcher: &mut dyn SinkLauncher,
    ) -> Result<Self> {
        let mut driver = Self {
            config,
            simulator,
            renderer,
            simulator_open: true,
            target: None,
            annotator: None,
            sink: None,
            frame_limit: None,
        };
        if let Err(e) = driver.prepare(launcher) {
            log::error!("stream setup failed: {}", e);
            if let Err(cleanup_err) = driver.cleanup() {
                log::warn!("cleanup after failed setup: {}", cleanup_err);
            }
            return Err(e);
        }
        Ok(driver)
    }

    /// Stop after `limit` frames instead of running until cancelled.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn render_target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    /// True once cleanup has released everything.
    pub fn is_closed(&self) -> bool {
        !self.simulator_open && self.sink.is_none()
    }

    fn prepare(&mut self, launcher: &mut dyn SinkLauncher) -> Result<()> {
        self.config
            .validate()
            .map_err(|e| StreamError::Config(format!("{:#}", e)))?;

        if let Some(path) = self.config.scene_path.clone() {
            self.load_scene(&path)?;
        }
        self.resolve_camera()?;

        let target = self
            .renderer
            .create_render_target(&self.config.camera_path, self.config.width, self.config.height)
            .map_err(|e| StreamError::RenderTarget {
                camera: self.config.camera_path.clone(),
                reason: format!("{:#}", e),
            })?;
        log::info!(
            "render target {} bound to {} at {}x{}",
            target.id,
            target.camera_path,
            target.width,
            target.height
        );
        self.target = Some(target);

        let invocation = EncoderInvocation::from_config(&self.config);
        let sink = launcher
            .launch(&invocation)
            .map_err(|source| StreamError::EncoderLaunch {
                program: invocation.program.clone(),
                source,
            })?;
        self.sink = Some(sink);
        log::info!(
            "encoder publishing to {} over {}",
            self.config.url,
            self.config.transport
        );

        self.attach_annotator()
    }

    fn load_scene(&mut self, path: &Path) -> Result<()> {
        let scene_err = |reason: String| StreamError::SceneLoad {
            path: path.to_path_buf(),
            reason,
        };
        let abs_path = std::path::absolute(path).map_err(|e| scene_err(e.to_string()))?;
        log::info!("loading scene {}", abs_path.display());
        self.simulator
            .open_scene(&abs_path)
            .map_err(|e| scene_err(format!("{:#}", e)))?;
        match self.simulator.active_scene() {
            Some(scene) => {
                log::info!("scene '{}' active", scene.name());
                Ok(())
            }
            None => Err(scene_err("no active scene after load".to_string())),
        }
    }

    fn resolve_camera(&self) -> Result<()> {
        let camera = &self.config.camera_path;
        match self.simulator.active_scene() {
            Some(scene) if scene.has_camera(camera) => {
                log::debug!("camera {} found in scene '{}'", camera, scene.name());
                Ok(())
            }
            _ => Err(StreamError::CameraNotFound(camera.clone())),
        }
    }

    fn attach_annotator(&mut self) -> Result<()> {
        let kind = self.config.annotator;
        let annotator_err = |e: anyhow::Error| StreamError::Annotator {
            kind,
            reason: format!("{:#}", e),
        };
        let target = self.target.as_ref().ok_or(StreamError::Closed)?;
        let annotator = self.renderer.annotator(kind).map_err(annotator_err)?;
        self.renderer
            .attach(&annotator, target)
            .map_err(annotator_err)?;
        log::info!("annotator '{}' attached", kind);
        self.annotator = Some(annotator);
        Ok(())
    }

    /// Run the streaming loop, then clean up regardless of the outcome.
    ///
    /// A loop error takes precedence over a cleanup error.
    pub fn stream(mut self, shutdown: &ShutdownSignal) -> Result<StreamSummary> {
        let outcome = self.run(shutdown);
        let cleaned = self.cleanup();
        match outcome {
            Ok(summary) => cleaned.map(|_| summary),
            Err(e) => {
                if let Err(cleanup_err) = cleaned {
                    log::warn!("cleanup after stream error: {}", cleanup_err);
                }
                Err(e)
            }
        }
    }

    /// Run the streaming loop until cancelled, the frame limit is reached, or
    /// a fatal error occurs. Does not clean up.
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<StreamSummary> {
        let annotator = self.annotator.clone().ok_or(StreamError::Closed)?;
        if self.sink.is_none() {
            return Err(StreamError::Closed);
        }

        log::info!("starting stream loop");
        let mut metrics = StreamMetrics::start(Instant::now());

        let stop_reason = loop {
            if shutdown.is_triggered() {
                log::info!("stop requested, leaving stream loop");
                break StopReason::Cancelled;
            }
            if self.frame_limit.is_some_and(|limit| metrics.frames() >= limit) {
                break StopReason::FrameLimit;
            }

            let frame_start = Instant::now();
            self.renderer
                .step()
                .map_err(|e| StreamError::Simulation(format!("step failed: {:#}", e)))?;
            let step = frame_start.elapsed();
            log::debug!("simulation step took {:.2}ms", millis(step));

            let frame = self
                .renderer
                .latest_frame(&annotator)
                .map_err(|e| StreamError::Simulation(format!("frame fetch failed: {:#}", e)))?;
            self.check_geometry(&frame)?;
            let bytes = frame.into_bgr24();

            let sink = self.sink.as_mut().ok_or(StreamError::Closed)?;
            if let Err(source) = sink.write_frame(&bytes) {
                // The encoder may go away together with us on an interrupt.
                if shutdown.is_triggered() {
                    log::info!("encoder input closed during shutdown: {}", source);
                    break StopReason::Cancelled;
                }
                return Err(StreamError::EncoderWrite {
                    frames: metrics.frames(),
                    source,
                });
            }

            let total = frame_start.elapsed();
            log::debug!("total frame processing took {:.2}ms", millis(total));

            let timing = FrameTiming { step, total };
            if let Some(report) = metrics.record(Instant::now(), timing, bytes.len()) {
                log::info!(
                    "processed {} frames | current fps: {:.2}",
                    report.frames,
                    report.fps
                );
            }
        };

        let summary = StreamSummary {
            frames: metrics.frames(),
            bytes: metrics.bytes(),
            elapsed: metrics.elapsed(Instant::now()),
            throughput_reports: metrics.reports(),
            mean_step: metrics.mean_step(),
            mean_frame: metrics.mean_frame(),
            stop_reason,
        };
        log::info!(
            "stream stopped ({:?}) after {} frames in {:.2}s",
            summary.stop_reason,
            summary.frames,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    fn check_geometry(&self, frame: &Frame) -> Result<()> {
        if frame.width() != self.config.width || frame.height() != self.config.height {
            return Err(StreamError::FrameGeometry {
                width: self.config.width,
                height: self.config.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }
        Ok(())
    }

    /// Release the encoder and the simulator.
    ///
    /// Safe to call any number of times and after a partial setup; resources
    /// already released (or never acquired) are skipped.
    pub fn cleanup(&mut self) -> Result<()> {
        let mut failures = Vec::new();
        let mut released = false;

        if let Some(mut sink) = self.sink.take() {
            released = true;
            log::info!("stopping encoder");
            if let Err(e) = sink.close() {
                failures.push(format!("encoder: {}", e));
            }
        }
        self.annotator = None;
        self.target = None;

        if self.simulator_open {
            self.simulator_open = false;
            released = true;
            log::info!("closing simulation");
            if let Err(e) = self.simulator.close() {
                failures.push(format!("simulator: {:#}", e));
            }
        }

        if !failures.is_empty() {
            return Err(StreamError::Cleanup(failures.join("; ")));
        }
        if released {
            log::info!("cleanup complete");
        }
        Ok(())
    }
}

impl<S: Simulator, R: Renderer> Drop for StreamDriver<S, R> {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            log::warn!("cleanup on drop: {}", e);
        }
    }
}
