//! Simulation frame streaming.
//!
//! This crate pumps rendered frames from a running simulation into an external
//! video encoder (ffmpeg) that publishes them over RTSP.
//!
//! # Architecture
//!
//! - [`sim`]: capabilities the engine must provide (`Simulator`, `Renderer`).
//! - [`sink`]: the `FrameSink` the frames are written to.
//! - [`encoder`]: the ffmpeg invocation and child process implementing `FrameSink`.
//! - [`driver`]: `StreamDriver`, which owns all of the above and runs
//!   setup, the step/fetch/convert/write loop, and cleanup.
//! - [`synthetic`]: an engine stand-in producing test patterns.
//!
//! The driver is single-threaded and blocking. It never buffers more than one
//! frame, never retries, and never drops frames: a slow encoder slows the
//! simulation down.

pub mod config;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod signal;
pub mod sim;
pub mod sink;
pub mod synthetic;

pub use config::{AnnotatorKind, EncoderSettings, StreamConfig, TransportKind};
pub use driver::{StopReason, StreamDriver, StreamSummary};
pub use encoder::{EncoderInvocation, EncoderProcess, ProcessLauncher};
pub use error::StreamError;
pub use frame::{Frame, PixelLayout};
pub use metrics::{FrameTiming, StreamMetrics, ThroughputReport, REPORT_INTERVAL};
pub use signal::ShutdownSignal;
pub use sim::{AnnotatorHandle, RenderTarget, Renderer, Scene, Simulator};
pub use sink::{FrameSink, SinkLauncher};
pub use synthetic::{SyntheticRenderer, SyntheticScene, SyntheticSimulator};
