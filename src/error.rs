//! Error types for the stream driver.
use std::path::PathBuf;

use thiserror::Error;

use crate::config::AnnotatorKind;

/// Fatal stream errors.
///
/// Setup-time variants abort before the first frame. Loop-time variants
/// terminate the streaming loop. Either way cleanup runs before the error
/// reaches the caller.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Scene file could not be opened, or no scene is active afterwards.
    #[error("failed to load scene {path}: {reason}")]
    SceneLoad { path: PathBuf, reason: String },

    /// Camera path does not resolve in the active scene.
    #[error("camera not found at path: {0}")]
    CameraNotFound(String),

    /// Renderer refused to create the render target.
    #[error("failed to create render target for {camera}: {reason}")]
    RenderTarget { camera: String, reason: String },

    /// Encoder process could not be spawned.
    #[error("failed to launch encoder '{program}': {source}")]
    EncoderLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Annotator kind unsupported or attachment failed.
    #[error("annotator '{kind}' unavailable: {reason}")]
    Annotator { kind: AnnotatorKind, reason: String },

    /// Writing a frame to the encoder input failed.
    #[error("encoder write failed after {frames} frames: {source}")]
    EncoderWrite {
        frames: u64,
        #[source]
        source: std::io::Error,
    },

    /// Fetched frame does not match the configured resolution.
    #[error("frame is {actual_width}x{actual_height}, expected {width}x{height}")]
    FrameGeometry {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Engine step or frame fetch failed.
    #[error("simulation error: {0}")]
    Simulation(String),

    /// Releasing a resource during cleanup failed.
    #[error("cleanup failed: {0}")]
    Cleanup(String),

    /// Driver resources were already released.
    #[error("stream is closed")]
    Closed,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;
