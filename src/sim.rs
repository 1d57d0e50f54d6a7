//! Simulation engine capabilities consumed by the stream driver.
//!
//! The engine itself lives outside this crate. The driver receives an
//! already-initialized `Simulator` and `Renderer` and never reaches for
//! process-wide state, so the engine can be swapped for the synthetic one or a
//! test double.

use std::path::Path;

use anyhow::Result;

use crate::config::AnnotatorKind;
use crate::frame::Frame;

/// Read-only view of the active scene.
pub trait Scene {
    /// Scene identifier for logging.
    fn name(&self) -> &str;

    /// Returns true when a camera prim exists at `path`.
    fn has_camera(&self, path: &str) -> bool;
}

/// Scene lifecycle of a simulator instance.
pub trait Simulator {
    /// The currently loaded scene, if any.
    fn active_scene(&self) -> Option<&dyn Scene>;

    /// Open a scene resource. `path` is already absolute.
    fn open_scene(&mut self, path: &Path) -> Result<()>;

    /// Release the simulator instance. Called once during cleanup.
    fn close(&mut self) -> Result<()>;
}

/// Off-screen buffer bound to a camera at a fixed resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderTarget {
    pub id: u64,
    pub camera_path: String,
    pub width: u32,
    pub height: u32,
}

/// Handle to an annotator obtained from the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotatorHandle {
    pub id: u64,
    pub kind: AnnotatorKind,
}

/// Rendering and stepping surface of the engine.
pub trait Renderer {
    /// Create a render target for `camera_path` at `width`x`height`.
    fn create_render_target(
        &mut self,
        camera_path: &str,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget>;

    /// Look up an annotator by kind. Fails when the kind is unsupported.
    fn annotator(&mut self, kind: AnnotatorKind) -> Result<AnnotatorHandle>;

    /// Attach an annotator to a render target.
    fn attach(&mut self, annotator: &AnnotatorHandle, target: &RenderTarget) -> Result<()>;

    /// Advance the simulation by exactly one step. Blocks until done.
    fn step(&mut self) -> Result<()>;

    /// Latest frame produced by `annotator` for the current step.
    fn latest_frame(&mut self, annotator: &AnnotatorHandle) -> Result<Frame>;
}
