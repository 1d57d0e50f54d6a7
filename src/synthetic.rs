//! Synthetic simulator for running the stream without a real engine.
//!
//! `SyntheticSimulator` holds a scene with a fixed set of camera paths and can
//! load further scenes from small TOML descriptions:
//!
//! ```toml
//! name = "warehouse"
//! cameras = ["/World/robot/chest_cam"]
//! ```
//!
//! `SyntheticRenderer` produces RGBA test patterns that move every step.
//! It does not implement the `bounding_box_3d` annotator.

use std::collections::HashMap;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::config::{AnnotatorKind, DEFAULT_CAMERA_PATH};
use crate::frame::{Frame, PixelLayout};
use crate::sim::{AnnotatorHandle, RenderTarget, Renderer, Scene, Simulator};

/// Scene description with a name and the camera prims it contains.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SyntheticScene {
    pub name: String,
    #[serde(default)]
    pub cameras: Vec<String>,
}

impl SyntheticScene {
    pub fn new(name: impl Into<String>, cameras: Vec<String>) -> Self {
        Self {
            name: name.into(),
            cameras,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid scene file {}", path.display()))
    }
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self::new("synthetic", vec![DEFAULT_CAMERA_PATH.to_string()])
    }
}

impl Scene for SyntheticScene {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_camera(&self, path: &str) -> bool {
        self.cameras.iter().any(|camera| camera == path)
    }
}

#[derive(Debug, Default)]
pub struct SyntheticSimulator {
    scene: Option<SyntheticScene>,
    closed: bool,
}

impl SyntheticSimulator {
    /// Simulator with the built-in scene active.
    pub fn new() -> Self {
        Self::with_scene(SyntheticScene::default())
    }

    pub fn with_scene(scene: SyntheticScene) -> Self {
        Self {
            scene: Some(scene),
            closed: false,
        }
    }

    /// Simulator with no scene loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Simulator for SyntheticSimulator {
    fn active_scene(&self) -> Option<&dyn Scene> {
        self.scene.as_ref().map(|scene| scene as &dyn Scene)
    }

    fn open_scene(&mut self, path: &Path) -> Result<()> {
        if self.closed {
            bail!("simulator is closed");
        }
        let scene = SyntheticScene::from_file(path)?;
        log::info!(
            "synthetic scene '{}' loaded with {} cameras",
            scene.name,
            scene.cameras.len()
        );
        self.scene = Some(scene);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            bail!("simulator already closed");
        }
        self.closed = true;
        self.scene = None;
        Ok(())
    }
}

/// Renderer producing moving RGBA patterns.
#[derive(Debug, Default)]
pub struct SyntheticRenderer {
    next_id: u64,
    bindings: HashMap<u64, RenderTarget>,
    frame_index: u64,
    pace: Option<Duration>,
    last_step: Option<Instant>,
}

impl SyntheticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep so that consecutive steps are at least `interval` apart.
    pub fn with_pace(mut self, interval: Duration) -> Self {
        self.pace = Some(interval);
        self
    }

    pub fn steps(&self) -> u64 {
        self.frame_index
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn render(&self, kind: AnnotatorKind, width: u32, height: u32) -> Vec<u8> {
        let t = self.frame_index;
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height as u64 {
            for x in 0..width as u64 {
                let rgb = match kind {
                    AnnotatorKind::Normals => [
                        (x * 255 / width.max(1) as u64) as u8,
                        (y * 255 / height.max(1) as u64) as u8,
                        255,
                    ],
                    AnnotatorKind::MotionVectors => {
                        let stripe = if ((x + t) / 16) % 2 == 0 { 200 } else { 40 };
                        [stripe, 128, 128]
                    }
                    _ => [(x + t) as u8, (y + t) as u8, (t * 2) as u8],
                };
                pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
            }
        }
        pixels
    }
}

impl Renderer for SyntheticRenderer {
    fn create_render_target(
        &mut self,
        camera_path: &str,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget> {
        if width == 0 || height == 0 {
            bail!("render target resolution must be non-zero");
        }
        Ok(RenderTarget {
            id: self.allocate_id(),
            camera_path: camera_path.to_string(),
            width,
            height,
        })
    }

    fn annotator(&mut self, kind: AnnotatorKind) -> Result<AnnotatorHandle> {
        if kind == AnnotatorKind::BoundingBox3d {
            bail!("annotator '{}' is not supported by the synthetic renderer", kind);
        }
        Ok(AnnotatorHandle {
            id: self.allocate_id(),
            kind,
        })
    }

    fn attach(&mut self, annotator: &AnnotatorHandle, target: &RenderTarget) -> Result<()> {
        self.bindings.insert(annotator.id, target.clone());
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        if let (Some(pace), Some(last)) = (self.pace, self.last_step) {
            let since = last.elapsed();
            if since < pace {
                thread::sleep(pace - since);
            }
        }
        self.last_step = Some(Instant::now());
        self.frame_index += 1;
        Ok(())
    }

    fn latest_frame(&mut self, annotator: &AnnotatorHandle) -> Result<Frame> {
        let target = self
            .bindings
            .get(&annotator.id)
            .ok_or_else(|| anyhow!("annotator {} is not attached", annotator.id))?;
        let pixels = self.render(annotator.kind, target.width, target.height);
        Frame::new(target.width, target.height, PixelLayout::Rgba8, pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_scene_contains_default_camera() {
        let sim = SyntheticSimulator::new();
        let scene = sim.active_scene().expect("scene");
        assert!(scene.has_camera(DEFAULT_CAMERA_PATH));
        assert!(!scene.has_camera("/World/missing"));
    }

    #[test]
    fn loads_scene_from_toml() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "name = \"warehouse\"\ncameras = [\"/World/cam_a\", \"/World/cam_b\"]")?;

        let mut sim = SyntheticSimulator::empty();
        assert!(sim.active_scene().is_none());
        sim.open_scene(file.path())?;
        let scene = sim.active_scene().expect("scene");
        assert_eq!(scene.name(), "warehouse");
        assert!(scene.has_camera("/World/cam_b"));
        Ok(())
    }

    #[test]
    fn invalid_scene_file_is_rejected() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "cameras = 3")?;
        let mut sim = SyntheticSimulator::new();
        assert!(sim.open_scene(file.path()).is_err());
        assert!(sim.open_scene(Path::new("/nonexistent/scene.toml")).is_err());
        Ok(())
    }

    #[test]
    fn close_twice_fails() {
        let mut sim = SyntheticSimulator::new();
        sim.close().unwrap();
        assert!(sim.is_closed());
        assert!(sim.close().is_err());
    }

    #[test]
    fn renders_attached_annotator_at_target_size() -> Result<()> {
        let mut renderer = SyntheticRenderer::new();
        let target = renderer.create_render_target(DEFAULT_CAMERA_PATH, 8, 4)?;
        let rgb = renderer.annotator(AnnotatorKind::Rgb)?;
        renderer.attach(&rgb, &target)?;
        renderer.step()?;

        let frame = renderer.latest_frame(&rgb)?;
        assert_eq!((frame.width(), frame.height()), (8, 4));
        assert_eq!(frame.layout(), PixelLayout::Rgba8);
        assert_eq!(frame.as_bytes().len(), 8 * 4 * 4);
        Ok(())
    }

    #[test]
    fn frames_change_between_steps() -> Result<()> {
        let mut renderer = SyntheticRenderer::new();
        let target = renderer.create_render_target(DEFAULT_CAMERA_PATH, 4, 4)?;
        let rgb = renderer.annotator(AnnotatorKind::Rgb)?;
        renderer.attach(&rgb, &target)?;
        renderer.step()?;
        let first = renderer.latest_frame(&rgb)?.into_bgr24();
        renderer.step()?;
        let second = renderer.latest_frame(&rgb)?.into_bgr24();
        assert_ne!(first, second);
        assert_eq!(renderer.steps(), 2);
        Ok(())
    }

    #[test]
    fn bounding_boxes_are_unsupported() {
        let mut renderer = SyntheticRenderer::new();
        assert!(renderer.annotator(AnnotatorKind::BoundingBox3d).is_err());
    }

    #[test]
    fn unattached_annotator_has_no_frame() -> Result<()> {
        let mut renderer = SyntheticRenderer::new();
        let normals = renderer.annotator(AnnotatorKind::Normals)?;
        assert!(renderer.latest_frame(&normals).is_err());
        Ok(())
    }
}
