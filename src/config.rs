use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_ENV: &str = "SIM_STREAM_CONFIG";

const DEFAULT_WIDTH: u32 = 1920;
const DEFAULT_HEIGHT: u32 = 1080;
const DEFAULT_FPS: u32 = 60;
pub const DEFAULT_CAMERA_PATH: &str =
    "/World/alfred_parent_prim/alfred_base_descr/chest_cam_rgb_camera_frame/chest_cam";
const DEFAULT_URL: &str = "rtsp://mediamtx:8554/stream";
const DEFAULT_ENCODER_PROGRAM: &str = "ffmpeg";
const DEFAULT_ENCODER_CODEC: &str = "h264_nvenc";
const DEFAULT_ENCODER_PRESET: &str = "fast";

/// Simulation output channel streamed to the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotatorKind {
    Rgb,
    Normals,
    #[serde(rename = "bounding_box_3d")]
    BoundingBox3d,
    MotionVectors,
}

impl AnnotatorKind {
    pub const ALL: [AnnotatorKind; 4] = [
        AnnotatorKind::Rgb,
        AnnotatorKind::Normals,
        AnnotatorKind::BoundingBox3d,
        AnnotatorKind::MotionVectors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotatorKind::Rgb => "rgb",
            AnnotatorKind::Normals => "normals",
            AnnotatorKind::BoundingBox3d => "bounding_box_3d",
            AnnotatorKind::MotionVectors => "motion_vectors",
        }
    }
}

impl fmt::Display for AnnotatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        AnnotatorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| {
                anyhow!(
                    "unknown annotator '{}' (expected rgb, normals, bounding_box_3d or motion_vectors)",
                    s
                )
            })
    }
}

/// RTSP transport used by the encoder when publishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Udp,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Udp => "udp",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "tcp" => Ok(TransportKind::Tcp),
            "udp" => Ok(TransportKind::Udp),
            other => Err(anyhow!("unknown transport '{}' (expected tcp or udp)", other)),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    camera_path: Option<String>,
    annotator: Option<AnnotatorKind>,
    transport: Option<TransportKind>,
    url: Option<String>,
    scene_path: Option<PathBuf>,
    encoder: Option<EncoderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct EncoderConfigFile {
    program: Option<String>,
    codec: Option<String>,
    preset: Option<String>,
}

/// Immutable stream configuration, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub camera_path: String,
    pub annotator: AnnotatorKind,
    pub transport: TransportKind,
    pub url: String,
    pub scene_path: Option<PathBuf>,
    pub encoder: EncoderSettings,
}

/// External encoder program and its hardware encode settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub program: String,
    pub codec: String,
    pub preset: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_ENCODER_PROGRAM.to_string(),
            codec: DEFAULT_ENCODER_CODEC.to_string(),
            preset: DEFAULT_ENCODER_PRESET.to_string(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            camera_path: DEFAULT_CAMERA_PATH.to_string(),
            annotator: AnnotatorKind::Rgb,
            transport: TransportKind::Tcp,
            url: DEFAULT_URL.to_string(),
            scene_path: None,
            encoder: EncoderSettings::default(),
        }
    }
}

impl StreamConfig {
    /// Loads defaults, then the config file (explicit path or `SIM_STREAM_CONFIG`),
    /// then environment overrides.
    ///
    /// Validation is left to the caller so command-line overrides can be
    /// applied first.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => StreamConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn from_file(file: StreamConfigFile) -> Self {
        let defaults = Self::default();
        let encoder = file.encoder.unwrap_or_default();
        Self {
            width: file.width.unwrap_or(defaults.width),
            height: file.height.unwrap_or(defaults.height),
            fps: file.fps.unwrap_or(defaults.fps),
            camera_path: file.camera_path.unwrap_or(defaults.camera_path),
            annotator: file.annotator.unwrap_or(defaults.annotator),
            transport: file.transport.unwrap_or(defaults.transport),
            url: file.url.unwrap_or(defaults.url),
            scene_path: file.scene_path,
            encoder: EncoderSettings {
                program: encoder.program.unwrap_or(defaults.encoder.program),
                codec: encoder.codec.unwrap_or(defaults.encoder.codec),
                preset: encoder.preset.unwrap_or(defaults.encoder.preset),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(width) = env_u32("SIM_STREAM_WIDTH")? {
            self.width = width;
        }
        if let Some(height) = env_u32("SIM_STREAM_HEIGHT")? {
            self.height = height;
        }
        if let Some(fps) = env_u32("SIM_STREAM_FPS")? {
            self.fps = fps;
        }
        if let Some(camera) = env_string("SIM_STREAM_CAMERA") {
            self.camera_path = camera;
        }
        if let Some(annotator) = env_string("SIM_STREAM_ANNOTATOR") {
            self.annotator = annotator.parse()?;
        }
        if let Some(transport) = env_string("SIM_STREAM_TRANSPORT") {
            self.transport = transport.parse()?;
        }
        if let Some(url) = env_string("SIM_STREAM_URL") {
            self.url = url;
        }
        if let Some(scene) = env_string("SIM_STREAM_SCENE") {
            self.scene_path = Some(PathBuf::from(scene));
        }
        if let Some(program) = env_string("SIM_STREAM_ENCODER") {
            self.encoder.program = program;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!("resolution must be non-zero"));
        }
        // yuv420 output needs even dimensions
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(anyhow!(
                "resolution {}x{} must have even dimensions",
                self.width,
                self.height
            ));
        }
        if self.fps == 0 {
            return Err(anyhow!("fps must be >= 1"));
        }
        if self.camera_path.trim().is_empty() {
            return Err(anyhow!("camera path must not be empty"));
        }
        if self.url.trim().is_empty() {
            return Err(anyhow!("destination url must not be empty"));
        }
        if self.encoder.program.trim().is_empty() {
            return Err(anyhow!("encoder program must not be empty"));
        }
        Ok(())
    }

    /// Size in bytes of one BGR24 frame written to the encoder.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

fn read_config_file(path: &Path) -> Result<StreamConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match env_string(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", key)),
        None => Ok(None),
    }
}
