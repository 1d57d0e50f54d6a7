use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use sim_stream::config::{StreamConfig, CONFIG_ENV};
use sim_stream::{AnnotatorKind, TransportKind};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        CONFIG_ENV,
        "SIM_STREAM_WIDTH",
        "SIM_STREAM_HEIGHT",
        "SIM_STREAM_FPS",
        "SIM_STREAM_CAMERA",
        "SIM_STREAM_ANNOTATOR",
        "SIM_STREAM_TRANSPORT",
        "SIM_STREAM_URL",
        "SIM_STREAM_SCENE",
        "SIM_STREAM_ENCODER",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = StreamConfig::load(None).expect("load config");
    assert_eq!(cfg, StreamConfig::default());
    assert_eq!(cfg.url, "rtsp://mediamtx:8554/stream");
    assert_eq!((cfg.width, cfg.height, cfg.fps), (1920, 1080, 60));
    assert!(cfg.scene_path.is_none());
}

#[test]
fn loads_json_config_from_env_with_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "width": 1280,
        "height": 720,
        "fps": 30,
        "camera_path": "/World/cam",
        "annotator": "normals",
        "transport": "udp",
        "url": "rtsp://localhost:8554/sim",
        "scene_path": "/scenes/warehouse.usd",
        "encoder": { "codec": "libx264", "preset": "ultrafast" }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var(CONFIG_ENV, file.path());
    std::env::set_var("SIM_STREAM_FPS", "24");
    std::env::set_var("SIM_STREAM_ANNOTATOR", "motion_vectors");

    let cfg = StreamConfig::load(None).expect("load config");

    assert_eq!(cfg.width, 1280);
    assert_eq!(cfg.height, 720);
    assert_eq!(cfg.fps, 24);
    assert_eq!(cfg.camera_path, "/World/cam");
    assert_eq!(cfg.annotator, AnnotatorKind::MotionVectors);
    assert_eq!(cfg.transport, TransportKind::Udp);
    assert_eq!(cfg.url, "rtsp://localhost:8554/sim");
    assert_eq!(cfg.scene_path, Some(PathBuf::from("/scenes/warehouse.usd")));
    assert_eq!(cfg.encoder.program, "ffmpeg");
    assert_eq!(cfg.encoder.codec, "libx264");
    assert_eq!(cfg.encoder.preset, "ultrafast");
    cfg.validate().expect("valid");

    clear_env();
}

#[test]
fn explicit_toml_path_wins_over_env_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut toml_file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    writeln!(toml_file, "width = 640\nheight = 480\ntransport = \"tcp\"").expect("write config");
    std::env::set_var(CONFIG_ENV, "/nonexistent/config.json");

    let cfg = StreamConfig::load(Some(toml_file.path())).expect("load config");
    assert_eq!((cfg.width, cfg.height), (640, 480));
    assert_eq!(cfg.fps, 60);

    clear_env();
}

#[test]
fn empty_env_values_are_ignored() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SIM_STREAM_URL", "  ");
    std::env::set_var("SIM_STREAM_WIDTH", "");
    let cfg = StreamConfig::load(None).expect("load config");
    assert_eq!(cfg.url, StreamConfig::default().url);
    assert_eq!(cfg.width, 1920);

    clear_env();
}

#[test]
fn malformed_values_are_errors() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SIM_STREAM_HEIGHT", "tall");
    assert!(StreamConfig::load(None).is_err());
    clear_env();

    std::env::set_var("SIM_STREAM_TRANSPORT", "quic");
    assert!(StreamConfig::load(None).is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "annotator": "depth" }"#)
        .expect("write config");
    assert!(StreamConfig::load(Some(file.path())).is_err());

    assert!(StreamConfig::load(Some(std::path::Path::new("/nonexistent/stream.json"))).is_err());

    clear_env();
}

#[test]
fn annotator_names_match_across_file_formats() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    for kind in AnnotatorKind::ALL {
        let mut json = NamedTempFile::new().expect("temp config");
        write!(json, r#"{{ "annotator": "{}" }}"#, kind.as_str()).expect("write config");
        let cfg = StreamConfig::load(Some(json.path())).expect("load json config");
        assert_eq!(cfg.annotator, kind, "json {}", kind);

        let mut toml_file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config");
        writeln!(toml_file, "annotator = \"{}\"", kind.as_str()).expect("write config");
        let cfg = StreamConfig::load(Some(toml_file.path())).expect("load toml config");
        assert_eq!(cfg.annotator, kind, "toml {}", kind);
    }

    clear_env();
}
