//! ffmpeg encoder process.
//!
//! The encoder reads packed BGR24 frames from stdin, encodes them with the
//! configured hardware codec and publishes the result over RTSP. Resolution,
//! frame rate and pixel format here must stay in lockstep with the render
//! target and the frame conversion in `frame.rs`.

use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::config::StreamConfig;
use crate::sink::{FrameSink, SinkLauncher};

/// Pixel format of every frame written to the encoder.
pub const INPUT_PIXEL_FORMAT: &str = "bgr24";

/// Program and arguments used to start the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl EncoderInvocation {
    pub fn from_config(config: &StreamConfig) -> Self {
        let size = format!("{}x{}", config.width, config.height);
        let rate = config.fps.to_string();
        let args = vec![
            "-y",
            "-f",
            "rawvideo",
            "-vcodec",
            "rawvideo",
            "-pix_fmt",
            INPUT_PIXEL_FORMAT,
            "-s",
            size.as_str(),
            "-r",
            rate.as_str(),
            "-i",
            "-",
            "-an",
            "-c:v",
            config.encoder.codec.as_str(),
            "-preset",
            config.encoder.preset.as_str(),
            "-f",
            "rtsp",
            "-rtsp_transport",
            config.transport.as_str(),
            config.url.as_str(),
        ]
        .into_iter()
        .map(String::from)
        .collect();
        Self {
            program: config.encoder.program.clone(),
            args,
        }
    }

    /// Shell-style rendering for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Running encoder child process with exclusive ownership of its stdin.
pub struct EncoderProcess {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl EncoderProcess {
    pub fn spawn(invocation: &EncoderInvocation) -> io::Result<Self> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        // Own process group: a terminal Ctrl-C must not reach the encoder.
        // It stops on stdin EOF during cleanup.
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn()?;
        let stdin = child.stdin.take();
        log::info!("encoder started (pid {})", child.id());
        Ok(Self {
            child: Some(child),
            stdin,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }
}

impl FrameSink for EncoderProcess {
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "encoder input closed"))?;
        stdin.write_all(bytes)?;
        stdin.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping stdin sends EOF so the encoder can drain and exit.
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if status.success() {
                log::info!("encoder exited cleanly");
            } else {
                log::warn!("encoder exited with {}", status);
            }
        }
        Ok(())
    }
}

impl Drop for EncoderProcess {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to reap encoder process: {}", e);
        }
    }
}

/// Launches `EncoderProcess` children.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessLauncher;

impl SinkLauncher for ProcessLauncher {
    fn launch(&mut self, invocation: &EncoderInvocation) -> io::Result<Box<dyn FrameSink>> {
        log::info!("launching encoder: {}", invocation.command_line());
        Ok(Box::new(EncoderProcess::spawn(invocation)?))
    }
}
