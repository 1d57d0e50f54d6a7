use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

/// Shared cancellation flag, checked by the driver between frames.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route Ctrl-C / SIGTERM into this signal. Can only be installed once per process.
    pub fn install_ctrlc(&self) -> Result<()> {
        let triggered = self.triggered.clone();
        ctrlc::set_handler(move || {
            if !triggered.swap(true, Ordering::SeqCst) {
                log::info!("interrupt received, stopping stream after current frame");
            }
        })
        .context("error setting Ctrl-C handler")
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}
