//! Per-frame timing and running throughput.
//!
//! Timing is observational only: slow steps are reported, never acted on.

use std::time::{Duration, Instant};

/// Frames between throughput reports.
pub const REPORT_INTERVAL: u64 = 100;

/// Timing of a single loop iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTiming {
    /// Time spent inside the simulator step.
    pub step: Duration,
    /// Step, fetch, conversion and write together.
    pub total: Duration,
}

/// Throughput since the loop started.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThroughputReport {
    pub frames: u64,
    pub elapsed: Duration,
    pub fps: f64,
}

/// Running counters for one streaming session.
#[derive(Debug)]
pub struct StreamMetrics {
    started: Instant,
    frames: u64,
    bytes: u64,
    step_total: Duration,
    frame_total: Duration,
    reports: u64,
}

impl StreamMetrics {
    pub fn start(now: Instant) -> Self {
        Self {
            started: now,
            frames: 0,
            bytes: 0,
            step_total: Duration::ZERO,
            frame_total: Duration::ZERO,
            reports: 0,
        }
    }

    /// Count a written frame. Returns a report on every `REPORT_INTERVAL`th frame.
    pub fn record(
        &mut self,
        now: Instant,
        timing: FrameTiming,
        bytes: usize,
    ) -> Option<ThroughputReport> {
        self.frames += 1;
        self.bytes += bytes as u64;
        self.step_total += timing.step;
        self.frame_total += timing.total;

        if self.frames % REPORT_INTERVAL != 0 {
            return None;
        }
        self.reports += 1;
        let elapsed = now.saturating_duration_since(self.started);
        let secs = elapsed.as_secs_f64();
        let fps = if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        };
        Some(ThroughputReport {
            frames: self.frames,
            elapsed,
            fps,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn reports(&self) -> u64 {
        self.reports
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn mean_step(&self) -> Duration {
        mean(self.step_total, self.frames)
    }

    pub fn mean_frame(&self) -> Duration {
        mean(self.frame_total, self.frames)
    }
}

fn mean(total: Duration, count: u64) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}

pub(crate) fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
