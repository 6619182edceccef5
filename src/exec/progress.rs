// src/exec/progress.rs

//! Synthetic progress for an executable that reports none.
//!
//! The runner emits fixed checkpoints while it prepares the process, then a
//! background ticker nudges the estimate forward at a fixed interval until
//! the process exits. The contract for consumers is only that samples stay
//! in `[0, 1]`, never decrease within a run, and that `1.0` is emitted only
//! once the process has exited without being cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A progress fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ProgressSample(f64);

impl ProgressSample {
    pub const ZERO: ProgressSample = ProgressSample(0.0);
    pub const COMPLETE: ProgressSample = ProgressSample(1.0);

    /// Clamp into `[0, 1]`; NaN maps to zero.
    pub fn new(fraction: f64) -> Self {
        if fraction.is_nan() {
            return Self::ZERO;
        }
        Self(fraction.clamp(0.0, 1.0))
    }

    pub fn fraction(self) -> f64 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self.0 >= 1.0
    }
}

/// Receiver side of progress reports.
///
/// Implementations must not block; reports come from the ticker task as
/// well as from the runner itself.
pub trait ProgressSink: Send + Sync {
    fn report(&self, sample: ProgressSample);
}

impl ProgressSink for mpsc::UnboundedSender<ProgressSample> {
    fn report(&self, sample: ProgressSample) {
        // Receiver gone means nobody is watching; not an error for the run.
        let _ = self.send(sample);
    }
}

/// Sink that drops every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _sample: ProgressSample) {}
}

/// Checkpoints and ticker parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSettings {
    /// Reported once the executable has been resolved.
    pub init: f64,
    /// Reported once the argument list is assembled.
    pub args_ready: f64,
    /// Reported right after the process starts; the ticker starts here.
    pub process_started: f64,
    pub increment: f64,
    /// The ticker never goes past this.
    pub max_incremental: f64,
    pub tick_interval: Duration,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            init: 0.1,
            args_ready: 0.2,
            process_started: 0.3,
            increment: 0.02,
            max_incremental: 0.95,
            tick_interval: Duration::from_millis(200),
        }
    }
}

impl ProgressSettings {
    /// Human-readable stage for a fraction, as shown in the status line.
    pub fn stage_label(&self, fraction: f64) -> &'static str {
        if fraction < self.process_started {
            "Preparing..."
        } else if fraction < self.max_incremental {
            "Processing..."
        } else {
            "Finalizing..."
        }
    }

    /// Next ticker estimate after `current`.
    pub fn next_tick(&self, current: f64) -> f64 {
        (current + self.increment).min(self.max_incremental)
    }
}

/// Spawn the ticker.
///
/// It stops as soon as `stop` is cancelled and never reports after that;
/// callers await the returned handle before emitting anything else so no
/// tick can land after a final sample.
pub fn spawn_ticker(
    settings: ProgressSettings,
    stop: CancellationToken,
    sink: Arc<dyn ProgressSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current = settings.process_started;
        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(settings.tick_interval) => {}
            }
            if stop.is_cancelled() {
                break;
            }
            current = settings.next_tick(current);
            trace!(fraction = current, "progress tick");
            sink.report(ProgressSample::new(current));
        }
    })
}

/// Parse a simple duration string like `"200ms"`, `"3s"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
