//! Structured logging helpers for the startup sequence.

use std::fmt::Display;
use std::time::{Duration, Instant};

const RULE: &str = "═══════════════════════════════════════════════════";

/// Times one startup phase and logs how long it took.
///
/// ```rust,ignore
/// let timer = PhaseTimer::start("load_vms");
/// let vms = store::load_vms(&path).await;
/// timer.finish_with(vms.as_ref());
/// ```
#[derive(Debug)]
pub struct PhaseTimer {
    phase: &'static str,
    started: Instant,
}

impl PhaseTimer {
    #[must_use]
    pub fn start(phase: &'static str) -> Self {
        tracing::debug!(phase, "Phase started");
        Self {
            phase,
            started: Instant::now(),
        }
    }

    /// Log the elapsed time and return it.
    pub fn finish(self) -> Duration {
        let elapsed = self.started.elapsed();
        tracing::info!(
            phase = self.phase,
            duration_ms = elapsed.as_millis(),
            "Phase completed"
        );
        elapsed
    }

    /// Like [`finish`](Self::finish), but logs a failed `outcome` at error
    /// level together with its error.
    pub fn finish_with<T, E: Display>(self, outcome: Result<&T, &E>) -> Duration {
        let elapsed = self.started.elapsed();
        match outcome {
            Ok(_) => tracing::info!(
                phase = self.phase,
                duration_ms = elapsed.as_millis(),
                "Phase completed"
            ),
            Err(e) => tracing::error!(
                phase = self.phase,
                duration_ms = elapsed.as_millis(),
                error = %e,
                "Phase failed"
            ),
        }
        elapsed
    }
}

/// Numbered progress log for a startup sequence of known length.
#[derive(Debug)]
pub struct StartupLog {
    total: usize,
    done: usize,
}

impl StartupLog {
    /// Log a framed banner and prepare to count `total` steps.
    pub fn begin(total: usize, title: impl Display, subtitle: impl Display) -> Self {
        tracing::info!("{RULE}");
        tracing::info!("  {title}");
        tracing::info!("  {subtitle}");
        tracing::info!("{RULE}");
        Self { total, done: 0 }
    }

    /// Log the next step as `[n/total] name - detail`.
    pub fn step(&mut self, name: &str, detail: impl Display) {
        self.done += 1;
        tracing::info!(
            step = self.done,
            total = self.total,
            "[{}/{}] {name} - {detail}",
            self.done,
            self.total
        );
    }

    /// Log completion; warns if fewer steps ran than announced.
    pub fn ready(self, message: &str) {
        if self.done != self.total {
            tracing::warn!(done = self.done, total = self.total, "Startup step count mismatch");
        }
        tracing::info!("✅ {message}");
    }

    pub fn steps_done(&self) -> usize {
        self.done
    }
}
