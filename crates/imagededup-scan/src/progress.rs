//! Progress checkpoints for pipeline phases.

use std::path::Path;
use std::sync::Mutex;

use strum::Display;
use tracing::info;

/// A phase of the batch pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Phase {
    #[strum(to_string = "Cleaning up store")]
    Cleanup,
    #[strum(to_string = "Counting files")]
    Count,
    #[strum(to_string = "Analyzing files")]
    Analyze,
    #[strum(to_string = "Finding duplicates")]
    Discover,
    #[strum(to_string = "Processing duplicates")]
    Act,
    #[strum(to_string = "Removing empty folders")]
    Reclaim,
}

impl Phase {
    /// 1-based position in the batch pipeline.
    pub fn number(&self) -> u8 {
        match self {
            Self::Cleanup => 1,
            Self::Count => 2,
            Self::Analyze => 3,
            Self::Discover => 4,
            Self::Act => 5,
            Self::Reclaim => 6,
        }
    }
}

/// Receives progress checkpoints from the pipeline.
///
/// Implementations must be cheap; `tick` is called from analysis workers
/// concurrently. All methods default to no-ops.
pub trait ProgressObserver: Send + Sync {
    /// A phase begins with `total` expected ticks (0 if unknown).
    fn phase_started(&self, _phase: Phase, _total: u64) {}

    /// One unit of work finished.
    fn tick(&self, _phase: Phase, _path: &Path) {}

    /// A phase completed.
    fn phase_finished(&self, _phase: Phase) {}

    /// A phase was disabled by configuration.
    fn phase_skipped(&self, _phase: Phase) {}
}

/// No-op observer for silent operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl ProgressObserver for SilentObserver {}

/// Observer that logs whenever a phase crosses a whole percent.
#[derive(Debug, Default)]
pub struct LogObserver {
    state: Mutex<TickState>,
}

#[derive(Debug, Default)]
struct TickState {
    total: u64,
    done: u64,
    last_percent: Option<u64>,
}

impl LogObserver {
    /// Create a new log observer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressObserver for LogObserver {
    fn phase_started(&self, phase: Phase, total: u64) {
        info!("Phase {}/6: {} ({} items)", phase.number(), phase, total);
        if let Ok(mut state) = self.state.lock() {
            *state = TickState {
                total,
                ..TickState::default()
            };
        }
    }

    fn tick(&self, phase: Phase, _path: &Path) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.done += 1;
        if state.total == 0 {
            return;
        }
        let percent = (state.done * 100 / state.total).min(100);
        if state.last_percent != Some(percent) {
            state.last_percent = Some(percent);
            info!("{}: {}% ({}/{})", phase, percent, state.done, state.total);
        }
    }

    fn phase_finished(&self, phase: Phase) {
        info!("Phase {}/6: {} done", phase.number(), phase);
    }

    fn phase_skipped(&self, phase: Phase) {
        info!("Phase {}/6: {} - skipping", phase.number(), phase);
    }
}
