//! Simulation loop runner.
//!
//! [`run_simulation`] drives [`run_tick`] until one of these holds:
//!
//! - **Tick limit**: `max_ticks` ticks have run in this call.
//! - **Stop request**: [`RunControl::request_stop`] was called.
//! - **Quiescence**: optionally, no task is live and every worker is idle.
//!
//! Between ticks the runner sleeps for the tick interval, which may be
//! changed at runtime.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{info, warn};

use crate::config::WorldConfig;
use crate::error::CoreError;
use crate::session::ColonySession;
use crate::tick::{self, TickSummary};

/// Reason why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// Reached the configured tick limit.
    MaxTicksReached,
    /// A stop was requested.
    StopRequested,
    /// Nothing left to do.
    Quiescent,
}

/// Shared run control, readable without locks from the tick loop.
#[derive(Debug)]
pub struct RunControl {
    stop_requested: AtomicBool,
    tick_interval_ms: AtomicU64,
    /// Maximum ticks per run (0 = unlimited).
    max_ticks: u64,
    stop_when_quiescent: bool,
}

impl RunControl {
    /// Create run control.
    pub const fn new(max_ticks: u64, tick_interval_ms: u64, stop_when_quiescent: bool) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            max_ticks,
            stop_when_quiescent,
        }
    }

    /// Run control for the configured limit and interval.
    pub const fn from_config(world: &WorldConfig, stop_when_quiescent: bool) -> Self {
        Self::new(world.max_ticks, world.tick_interval_ms, stop_when_quiescent)
    }

    /// Ask the loop to stop before its next tick.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Relaxed)
    }

    /// Change the tick interval.
    pub fn set_tick_interval_ms(&self, ms: u64) {
        self.tick_interval_ms.store(ms, Ordering::Relaxed);
        info!(tick_interval_ms = ms, "Tick interval changed");
    }

    /// The tick limit (0 = unlimited).
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Whether `ticks_run` ticks exhaust the limit.
    pub const fn tick_limit_reached(&self, ticks_run: u64) -> bool {
        self.max_ticks > 0 && ticks_run >= self.max_ticks
    }
}

/// Result of a run.
#[derive(Debug)]
pub struct RunResult {
    /// Why the run ended.
    pub end_reason: RunEndReason,
    /// The last tick summary, if any tick ran.
    pub final_summary: Option<TickSummary>,
    /// Ticks executed by this run.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, session: &ColonySession);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _session: &ColonySession) {}
}

/// Run the tick loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`CoreError`] if a tick fails unrecoverably.
pub async fn run_simulation(
    session: &mut ColonySession,
    control: &Arc<RunControl>,
    callback: &mut dyn TickCallback,
) -> Result<RunResult, CoreError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = control.max_ticks(),
        tick_interval_ms = control.tick_interval_ms(),
        start_tick = session.tick(),
        "Simulation starting"
    );

    loop {
        if control.is_stop_requested() {
            info!("Stop requested");
            return Ok(RunResult {
                end_reason: RunEndReason::StopRequested,
                final_summary: last_summary,
                total_ticks,
            });
        }

        let summary = tick::run_tick(session)?;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&summary, session);

        if control.stop_when_quiescent && summary.is_quiescent() {
            info!(tick = summary.tick, "All work done");
            return Ok(RunResult {
                end_reason: RunEndReason::Quiescent,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        if control.tick_limit_reached(total_ticks) {
            info!(tick = summary.tick, max_ticks = control.max_ticks(), "Tick limit reached");
            return Ok(RunResult {
                end_reason: RunEndReason::MaxTicksReached,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        last_summary = Some(summary);

        let interval_ms = control.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

/// Log the end of a run.
pub fn log_run_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        live_tasks = result.final_summary.as_ref().map(|s| s.live_tasks),
        "Simulation ended"
    );
    if result.final_summary.is_none() {
        warn!("Simulation ended with no ticks executed");
    }
}
