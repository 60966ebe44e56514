//! Toolpath playback
//!
//! Replays a parsed waypoint path on a background Tokio task, one position
//! per tick. Only one run is active at a time: starting a new one cancels the
//! previous run before `start` returns, and a cancelled run never reports
//! another position.

use crate::gcode::{parse_waypoints, Waypoint};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delay between positions at speed 1.0
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_millis(20);

struct ActiveRun {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Cancelable, speed-scaled replay of a G-code program
pub struct ToolpathSimulator {
    path: Arc<Vec<Waypoint>>,
    base_interval: Duration,
    /// Held by a run while it checks its cancel flag and reports a position
    emit_gate: Arc<Mutex<()>>,
    active: Option<ActiveRun>,
}

impl Default for ToolpathSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_INTERVAL)
    }
}

impl ToolpathSimulator {
    pub fn new(base_interval: Duration) -> Self {
        Self {
            path: Arc::new(Vec::new()),
            base_interval,
            emit_gate: Arc::new(Mutex::new(())),
            active: None,
        }
    }

    /// Parse `gcode` and replace the current path. Any active run is cancelled.
    pub fn load(&mut self, gcode: &str) -> usize {
        self.cancel_active();
        self.path = Arc::new(parse_waypoints(gcode));
        info!("Loaded {} waypoints for simulation", self.path.len());
        self.path.len()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.path
    }

    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    /// Delay between positions for a speed multiplier. Speeds that are not
    /// positive and finite run at 1.0.
    pub fn interval_for(&self, speed: f64) -> Duration {
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            warn!("Invalid simulation speed {}, using 1.0", speed);
            1.0
        };
        Duration::try_from_secs_f64(self.base_interval.as_secs_f64() / speed)
            .unwrap_or(Duration::MAX)
    }

    /// Start replaying the loaded path, reporting each position to
    /// `on_position` from a background task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(&mut self, speed: f64, mut on_position: F)
    where
        F: FnMut(Waypoint) + Send + 'static,
    {
        self.cancel_active();

        let interval = self.interval_for(speed);
        let cancel = Arc::new(AtomicBool::new(false));
        let path = Arc::clone(&self.path);
        let gate = Arc::clone(&self.emit_gate);
        let run_cancel = Arc::clone(&cancel);

        debug!(
            "Starting simulation of {} waypoints every {:?}",
            path.len(),
            interval
        );

        let handle = tokio::spawn(async move {
            for (index, waypoint) in path.iter().enumerate() {
                if index > 0 {
                    tokio::time::sleep(interval).await;
                }
                {
                    let _gate = gate.lock();
                    if run_cancel.load(Ordering::SeqCst) {
                        debug!("Simulation cancelled at waypoint {}", index);
                        return;
                    }
                    on_position(*waypoint);
                }
            }
            debug!("Simulation finished");
        });

        self.active = Some(ActiveRun { cancel, handle });
    }

    /// Cancel the active run and keep the path. Playback restarts from the
    /// beginning on the next `start`.
    pub fn pause(&mut self) {
        self.cancel_active();
    }

    /// Cancel the active run and discard the path.
    pub fn stop(&mut self) {
        self.cancel_active();
        self.path = Arc::new(Vec::new());
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| !run.cancel.load(Ordering::SeqCst) && !run.handle.is_finished())
    }

    /// Wait until the active run finishes or is cancelled.
    pub async fn wait(&mut self) {
        if let Some(run) = self.active.take() {
            // A cancelled task reports a JoinError, which is expected here.
            let _ = run.handle.await;
        }
    }

    fn cancel_active(&mut self) {
        if let Some(run) = self.active.take() {
            // Taking the gate waits out a position report already in progress.
            let _gate = self.emit_gate.lock();
            run.cancel.store(true, Ordering::SeqCst);
            run.handle.abort();
        }
    }
}

impl Drop for ToolpathSimulator {
    fn drop(&mut self) {
        self.cancel_active();
    }
}
