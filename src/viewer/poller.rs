use std::sync::Arc;

use strum::Display;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::viewer::controller::RunLogViewer;

/// Lifecycle of the run status poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PollerPhase {
    /// Constructed, timer not yet driving fetches
    Idle,

    /// Ticking at the fixed period while the run is non-terminal
    Polling,

    /// Terminal: reached on terminal run status or viewer teardown;
    /// no further ticks perform fetches
    Stopped,
}

/// Spawn the poll loop for a viewer.
///
/// Each tick performs the log fetch and then the status fetch; the next
/// tick cannot start while one is in flight because the loop awaits the
/// whole tick before sleeping again. Cancelling the viewer drops an
/// in-flight tick mid-fetch, so a late response can never touch
/// discarded state.
pub fn spawn_poller(viewer: Arc<RunLogViewer>) -> JoinHandle<()> {
    tokio::spawn(run_poller(viewer))
}

/// Drive the poll loop until the run is terminal or the viewer is torn
/// down
pub async fn run_poller(viewer: Arc<RunLogViewer>) {
    let run_id = viewer.run_id();
    let token = viewer.shutdown_token();

    if viewer.run_status().is_terminal() {
        info!(run_id = %run_id, "Run already terminal; poller not started");
        viewer.mark_stopped();
        return;
    }

    viewer.mark_polling();
    info!(
        run_id = %run_id,
        interval_ms = viewer.poll_interval().as_millis() as u64,
        "Run log poller started"
    );

    let mut interval = tokio::time::interval(viewer.poll_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the first
    // fetch happens one full period after construction.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!(run_id = %run_id, "Run log poller shutting down");
                viewer.mark_stopped();
                break;
            }
            _ = interval.tick() => {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!(run_id = %run_id, "Run log poller cancelled mid-tick");
                        viewer.mark_stopped();
                        break;
                    }
                    phase = viewer.poll_once() => {
                        if phase == PollerPhase::Stopped {
                            break;
                        }
                    }
                }
            }
        }
    }

    info!(run_id = %run_id, "Run log poller stopped");
}
