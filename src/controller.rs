use std::time::Duration;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capture::source::ScreenSource;
use crate::capture::{Capturer, Snapshot};
use crate::perception::{AnalysisResult, Perception};

/// Analysis outcome delivered to the presentation layer, tagged with the
/// originating capture's sequence number so stale deliveries can be
/// rejected.
#[derive(Debug, Clone)]
pub struct PetUpdate {
    pub seq: u64,
    pub result: AnalysisResult,
}

/// Drives the recurring capture -> analyze -> update cycle.
///
/// Capture and analysis run as separate tasks joined by a single-slot
/// channel: while one analysis is in flight at most one further capture is
/// queued, and any capture beyond that is coalesced away. That bounds
/// outstanding inference requests regardless of endpoint latency.
pub struct Controller {
    capture_task: JoinHandle<()>,
    analysis_task: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Controller {
    fn start_capture_task<S: ScreenSource + 'static>(
        mut capturer: Capturer<S>,
        snapshot_tx: Sender<Snapshot>,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first interval tick fires immediately; skip it so the
            // first capture happens one full period after startup.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                debug!("Analyzing screen...");
                let snapshot = match capturer.grab() {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        // Non-fatal: skip this cycle, retry on the next tick.
                        warn!("Screen capture error: {}", e);
                        continue;
                    }
                };
                match snapshot_tx.try_send(snapshot) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(dropped)) => {
                        debug!("Analysis slot full, dropping capture {}", dropped.seq);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        info!("Snapshot channel closed, capture task shutting down.");
                        break;
                    }
                }
            }
        })
    }

    fn start_analysis_task(
        mut perception: Perception,
        mut snapshot_rx: Receiver<Snapshot>,
        update_tx: Sender<PetUpdate>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let snapshot = tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    snapshot = snapshot_rx.recv() => match snapshot {
                        Some(snapshot) => snapshot,
                        None => break,
                    },
                };
                let seq = snapshot.seq;
                let result = perception.analyze(snapshot).await;
                info!(
                    "Pet comment: {} (action: {}, capture {})",
                    result.comment, result.action, seq
                );
                if update_tx.send(PetUpdate { seq, result }).await.is_err() {
                    info!("Update channel closed, analysis task shutting down.");
                    break;
                }
            }
        })
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
        self.capture_task.abort();
        self.analysis_task.abort();
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct ControllerBuilder<S: ScreenSource + 'static> {
    capturer: Capturer<S>,
    perception: Perception,
    update_tx: Sender<PetUpdate>,
    interval: Duration,
}

impl<S: ScreenSource + 'static> ControllerBuilder<S> {
    pub fn new(capturer: Capturer<S>, perception: Perception, update_tx: Sender<PetUpdate>) -> Self {
        Self {
            capturer,
            perception,
            update_tx,
            interval: Duration::from_secs(5),
        }
    }

    // Sets the capture period, this will override the default of 5 seconds.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn spawn(self) -> Controller {
        let cancel_token = CancellationToken::new();
        let (snapshot_tx, snapshot_rx) = mpsc::channel::<Snapshot>(1);
        let capture_task = Controller::start_capture_task(
            self.capturer,
            snapshot_tx,
            self.interval,
            cancel_token.clone(),
        );
        let analysis_task = Controller::start_analysis_task(
            self.perception,
            snapshot_rx,
            self.update_tx,
            cancel_token.clone(),
        );
        Controller {
            capture_task,
            analysis_task,
            cancel_token,
        }
    }
}
