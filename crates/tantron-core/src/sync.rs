// ── State subscription loop ──
//
// Long-polls the cloud for state changes of every registered device and
// folds the returned deltas into the registry. One loop runs per registry
// generation; a full refresh cancels the running loop before starting the
// next one.

use std::sync::Arc;
use std::time::Duration;

use strum::{Display, EnumString};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::cloud::CloudApi;
use crate::config::SyncConfig;
use crate::store::DeviceRegistry;

/// What the subscription loop is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SyncPhase {
    /// No devices to watch.
    Idle,
    /// A long-poll is in flight.
    Polling,
    /// Waiting after a failed poll.
    Backoff,
    /// Not running.
    #[default]
    Stopped,
}

pub(crate) struct SyncLoop<C> {
    cloud: Arc<C>,
    registry: Arc<DeviceRegistry>,
    phase: Arc<watch::Sender<SyncPhase>>,
    timing: SyncConfig,
}

impl<C: CloudApi> SyncLoop<C> {
    pub(crate) fn new(
        cloud: Arc<C>,
        registry: Arc<DeviceRegistry>,
        phase: Arc<watch::Sender<SyncPhase>>,
        timing: SyncConfig,
    ) -> Self {
        Self {
            cloud,
            registry,
            phase,
            timing,
        }
    }

    /// Run until `cancel` fires or the registry moves past `generation`.
    pub(crate) async fn run(self, generation: u64, cancel: CancellationToken) {
        debug!(generation, "state subscription started");
        loop {
            let snapshot = self.registry.snapshot();
            if snapshot.generation != generation {
                debug!(generation, "registry replaced, subscription exiting");
                break;
            }

            let pause = if snapshot.devices.is_empty() {
                self.set_phase(SyncPhase::Idle);
                self.timing.idle_wait
            } else {
                self.set_phase(SyncPhase::Polling);
                let connections = snapshot.connections();
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    r = self.cloud.fetch_state_block(&connections) => r,
                };
                match result {
                    Ok(deltas) => {
                        let accepted = self.registry.apply_deltas(generation, &deltas);
                        trace!(received = deltas.len(), accepted, "state deltas applied");
                        self.timing.poll_pause
                    }
                    Err(e) => {
                        warn!(error = %e, "state subscription interrupted, retrying");
                        self.set_phase(SyncPhase::Backoff);
                        self.timing.error_backoff
                    }
                }
            };

            if !sleep_or_cancel(pause, &cancel).await {
                break;
            }
        }
        self.set_phase(SyncPhase::Stopped);
        debug!(generation, "state subscription stopped");
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.send_if_modified(|current| {
            let changed = *current != phase;
            *current = phase;
            changed
        });
    }
}

/// Sleep for `duration`; returns `false` if cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
