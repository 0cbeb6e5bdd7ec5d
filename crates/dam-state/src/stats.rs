use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dam_api_client::AssetApi;
use dam_core::models::RealTimeStats;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeSnapshot {
    /// Last successful reading. Kept when a later refresh fails.
    pub stats: Option<RealTimeStats>,
    pub error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Background refresher for `/stats/realtime`. Fetches immediately, then on
/// every interval tick, until shut down.
pub struct StatsPoller {
    snapshot: watch::Receiver<RealTimeSnapshot>,
    shutdown_tx: mpsc::Sender<()>,
}

impl StatsPoller {
    pub fn spawn(api: Arc<dyn AssetApi>, refresh_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (snapshot_tx, snapshot) = watch::channel(RealTimeSnapshot::default());

        tokio::spawn(async move {
            Self::worker_loop(api, refresh_interval, snapshot_tx, shutdown_rx).await;
        });

        Self {
            snapshot,
            shutdown_tx,
        }
    }

    async fn worker_loop(
        api: Arc<dyn AssetApi>,
        refresh_interval: Duration,
        snapshot_tx: watch::Sender<RealTimeSnapshot>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = interval(refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            refresh_interval_secs = refresh_interval.as_secs(),
            "Realtime stats poller started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match api.realtime_stats().await {
                        Ok(stats) => {
                            snapshot_tx.send_modify(|s| {
                                s.stats = Some(stats);
                                s.error = None;
                                s.refreshed_at = Some(Utc::now());
                            });
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to refresh realtime stats");
                            snapshot_tx.send_modify(|s| s.error = Some(e.user_message()));
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Realtime stats poller shutting down");
                    break;
                }
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RealTimeSnapshot> {
        self.snapshot.clone()
    }

    pub fn latest(&self) -> RealTimeSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Stop the background task
    pub async fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            tracing::warn!(
                error = %e,
                "Failed to send shutdown signal to realtime stats poller"
            );
        }
    }
}
