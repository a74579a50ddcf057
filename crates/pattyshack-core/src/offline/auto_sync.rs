//! Drain the queue automatically when connectivity comes back.

use std::future::Future;

use crate::connectivity::{NetworkProbe, OfflineStatusTracker, Transition};
use crate::gateway::RemoteGateway;
use crate::storage::KeyValueStore;

use super::operations::OfflineOperations;
use super::queue::DrainReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSyncEvent {
    WentOffline,
    CameOnline,
    Drained(DrainReport),
    DrainFailed(String),
}

/// Watches the monitor's latest value and drains on every offline to online
/// edge. The host decides where this runs; nothing here spawns tasks.
pub struct AutoSync<G, S, P>
where
    G: RemoteGateway,
    S: KeyValueStore,
    P: NetworkProbe,
{
    operations: OfflineOperations<G, S, P>,
    tracker: OfflineStatusTracker,
}

impl<G, S, P> AutoSync<G, S, P>
where
    G: RemoteGateway,
    S: KeyValueStore,
    P: NetworkProbe,
{
    pub fn new(operations: OfflineOperations<G, S, P>) -> Self {
        Self {
            operations,
            tracker: OfflineStatusTracker::default(),
        }
    }

    pub const fn is_online(&self) -> bool {
        self.tracker.is_online()
    }

    /// Feed one connectivity value and return what it caused.
    pub async fn handle(&mut self, online: bool) -> Vec<AutoSyncEvent> {
        match self.tracker.observe(online) {
            None => Vec::new(),
            Some(Transition::WentOffline) => {
                tracing::info!("Connection lost, queueing changes locally");
                vec![AutoSyncEvent::WentOffline]
            }
            Some(Transition::CameOnline) => {
                tracing::info!("Connection restored, syncing queued changes");
                let outcome = match self.operations.sync().await {
                    Ok(report) => AutoSyncEvent::Drained(report),
                    Err(error) => {
                        tracing::warn!("Automatic sync failed: {}", error);
                        AutoSyncEvent::DrainFailed(error.to_string())
                    }
                };
                vec![AutoSyncEvent::CameOnline, outcome]
            }
        }
    }

    /// Process connectivity changes until `shutdown` resolves.
    pub async fn run_until<F>(mut self, shutdown: F, mut on_event: impl FnMut(AutoSyncEvent))
    where
        F: Future<Output = ()>,
    {
        let mut updates = self.operations.monitor().watch();
        tokio::pin!(shutdown);

        let initial = *updates.borrow_and_update();
        for event in self.handle(initial).await {
            on_event(event);
        }

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = *updates.borrow_and_update();
                    for event in self.handle(online).await {
                        on_event(event);
                    }
                }
            }
        }
        tracing::debug!("Auto-sync loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::{mpsc, oneshot};

    use super::*;
    use crate::config::OfflineConfig;
    use crate::connectivity::{ManualProbe, NetworkState};
    use crate::storage::MemoryStore;
    use crate::testing::{manual_monitor, RecordingGateway};

    fn operations(
        online: bool,
    ) -> (
        ManualProbe,
        RecordingGateway,
        OfflineOperations<RecordingGateway, MemoryStore, ManualProbe>,
    ) {
        let (probe, monitor) = manual_monitor(online);
        let gateway = RecordingGateway::new();
        let ops = OfflineOperations::new(
            gateway.clone(),
            monitor,
            MemoryStore::new(),
            OfflineConfig::default(),
        )
        .unwrap();
        (probe, gateway, ops)
    }

    #[tokio::test]
    async fn only_the_reconnect_edge_drains() {
        let (probe, gateway, ops) = operations(false);
        ops.update("tasks", "t1", json!({ "status": "completed" }))
            .await
            .unwrap();
        let mut auto_sync = AutoSync::new(ops.clone());

        assert_eq!(auto_sync.handle(false).await, vec![AutoSyncEvent::WentOffline]);
        assert!(auto_sync.handle(false).await.is_empty());

        probe.set_online(true);
        let events = auto_sync.handle(true).await;
        assert_eq!(events[0], AutoSyncEvent::CameOnline);
        assert!(matches!(&events[1], AutoSyncEvent::Drained(report) if report.success == 1));
        assert!(auto_sync.handle(true).await.is_empty());
        assert_eq!(gateway.calls().len(), 1);
        assert_eq!(ops.queue().pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn run_until_follows_reported_events() {
        let (probe, _gateway, ops) = operations(true);
        let monitor = ops.monitor().clone();
        let queue = ops.queue().clone();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let runner = AutoSync::new(ops).run_until(
            async {
                let _ = stop_rx.await;
            },
            move |event| {
                let _ = events_tx.send(event);
            },
        );
        let driver = async {
            probe.set_online(false);
            monitor.report(NetworkState::OFFLINE);
            assert_eq!(events_rx.recv().await, Some(AutoSyncEvent::WentOffline));

            queue
                .enqueue(crate::offline::NewAction::delete("shifts", "sh1"))
                .await
                .unwrap();
            probe.set_online(true);
            monitor.report(NetworkState::ONLINE);
            assert_eq!(events_rx.recv().await, Some(AutoSyncEvent::CameOnline));
            let drained = events_rx.recv().await;
            assert!(matches!(drained, Some(AutoSyncEvent::Drained(report)) if report.success == 1));

            stop_tx.send(()).unwrap();
        };

        tokio::join!(runner, driver);
        assert_eq!(queue.pending_count().await.unwrap(), 0);
    }
}
