//! Network connectivity monitoring.
//!
//! A [`NetworkProbe`] wraps the platform's network-status API. The
//! [`ConnectivityMonitor`] derives the online flag from it and fans platform
//! change events out to subscribers.

mod http_probe;
mod tracker;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub use http_probe::HttpProbe;
pub use tracker::{OfflineStatusTracker, Transition};

/// Raw platform network status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub is_connected: bool,
    /// `None` while the platform has not determined reachability yet
    pub is_internet_reachable: Option<bool>,
}

impl NetworkState {
    pub const ONLINE: Self = Self {
        is_connected: true,
        is_internet_reachable: Some(true),
    };

    pub const OFFLINE: Self = Self {
        is_connected: false,
        is_internet_reachable: Some(false),
    };

    /// Connected but unreachable (captive portal) and undetermined
    /// reachability both count as offline.
    pub const fn is_online(self) -> bool {
        self.is_connected && matches!(self.is_internet_reachable, Some(true))
    }
}

/// Point-in-time access to the platform network status.
#[allow(async_fn_in_trait)]
pub trait NetworkProbe: Clone + Send + Sync + 'static {
    async fn current(&self) -> NetworkState;
}

/// Probe whose state is pushed in by platform glue code.
#[derive(Debug, Clone)]
pub struct ManualProbe {
    state: Arc<Mutex<NetworkState>>,
}

impl ManualProbe {
    pub fn new(initial: NetworkState) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn set(&self, state: NetworkState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    pub fn set_online(&self, online: bool) {
        self.set(if online {
            NetworkState::ONLINE
        } else {
            NetworkState::OFFLINE
        });
    }

    fn snapshot(&self) -> NetworkState {
        self.state
            .lock()
            .map_or(NetworkState::OFFLINE, |state| *state)
    }
}

impl Default for ManualProbe {
    fn default() -> Self {
        Self::new(NetworkState::ONLINE)
    }
}

impl NetworkProbe for ManualProbe {
    async fn current(&self) -> NetworkState {
        self.snapshot()
    }
}

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: HashMap<u64, Listener>,
}

/// Derived online/offline state plus change subscriptions.
#[derive(Clone)]
pub struct ConnectivityMonitor<P: NetworkProbe> {
    probe: P,
    listeners: Arc<Mutex<Listeners>>,
    latest: Arc<watch::Sender<bool>>,
}

impl<P: NetworkProbe> ConnectivityMonitor<P> {
    pub fn new(probe: P) -> Self {
        let (latest, _) = watch::channel(true);
        Self {
            probe,
            listeners: Arc::new(Mutex::new(Listeners::default())),
            latest: Arc::new(latest),
        }
    }

    /// Query the platform now.
    pub async fn is_online(&self) -> bool {
        self.probe.current().await.is_online()
    }

    /// Query the platform and publish the result as a change event.
    pub async fn refresh(&self) -> bool {
        let state = self.probe.current().await;
        self.report(state);
        state.is_online()
    }

    /// Platform change event entry point.
    ///
    /// Every subscriber receives the derived flag, whether or not it changed.
    pub fn report(&self, state: NetworkState) {
        let online = state.is_online();
        self.latest.send_replace(online);

        let callbacks = self
            .listeners
            .lock()
            .map(|listeners| listeners.callbacks.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        tracing::debug!(
            online,
            listeners = callbacks.len(),
            "Network status event"
        );
        for callback in callbacks {
            callback(online);
        }
    }

    /// Register a listener; it stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        let id = self.listeners.lock().map_or(0, |mut listeners| {
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.callbacks.insert(id, Arc::new(callback));
            id
        });
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Latest reported value as a watch channel.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.latest.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .map_or(0, |listeners| listeners.callbacks.len())
    }
}

/// Disposer returned by [`ConnectivityMonitor::subscribe`].
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut listeners) = listeners.lock() {
                listeners.callbacks.remove(&self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn captive_portal_and_unknown_reachability_are_offline() {
        let captive = NetworkState {
            is_connected: true,
            is_internet_reachable: Some(false),
        };
        let unknown = NetworkState {
            is_connected: true,
            is_internet_reachable: None,
        };
        assert!(!captive.is_online());
        assert!(!unknown.is_online());
        assert!(NetworkState::ONLINE.is_online());
    }

    #[tokio::test]
    async fn is_online_queries_the_probe() {
        let probe = ManualProbe::default();
        let monitor = ConnectivityMonitor::new(probe.clone());
        assert!(monitor.is_online().await);

        probe.set_online(false);
        assert!(!monitor.is_online().await);
    }

    #[test]
    fn subscribers_receive_every_event_until_dropped() {
        let monitor = ConnectivityMonitor::new(ManualProbe::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let subscription = {
            let seen = Arc::clone(&seen);
            monitor.subscribe(move |online| seen.lock().unwrap().push(online))
        };
        assert_eq!(monitor.listener_count(), 1);

        monitor.report(NetworkState::OFFLINE);
        monitor.report(NetworkState::OFFLINE);
        monitor.report(NetworkState::ONLINE);
        subscription.unsubscribe();
        monitor.report(NetworkState::OFFLINE);

        assert_eq!(*seen.lock().unwrap(), vec![false, false, true]);
        assert_eq!(monitor.listener_count(), 0);
    }

    #[test]
    fn subscriptions_are_independent() {
        let monitor = ConnectivityMonitor::new(ManualProbe::default());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let keep = {
            let first = Arc::clone(&first);
            monitor.subscribe(move |_| {
                first.fetch_add(1, Ordering::SeqCst);
            })
        };
        {
            let second = Arc::clone(&second);
            let _dropped = monitor.subscribe(move |_| {
                second.fetch_add(1, Ordering::SeqCst);
            });
        }

        monitor.report(NetworkState::ONLINE);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        drop(keep);
    }

    #[tokio::test]
    async fn refresh_publishes_latest_value() {
        let probe = ManualProbe::new(NetworkState::OFFLINE);
        let monitor = ConnectivityMonitor::new(probe);
        let receiver = monitor.watch();
        assert!(*receiver.borrow());

        assert!(!monitor.refresh().await);
        assert!(!*receiver.borrow());
    }
}
