use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub type ConnectivityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Source of "are we online" answers and change notifications.
pub trait ConnectivityMonitor: Send + Sync {
    fn current(&self) -> bool;

    /// Register `callback` for connectivity changes until the returned
    /// subscription is dropped or explicitly unsubscribed.
    fn subscribe(&self, callback: ConnectivityCallback) -> Subscription;
}

/// Handle that removes a connectivity listener when dropped.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn detached() -> Self {
        Self { release: None }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

type Listeners = Arc<Mutex<BTreeMap<u64, ConnectivityCallback>>>;

/// Connectivity state set by the host (platform hook, CLI flag, tests).
#[derive(Clone)]
pub struct ManualConnectivity {
    online: Arc<AtomicBool>,
    listeners: Listeners,
    next_id: Arc<AtomicU64>,
}

impl ManualConnectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
            listeners: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Update the state, notifying listeners when it actually changes.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }
        tracing::info!(online, "connectivity changed");

        // Call outside the lock so a listener may unsubscribe itself.
        let callbacks: Vec<ConnectivityCallback> = match self.listeners.lock() {
            Ok(guard) => guard.values().cloned().collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback(online);
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl ConnectivityMonitor for ManualConnectivity {
    fn current(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn subscribe(&self, callback: ConnectivityCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        match self.listeners.lock() {
            Ok(mut guard) => {
                guard.insert(id, callback);
            }
            Err(_) => return Subscription::detached(),
        }

        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            if let Ok(mut guard) = listeners.lock() {
                guard.remove(&id);
            }
        })
    }
}
