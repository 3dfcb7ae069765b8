//! In-process broadcast store
//!
//! A [`BroadcastHub`] holds the shared key-value map and one bounded inbox per
//! connected participant. Every effective change is pushed into the inbox of
//! every participant except the writer, while the map lock is held, so all
//! observers see the writes in one order. Participants drain their inbox
//! explicitly with [`MemoryStore::dispatch_next`] or
//! [`MemoryStore::dispatch_pending`], which plays the role of the host event
//! loop delivering storage events.

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::{BroadcastStore, ListenerId, StorageEvent, StorageListener};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::sync::MessageKind;

struct Peer {
    tx: Sender<StorageEvent>,
    backlog_warned: AtomicBool,
}

struct HubInner {
    items: Mutex<HashMap<String, String>>,
    peers: DashMap<Uuid, Peer>,
    inbox_capacity: usize,
    backlog_warn_threshold: usize,
}

/// Shared key-value medium; cheap to clone and safe to share across threads
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_config(&SyncConfig::default())
    }

    pub fn with_config(config: &SyncConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                items: Mutex::new(HashMap::new()),
                peers: DashMap::new(),
                inbox_capacity: config.inbox_capacity.max(1),
                backlog_warn_threshold: config.backlog_warn_threshold,
            }),
        }
    }

    /// Open a new participant view on the store
    pub fn connect(&self) -> MemoryStore {
        let id = Uuid::new_v4();
        let (tx, rx) = bounded(self.inner.inbox_capacity);
        self.inner.peers.insert(
            id,
            Peer {
                tx,
                backlog_warned: AtomicBool::new(false),
            },
        );
        debug!(participant = %id, "participant connected");

        MemoryStore {
            id,
            hub: self.clone(),
            inbox: rx,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        }
    }

    /// Number of connected participants
    pub fn participants(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.inner.items.lock().get(key).cloned()
    }

    /// Number of keys currently present
    pub fn len(&self) -> usize {
        self.inner.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self, origin: Uuid, key: &str, value: Option<&str>) {
        let mut items = self.inner.items.lock();
        let old_value = match value {
            Some(value) => items.insert(key.to_string(), value.to_string()),
            None => items.remove(key),
        };

        // Unchanged writes raise no notification
        if old_value.as_deref() == value {
            return;
        }

        let event = StorageEvent {
            key: key.to_string(),
            old_value,
            new_value: value.map(str::to_string),
        };

        for peer in self.inner.peers.iter() {
            if *peer.key() != origin {
                self.deliver(*peer.key(), peer.value(), event.clone());
            }
        }
    }

    fn deliver(&self, id: Uuid, peer: &Peer, event: StorageEvent) {
        let backlog = peer.tx.len();
        let threshold = self.inner.backlog_warn_threshold;
        if backlog > threshold && !peer.backlog_warned.swap(true, Ordering::Relaxed) {
            warn!(
                participant = %id,
                backlog,
                capacity = self.inner.inbox_capacity,
                "participant inbox backlog"
            );
        } else if backlog < threshold / 2 {
            peer.backlog_warned.store(false, Ordering::Relaxed);
        }

        match peer.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(participant = %id, key = %event.key, "dropped notification, inbox full");
            }
            Err(TrySendError::Disconnected(_)) => {
                trace!(participant = %id, "inbox closed");
            }
        }
    }
}

/// Outcome of one dispatch step
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Notifications taken from the inbox
    pub events: usize,
    /// Listener invocations
    pub deliveries: usize,
    /// Listener failures, in delivery order
    pub errors: Vec<SyncError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn merge(&mut self, other: DispatchReport) {
        self.events += other.events;
        self.deliveries += other.deliveries;
        self.errors.extend(other.errors);
    }
}

/// One participant's connection to a [`BroadcastHub`]
///
/// Listeners are single-threaded; a `MemoryStore` stays on the thread that
/// created it.
pub struct MemoryStore {
    id: Uuid,
    hub: BroadcastHub,
    inbox: Receiver<StorageEvent>,
    listeners: RefCell<Vec<(ListenerId, StorageListener)>>,
    next_listener: Cell<u64>,
}

impl MemoryStore {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Notifications waiting in the inbox
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|(lid, _)| *lid == id)
    }

    /// Deliver the oldest pending notification, if any
    pub fn dispatch_next(&self) -> Option<DispatchReport> {
        let event = self.inbox.try_recv().ok()?;
        let mut report = DispatchReport {
            events: 1,
            ..Default::default()
        };

        // Listeners added while dispatching wait for the next event
        let snapshot: Vec<(ListenerId, StorageListener)> = self.listeners.borrow().clone();
        for (id, listener) in snapshot {
            if !self.is_registered(id) {
                continue;
            }
            report.deliveries += 1;
            if let Err(err) = listener(&event) {
                match MessageKind::split_key(&event.key) {
                    Some((channel, kind)) => warn!(
                        participant = %self.id,
                        channel,
                        %kind,
                        error = %err,
                        "dropped message"
                    ),
                    None => warn!(
                        participant = %self.id,
                        key = %event.key,
                        error = %err,
                        "dropped message"
                    ),
                }
                report.errors.push(err);
            }
        }

        Some(report)
    }

    /// Deliver every pending notification
    pub fn dispatch_pending(&self) -> DispatchReport {
        let mut report = DispatchReport::default();
        while let Some(step) = self.dispatch_next() {
            report.merge(step);
        }
        report
    }
}

impl BroadcastStore for MemoryStore {
    fn set_item(&self, key: &str, value: &str) {
        self.hub.write(self.id, key, Some(value));
    }

    fn remove_item(&self, key: &str) {
        self.hub.write(self.id, key, None);
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.hub.get_item(key)
    }

    fn add_listener(&self, listener: StorageListener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.hub.inner.peers.remove(&self.id);
        debug!(participant = %self.id, "participant disconnected");
    }
}
