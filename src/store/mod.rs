//! Broadcast store contract
//!
//! The host's shared key-value store: writes and deletes raise a change
//! notification in every *other* context observing the store, but only when
//! the stored value actually changes. [`memory`] provides an in-process host
//! with the same semantics.

pub mod memory;

use std::fmt;
use std::rc::Rc;

use crate::error::Result;

pub use memory::{BroadcastHub, DispatchReport, MemoryStore};

/// Change notification raised by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    /// `None` when the key was removed
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// True for the removal half of a change
    pub fn is_removal(&self) -> bool {
        self.new_value.is_none()
    }
}

/// Registration handle returned by [`BroadcastStore::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Raw store listener; errors are reported by the host, never retried
pub type StorageListener = Rc<dyn Fn(&StorageEvent) -> Result<()>>;

/// One context's view of the shared store
pub trait BroadcastStore {
    /// Set `key`, notifying other contexts if the value changed
    fn set_item(&self, key: &str, value: &str);

    /// Remove `key`, notifying other contexts if it was present
    fn remove_item(&self, key: &str);

    /// Current value at `key`
    fn get_item(&self, key: &str) -> Option<String>;

    /// Register a listener for change notifications from other contexts
    fn add_listener(&self, listener: StorageListener) -> ListenerId;

    /// Remove a listener; unknown ids are ignored
    fn remove_listener(&self, id: ListenerId);
}

/// Store handle shared by the subscriptions of one participant
pub type SharedStore = Rc<dyn BroadcastStore>;
