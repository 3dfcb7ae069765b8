//! Broadcast primitive: publish and subscribe typed messages over the store
//!
//! A publish writes the encoded payload under the derived key and removes it
//! right away. The store only notifies on an actual change, so leaving the
//! key absent after every publish makes the next publish, even of an
//! identical payload, an absent-to-present change that always notifies.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

use super::channel::{derive_key, MessageKind};
use crate::error::{Result, SyncError};
use crate::store::{BroadcastStore, ListenerId, SharedStore, StorageEvent, StorageListener};

/// Payload carried by `AskForInit`; receivers ignore it
pub const INIT_PLACEHOLDER: &str = "storage initialisation";

/// JSON-encoded message body as written to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(String);

impl Payload {
    pub fn encode<T: Serialize + ?Sized>(channel: &str, value: &T) -> Result<Self> {
        serde_json::to_string(value)
            .map(Payload)
            .map_err(|source| SyncError::Serialization {
                channel: channel.to_string(),
                source,
            })
    }

    pub fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
        serde_json::from_str(raw).map_err(|source| SyncError::Deserialization {
            key: key.to_string(),
            source,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Encode `value` and publish it as a `kind` message on `channel`
pub fn publish<T: Serialize + ?Sized>(
    store: &dyn BroadcastStore,
    channel: &str,
    kind: MessageKind,
    value: &T,
) -> Result<()> {
    let payload = Payload::encode(channel, value)?;
    publish_payload(store, channel, kind, &payload);
    Ok(())
}

/// Publish an already encoded payload
pub fn publish_payload(
    store: &dyn BroadcastStore,
    channel: &str,
    kind: MessageKind,
    payload: &Payload,
) {
    let key = derive_key(channel, kind);
    store.set_item(&key, payload.as_str());
    store.remove_item(&key);
    debug!(channel, %kind, bytes = payload.as_str().len(), "published");
}

/// Registration of one typed listener; released when dropped
pub struct Subscription {
    key: String,
    id: ListenerId,
    store: Weak<dyn BroadcastStore>,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.remove_listener(self.id);
            trace!(key = %self.key, id = %self.id, "unsubscribed");
        }
    }
}

/// Call `listener` with each decoded `kind` message published on `channel`
///
/// Removals at the key are never delivered. A payload that does not decode
/// as `T` is dropped and reported as [`SyncError::Deserialization`].
pub fn subscribe<T, F>(
    store: &SharedStore,
    channel: &str,
    kind: MessageKind,
    listener: F,
) -> Subscription
where
    T: DeserializeOwned + 'static,
    F: Fn(T) -> Result<()> + 'static,
{
    let key = derive_key(channel, kind);
    let watched = key.clone();

    let wrapped: StorageListener = Rc::new(move |event: &StorageEvent| -> Result<()> {
        if event.key != watched {
            return Ok(());
        }
        let Some(raw) = event.new_value.as_deref() else {
            return Ok(());
        };
        let value: T = Payload::decode(&watched, raw)?;
        trace!(key = %watched, "delivering message");
        listener(value)
    });

    let id = store.add_listener(wrapped);
    trace!(%key, %id, "subscribed");

    Subscription {
        key,
        id,
        store: Rc::downgrade(store),
    }
}

/// Release a subscription
pub fn unsubscribe(subscription: Subscription) {
    drop(subscription);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BroadcastHub, MemoryStore};
    use std::cell::RefCell;

    fn participant(hub: &BroadcastHub) -> (Rc<MemoryStore>, SharedStore) {
        let store = Rc::new(hub.connect());
        let shared: SharedStore = store.clone();
        (store, shared)
    }

    #[test]
    fn test_publish_leaves_key_absent() {
        let hub = BroadcastHub::new();
        let (_a, a) = participant(&hub);

        publish(a.as_ref(), "shared", MessageKind::DataUpdate, &42).unwrap();

        assert_eq!(hub.get_item("shared-data_update"), None);
        assert!(hub.is_empty());
    }

    #[test]
    fn test_subscriber_only_sees_its_key() {
        let hub = BroadcastHub::new();
        let (_a, a) = participant(&hub);
        let (b_store, b) = participant(&hub);

        let seen = Rc::new(RefCell::new(Vec::<u32>::new()));
        let sink = seen.clone();
        let _sub = subscribe(&b, "shared", MessageKind::DataUpdate, move |v: u32| {
            sink.borrow_mut().push(v);
            Ok(())
        });

        publish(a.as_ref(), "shared", MessageKind::DataForInit, &1u32).unwrap();
        publish(a.as_ref(), "other", MessageKind::DataUpdate, &2u32).unwrap();
        publish(a.as_ref(), "shared", MessageKind::DataUpdate, &3u32).unwrap();
        b_store.dispatch_pending();

        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn test_drop_releases_listener() {
        let hub = BroadcastHub::new();
        let (b_store, b) = participant(&hub);

        let sub = subscribe(&b, "shared", MessageKind::DataUpdate, |_: u32| Ok(()));
        assert_eq!(b_store.listener_count(), 1);
        assert_eq!(sub.key(), "shared-data_update");

        unsubscribe(sub);
        assert_eq!(b_store.listener_count(), 0);
    }

    #[test]
    fn test_payload_encode_failure() {
        use std::collections::HashMap;

        // Non-string map keys cannot be encoded as JSON object keys
        let mut value = HashMap::new();
        value.insert((1, 2), "x");

        let err = Payload::encode("shared", &value).unwrap_err();
        assert!(matches!(err, SyncError::Serialization { ref channel, .. } if channel == "shared"));
    }
}
