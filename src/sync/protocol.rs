//! Three-message handshake keeping one value in agreement across participants
//!
//! Reactions per (participant, channel), with latch `L` and local state `S`:
//!
//! - on mount: publish `AskForInit` (nobody has to answer)
//! - `AskForInit`: publish `DataForInit(S)` and set `L`, whatever `L` was
//! - `DataForInit(v)`: adopt `v` and set `L` only if `L` is not set yet
//! - `DataUpdate(v)`: adopt `v` unconditionally
//! - local change: publish `DataUpdate(new)` and set `L`
//!
//! The latch belongs to one participant's binding of one channel. Several
//! listeners share it, but all of them run on the participant's thread.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use tracing::debug;

use super::broadcast::{
    publish, publish_payload, subscribe, Payload, Subscription, INIT_PLACEHOLDER,
};
use super::channel::MessageKind;
use crate::error::Result;
use crate::store::{BroadcastStore, SharedStore};

/// One-shot flag: set once initialization is over, never cleared
#[derive(Debug, Clone, Default)]
pub struct InitLatch(Rc<Cell<bool>>);

impl InitLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }

    pub fn set(&self) {
        self.0.set(true);
    }

    /// Set the latch, returning whether this call was the one that set it
    pub fn claim(&self) -> bool {
        !self.0.replace(true)
    }
}

/// Everything a reaction needs from its participant
pub struct ReactionContext<T> {
    pub channel: String,
    pub store: SharedStore,
    pub latch: InitLatch,
    /// Writes an adopted value into the local state
    pub apply: Rc<dyn Fn(T)>,
}

impl<T> Clone for ReactionContext<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            store: self.store.clone(),
            latch: self.latch.clone(),
            apply: self.apply.clone(),
        }
    }
}

/// Ask the other participants for the current value
pub fn announce(store: &dyn BroadcastStore, channel: &str) -> Result<()> {
    publish(store, channel, MessageKind::AskForInit, INIT_PLACEHOLDER)
}

/// Broadcast a locally originated value
pub fn announce_update<T: Serialize + ?Sized>(
    store: &dyn BroadcastStore,
    channel: &str,
    latch: &InitLatch,
    value: &T,
) -> Result<()> {
    publish(store, channel, MessageKind::DataUpdate, value)?;
    latch.set();
    Ok(())
}

/// Answer every `AskForInit` with `snapshot`
///
/// The snapshot is encoded once here; reinstall the responder whenever the
/// local state changes.
pub fn install_responder<T: Serialize>(
    ctx: &ReactionContext<T>,
    snapshot: &T,
) -> Result<Subscription> {
    let payload = Payload::encode(&ctx.channel, snapshot)?;
    let channel = ctx.channel.clone();
    let latch = ctx.latch.clone();
    let store = Rc::downgrade(&ctx.store);

    Ok(subscribe(
        &ctx.store,
        &ctx.channel,
        MessageKind::AskForInit,
        move |_: IgnoredAny| {
            latch.set();
            if let Some(store) = store.upgrade() {
                publish_payload(store.as_ref(), &channel, MessageKind::DataForInit, &payload);
                debug!(%channel, "answered init request");
            }
            Ok(())
        },
    ))
}

/// Adopt the first `DataForInit` received, ignore the rest
pub fn install_init_adopter<T>(ctx: &ReactionContext<T>) -> Subscription
where
    T: DeserializeOwned + 'static,
{
    let channel = ctx.channel.clone();
    let latch = ctx.latch.clone();
    let apply = ctx.apply.clone();

    subscribe(
        &ctx.store,
        &ctx.channel,
        MessageKind::DataForInit,
        move |value: T| {
            if latch.claim() {
                debug!(%channel, "adopted init data");
                apply(value);
            } else {
                debug!(%channel, "ignored init data, already initialised");
            }
            Ok(())
        },
    )
}

/// Adopt every `DataUpdate`
pub fn install_update_adopter<T>(ctx: &ReactionContext<T>) -> Subscription
where
    T: DeserializeOwned + 'static,
{
    let channel = ctx.channel.clone();
    let apply = ctx.apply.clone();

    subscribe(
        &ctx.store,
        &ctx.channel,
        MessageKind::DataUpdate,
        move |value: T| {
            debug!(%channel, "adopted update");
            apply(value);
            Ok(())
        },
    )
}
