//! Binding between a participant's state cell and the handshake
//!
//! Mounting installs one subscription per message kind and asks the other
//! participants for the current value. The `AskForInit` responder closes over
//! the current value, so it is rebuilt after every change of the cell. The two
//! adopters only need the cell itself and live as long as the binding.
//! Dropping the binding unmounts it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};

use super::cell::{InitialState, LocalCell, SetStateAction, StateCell, WatchId};
use crate::error::Result;
use crate::store::SharedStore;
use crate::sync::{
    announce, announce_update, install_init_adopter, install_responder, install_update_adopter,
    InitLatch, LiveSubscription, ReactionContext, Subscription,
};

/// Setter returned to callers; a drop-in for the state cell's own setter
///
/// Every call resolves the action against the cell's current value,
/// broadcasts the resolved value as a `DataUpdate` and applies it locally.
pub struct SetState<T> {
    inner: Rc<Setter<T>>,
}

struct Setter<T> {
    channel: String,
    store: SharedStore,
    cell: Rc<dyn StateCell<T>>,
    latch: InitLatch,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> SetState<T>
where
    T: Clone + Serialize + 'static,
{
    /// Set a literal value or apply an updater; returns the resolved value
    ///
    /// If the value cannot be encoded nothing is published and the local
    /// state is left unchanged.
    pub fn set(&self, action: impl Into<SetStateAction<T>>) -> Result<T> {
        let setter = &self.inner;
        let next = action.into().resolve(&setter.cell.get());

        announce_update(setter.store.as_ref(), &setter.channel, &setter.latch, &next)?;
        setter.cell.set(SetStateAction::Value(next.clone()));

        Ok(next)
    }

    pub fn update<F>(&self, updater: F) -> Result<T>
    where
        F: FnOnce(&T) -> T + 'static,
    {
        self.set(SetStateAction::update(updater))
    }

    /// Whether both handles are the same setter
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> std::fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetState")
            .field("channel", &self.inner.channel)
            .finish()
    }
}

struct Binding<T: 'static> {
    channel: String,
    cell: Rc<dyn StateCell<T>>,
    reactions: ReactionContext<T>,
    setter: SetState<T>,
    responder: RefCell<LiveSubscription<u64>>,
    adopters: RefCell<Vec<Subscription>>,
    watch: Cell<Option<WatchId>>,
}

impl<T> Binding<T>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    /// Reinstall the responder if the cell changed since it was built
    fn refresh_responder(&self) -> Result<bool> {
        let version = self.cell.version();
        self.responder
            .borrow_mut()
            .refresh(version, |_| install_responder(&self.reactions, &self.cell.get()))
    }
}

impl<T: 'static> Drop for Binding<T> {
    fn drop(&mut self) {
        if let Some(id) = self.watch.take() {
            self.cell.unwatch(id);
        }
        self.responder.get_mut().release();
        self.adopters.get_mut().clear();
        debug!(channel = %self.channel, "unmounted");
    }
}

/// One participant's live binding of a channel
pub struct TabsState<T: 'static> {
    inner: Rc<Binding<T>>,
}

impl<T> TabsState<T>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    /// Mount on a fresh local cell holding `initial`
    pub fn mount(
        store: SharedStore,
        initial: impl Into<InitialState<T>>,
        channel: impl Into<String>,
    ) -> Result<Self> {
        let cell: Rc<dyn StateCell<T>> = Rc::new(LocalCell::new(initial));
        Self::mount_with_cell(store, cell, channel)
    }

    /// Mount on a cell owned by the host
    pub fn mount_with_cell(
        store: SharedStore,
        cell: Rc<dyn StateCell<T>>,
        channel: impl Into<String>,
    ) -> Result<Self> {
        let channel = channel.into();
        let latch = InitLatch::new();

        let target = cell.clone();
        let reactions = ReactionContext {
            channel: channel.clone(),
            store: store.clone(),
            latch: latch.clone(),
            apply: Rc::new(move |value: T| target.set(SetStateAction::Value(value))),
        };

        let setter = SetState {
            inner: Rc::new(Setter {
                channel: channel.clone(),
                store: store.clone(),
                cell: cell.clone(),
                latch,
            }),
        };

        let inner = Rc::new(Binding {
            channel,
            cell,
            reactions,
            setter,
            responder: RefCell::new(LiveSubscription::new()),
            adopters: RefCell::new(Vec::new()),
            watch: Cell::new(None),
        });

        {
            let mut adopters = inner.adopters.borrow_mut();
            adopters.push(install_update_adopter(&inner.reactions));
            adopters.push(install_init_adopter(&inner.reactions));
        }
        inner.refresh_responder()?;

        let binding = Rc::downgrade(&inner);
        let id = inner.cell.watch(Rc::new(move || {
            let Some(binding) = binding.upgrade() else {
                return;
            };
            if let Err(err) = binding.refresh_responder() {
                warn!(channel = %binding.channel, error = %err, "failed to rebuild init responder");
            }
        }));
        inner.watch.set(Some(id));

        announce(store.as_ref(), &inner.channel)?;
        debug!(channel = %inner.channel, "mounted");

        Ok(Self { inner })
    }

    /// Current local value
    pub fn get(&self) -> T {
        self.inner.cell.get()
    }

    /// The wrapped setter; the same handle on every call
    pub fn setter(&self) -> SetState<T> {
        self.inner.setter.clone()
    }

    /// `(current value, setter)`
    pub fn state(&self) -> (T, SetState<T>) {
        (self.get(), self.setter())
    }

    /// Shorthand for `self.setter().set(action)`
    pub fn set(&self, action: impl Into<SetStateAction<T>>) -> Result<T> {
        self.inner.setter.set(action)
    }

    pub fn channel(&self) -> &str {
        &self.inner.channel
    }

    /// Whether this participant is past the initialization handshake
    pub fn is_initialised(&self) -> bool {
        self.inner.reactions.latch.is_set()
    }

    /// Number of store subscriptions currently held
    pub fn subscription_count(&self) -> usize {
        let responder = usize::from(self.inner.responder.borrow().is_active());
        responder + self.inner.adopters.borrow().len()
    }

    /// Release every subscription; same as dropping the binding
    pub fn unmount(self) {
        drop(self);
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for TabsState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabsState")
            .field("channel", &self.inner.channel)
            .field("version", &self.inner.cell.version())
            .field("initialised", &self.inner.reactions.latch.is_set())
            .finish()
    }
}
