//! State binding: a local state cell kept in sync across participants

pub mod binding;
pub mod cell;

pub use binding::{SetState, TabsState};
pub use cell::{InitialState, LocalCell, SetStateAction, StateCell, WatchId, Watcher};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::rc::Rc;

use crate::error::Result;
use crate::store::SharedStore;

/// Bind a value shared by every participant on `channel`
///
/// Returns the mounted binding; its [`TabsState::state`] yields the current
/// value and a setter that accepts a value or an updater of the previous one.
/// Dropping the binding unmounts it.
pub fn use_tabs_state<T>(
    store: SharedStore,
    initial: impl Into<InitialState<T>>,
    channel: impl Into<String>,
) -> Result<TabsState<T>>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    TabsState::mount(store, initial, channel)
}

/// Like [`use_tabs_state`], computing the initial value with `init` on mount
pub fn use_tabs_state_with<T, F>(
    store: SharedStore,
    init: F,
    channel: impl Into<String>,
) -> Result<TabsState<T>>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
    F: FnOnce() -> T + 'static,
{
    let cell: Rc<dyn StateCell<T>> = Rc::new(LocalCell::new(InitialState::lazy(init)));
    TabsState::mount_with_cell(store, cell, channel)
}
