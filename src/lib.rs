//! # tabsync - Shared State Across Tabs
//!
//! Keeps one logical value in agreement across independent participants
//! (browser tabs, windows, workers) that share nothing but a local,
//! change-notifying key-value store.
//!
//! ## Features
//!
//! - **Write-then-delete broadcast**: every publish notifies, even when the
//!   payload is identical to the previous one
//! - **Three-message handshake**: late joiners ask for the current value,
//!   the first answer wins, updates are last-write-wins
//! - **Per-channel latches**: channels never interfere with each other
//! - **Drop-in setter**: accepts a value or an updater of the previous value
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use tabsync::{use_tabs_state, BroadcastHub, SharedStore};
//!
//! fn main() -> anyhow::Result<()> {
//!     let hub = BroadcastHub::new();
//!     let tab_a = Rc::new(hub.connect());
//!     let tab_b = Rc::new(hub.connect());
//!
//!     let a = use_tabs_state(tab_a.clone() as SharedStore, 0i64, "counter")?;
//!     let b = use_tabs_state(tab_b.clone() as SharedStore, 0i64, "counter")?;
//!
//!     let (_, set_count) = a.state();
//!     set_count.update(|n| n + 1)?;
//!
//!     tab_b.dispatch_pending();
//!     assert_eq!(b.get(), 1);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod state;
pub mod store;
pub mod sync;

// Re-export main types for library consumers
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use state::{
    use_tabs_state, use_tabs_state_with, InitialState, SetState, SetStateAction, StateCell,
    TabsState,
};
pub use store::{BroadcastHub, BroadcastStore, MemoryStore, SharedStore, StorageEvent};
pub use sync::{derive_key, MessageKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
