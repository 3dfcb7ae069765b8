//! Synchronization core: key naming, broadcast primitive and the handshake

pub mod broadcast;
pub mod channel;
pub mod live;
pub mod protocol;

pub use broadcast::{
    publish, publish_payload, subscribe, unsubscribe, Payload, Subscription, INIT_PLACEHOLDER,
};
pub use channel::{derive_key, MessageKind};
pub use live::LiveSubscription;
pub use protocol::{
    announce, announce_update, install_init_adopter, install_responder, install_update_adopter,
    InitLatch, ReactionContext,
};
