//! Channel naming: physical store keys for (channel, message kind)
//!
//! Every key the protocol reads or writes is produced here. A key is the
//! channel name followed by a fixed per-kind suffix. No suffix ends with
//! another one, so two keys are equal only when both the channel and the kind
//! are equal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three message kinds of the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// A participant just mounted and wants the current value
    AskForInit,
    /// Answer to an `AskForInit`, carrying the responder's value
    DataForInit,
    /// A participant changed the value locally
    DataUpdate,
}

impl MessageKind {
    pub const ALL: [MessageKind; 3] = [
        MessageKind::DataUpdate,
        MessageKind::DataForInit,
        MessageKind::AskForInit,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            MessageKind::AskForInit => "-ask-for-initialisation",
            MessageKind::DataForInit => "-data_initialisation",
            MessageKind::DataUpdate => "-data_update",
        }
    }

    /// Split a raw store key into its channel and message kind
    ///
    /// Unambiguous because no suffix ends with another one.
    pub fn split_key(key: &str) -> Option<(&str, MessageKind)> {
        Self::ALL
            .into_iter()
            .find_map(|kind| key.strip_suffix(kind.suffix()).map(|channel| (channel, kind)))
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::AskForInit => "ASK_FOR_INITIALISATION",
            MessageKind::DataForInit => "DATA_FOR_INITIALISATION",
            MessageKind::DataUpdate => "DATA_UPDATE",
        };
        f.write_str(name)
    }
}

/// Physical store key for a message of `kind` on `channel`
pub fn derive_key(channel: &str, kind: MessageKind) -> String {
    let suffix = kind.suffix();
    let mut key = String::with_capacity(channel.len() + suffix.len());
    key.push_str(channel);
    key.push_str(suffix);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_key() {
        assert_eq!(
            derive_key("shared", MessageKind::AskForInit),
            "shared-ask-for-initialisation"
        );
        assert_eq!(
            derive_key("shared", MessageKind::DataForInit),
            "shared-data_initialisation"
        );
        assert_eq!(derive_key("shared", MessageKind::DataUpdate), "shared-data_update");
    }

    #[test]
    fn test_no_suffix_ends_another() {
        for a in MessageKind::ALL {
            for b in MessageKind::ALL {
                if a != b {
                    assert!(!a.suffix().ends_with(b.suffix()), "{a} / {b}");
                }
            }
        }
    }

    #[test]
    fn test_split_key() {
        for kind in MessageKind::ALL {
            let key = derive_key("cart", kind);
            assert_eq!(MessageKind::split_key(&key), Some(("cart", kind)));
        }
        assert_eq!(
            MessageKind::split_key("a-data_update-data_update"),
            Some(("a-data_update", MessageKind::DataUpdate))
        );
        assert_eq!(MessageKind::split_key("cart"), None);
    }

    #[test]
    fn test_channel_that_looks_like_a_key() {
        // "a-data_update" + update suffix must not meet "a" + any suffix
        let tricky = derive_key("a-data_update", MessageKind::DataUpdate);
        for kind in MessageKind::ALL {
            assert_ne!(tricky, derive_key("a", kind));
        }
    }

    fn any_kind() -> impl Strategy<Value = MessageKind> {
        prop_oneof![
            Just(MessageKind::AskForInit),
            Just(MessageKind::DataForInit),
            Just(MessageKind::DataUpdate),
        ]
    }

    proptest! {
        #[test]
        fn prop_derive_key_is_injective(
            c1 in "[a-z_-]{0,24}",
            c2 in "[a-z_-]{0,24}",
            k1 in any_kind(),
            k2 in any_kind(),
        ) {
            let same_input = c1 == c2 && k1 == k2;
            prop_assert_eq!(derive_key(&c1, k1) == derive_key(&c2, k2), same_input);
        }
    }
}
