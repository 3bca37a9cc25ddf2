//! String identifiers for chains and IBC objects.
//!
//! IBC identifiers (`07-tendermint-0`, `connection-3`, `channel-141`) are
//! only unique within the chain that issued them, so stores always key them
//! together with the origin [`ChainId`].

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Return the raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier!(
    /// Identifier of a zone (a chain), e.g. `cosmoshub-4`.
    ChainId
);

identifier!(
    /// Light client identifier, unique per origin chain.
    ClientId
);

identifier!(
    /// Connection identifier, unique per origin chain.
    ConnectionId
);

identifier!(
    /// Channel identifier, unique per origin chain.
    ChannelId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_plain_string() {
        let id = ChannelId::new("channel-0");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"channel-0\"");
        let back: ChannelId = serde_json::from_str("\"channel-0\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_is_raw_value() {
        assert_eq!(ChainId::from("osmosis-1").to_string(), "osmosis-1");
    }

    #[test]
    fn empty_identifier_is_detected() {
        assert!(ChainId::default().is_empty());
        assert!(!ChainId::new("a").is_empty());
    }
}
