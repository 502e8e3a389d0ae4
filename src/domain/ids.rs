//! Type-safe identifiers for users, reward events and ledger transactions.
//!
//! Each identifier is a newtype wrapper around [`uuid::Uuid`] (v4) so that
//! a user id can never be passed where a reward or transaction id is
//! expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wraps an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of a user account in the user directory.
    UserId
);

uuid_newtype!(
    /// Identifier of a single reward event row.
    RewardId
);

uuid_newtype!(
    /// Groups the legs of one double-entry transaction.
    TransactionId
);

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(UserId::new(), UserId::new());
        assert_ne!(TransactionId::new(), TransactionId::new());
    }

    #[test]
    fn parses_hyphenated_uuid() {
        let raw = "7f9c24e8-3b12-4fef-91e0-3f5d7c2e1a9b";
        let Ok(id) = raw.parse::<UserId>() else {
            panic!("valid uuid should parse");
        };
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        let parsed = " 7f9c24e8-3b12-4fef-91e0-3f5d7c2e1a9b ".parse::<RewardId>();
        assert!(parsed.is_ok());
    }

    #[test]
    fn rejects_malformed_uuid() {
        assert!("not-a-uuid".parse::<UserId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let uuid = uuid::Uuid::new_v4();
        let id = UserId::from_uuid(uuid);
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn uuid_round_trip() {
        let uuid = uuid::Uuid::new_v4();
        let id = RewardId::from(uuid);
        assert_eq!(uuid::Uuid::from(id), uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }
}
