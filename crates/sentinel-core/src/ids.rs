//! Branded ID newtypes for type safety.
//!
//! Every entity has a distinct ID type implemented as a newtype wrapper
//! around `String`, so a content ID can never be passed where a schedule
//! entry ID is expected. Freshly minted IDs are UUID v7 (time-ordered).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
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
                Self(s.to_string())
            }
        }
    };
}

branded_id!(
    /// Identifier of an upstream content item.
    ContentId
);

branded_id!(
    /// Identifier of a schedule entry.
    EntryId
);

branded_id!(
    /// Identifier of an encrypted archive snapshot.
    SnapshotId
);

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        let a = EntryId::new();
        let b = EntryId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn v7_ids_are_time_ordered() {
        let a = EntryId::new();
        let b = EntryId::new();
        assert!(a.as_str() <= b.as_str());
    }

    #[test]
    fn from_str_round_trip() {
        let id = ContentId::from("content-42");
        assert_eq!(id.as_str(), "content-42");
        assert_eq!(id.to_string(), "content-42");
        assert_eq!(id.into_inner(), "content-42");
    }

    #[test]
    fn serde_is_transparent() {
        let id = ContentId::from("abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
        let back: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
