//! Identifier types for EmbedHub.
//!
//! Strongly-typed UUID newtypes so a session id can never be passed where a
//! vector record id is expected. Both are random (v4): session ids end up in
//! cookies and record ids in a third-party store, so neither should leak
//! timestamps.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declare a UUID newtype with a consistent API.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl Default for $name {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            /// Create a new random identifier.
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[inline]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Borrow the underlying UUID.
            #[inline]
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            #[inline]
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_uuid_id!(
    /// Identifier of a signed-in browser session (stored in the session cookie).
    SessionId
);

define_uuid_id!(
    /// Identifier of a single vector record (one embedded chunk).
    RecordId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(RecordId::new(), RecordId::new());
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_parse_round_trip() {
        let id = SessionId::new();
        let parsed: Result<SessionId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_record_ids_are_v4() {
        assert_eq!(RecordId::new().as_uuid().get_version_num(), 4);
    }
}
