//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Playback instances are transient, so their identifiers only serve to
//! correlate log lines and snapshot streams. UUID v7 keeps them time-ordered.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one mounted playback instance.
    PlaybackId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct() {
        let a = PlaybackId::new();
        let b = PlaybackId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_matches_inner_uuid() {
        let id = PlaybackId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }

    #[test]
    fn uuid_round_trips_through_from() {
        let raw = Uuid::now_v7();
        let id = PlaybackId::from(raw);
        assert_eq!(Uuid::from(id), raw);
    }
}
