//! Opaque server-assigned identifiers.
//!
//! All identifiers are strings on the wire. Each gets its own newtype so an
//! event id can never be used where a battle id is expected; the battle id,
//! not the event id, is what reveal dedup keys on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DuelError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Parse an identifier, rejecting blank input.
            pub fn parse(raw: &str) -> Result<Self, DuelError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(DuelError::EmptyId($label));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Per-device identity used in lieu of user accounts.
    InstallId,
    "install id"
);

string_id!(
    /// Server-assigned challenge id, stable across status changes.
    ChallengeId,
    "challenge id"
);

string_id!(
    /// Identifies one resolved battle. Distinct from the challenge id.
    BattleId,
    "battle id"
);

string_id!(
    /// Identifies one delivery attempt of a reveal.
    EventId,
    "event id"
);
