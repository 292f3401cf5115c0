//! Business rejection codes returned by the challenge server.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A named rejection from the server.
///
/// Unknown codes are kept verbatim so the presentation-side message table can
/// grow without a client release dropping information.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Streak gap between the two players is too large.
    NotEligible,
    /// The challenger already has the maximum number of open challenges.
    HasPending,
    /// One of the streaks moved since the challenge was issued.
    StreaksChanged,
    /// The challenge expired before it was answered.
    Expired,
    /// Anything else the server sends.
    Unknown(String),
}

impl ErrorCode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "NOT_ELIGIBLE" => Self::NotEligible,
            "HAS_PENDING" => Self::HasPending,
            "STREAKS_CHANGED" => Self::StreaksChanged,
            "EXPIRED" => Self::Expired,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The code exactly as the server spells it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotEligible => "NOT_ELIGIBLE",
            Self::HasPending => "HAS_PENDING",
            Self::StreaksChanged => "STREAKS_CHANGED",
            Self::Expired => "EXPIRED",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip_verbatim() {
        for raw in ["NOT_ELIGIBLE", "HAS_PENDING", "STREAKS_CHANGED", "EXPIRED"] {
            let code = ErrorCode::parse(raw);
            assert!(!matches!(code, ErrorCode::Unknown(_)));
            assert_eq!(code.as_str(), raw);
        }
    }

    #[test]
    fn unknown_code_is_preserved() {
        let code: ErrorCode = serde_json::from_str("\"RATE_LIMITED\"").unwrap();
        assert_eq!(code, ErrorCode::Unknown("RATE_LIMITED".into()));
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"RATE_LIMITED\"");
    }
}
