//! Challenge lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DuelError;

/// The status of a challenge as last reported by the server.
///
/// `Pending` is the only non-terminal state. A record whose status field is
/// absent on the wire is `Pending`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// Issued and waiting for the target to respond.
    #[default]
    Pending,
    /// The target accepted; a battle was fought.
    Accepted,
    /// The target declined.
    Declined,
    /// The challenger withdrew it.
    Canceled,
    /// Nobody responded in time.
    Expired,
}

impl ChallengeStatus {
    pub const ALL: [ChallengeStatus; 5] = [
        Self::Pending,
        Self::Accepted,
        Self::Declined,
        Self::Canceled,
        Self::Expired,
    ];

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeStatus {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            "expired" => Ok(Self::Expired),
            other => Err(DuelError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_open() {
        for status in ChallengeStatus::ALL {
            assert_eq!(status.is_terminal(), status != ChallengeStatus::Pending);
        }
    }

    #[test]
    fn parses_both_spellings_of_canceled() {
        assert_eq!("canceled".parse::<ChallengeStatus>(), Ok(ChallengeStatus::Canceled));
        assert_eq!("Cancelled".parse::<ChallengeStatus>(), Ok(ChallengeStatus::Canceled));
        assert_eq!("".parse::<ChallengeStatus>(), Ok(ChallengeStatus::Pending));
        assert!("won".parse::<ChallengeStatus>().is_err());
    }

    #[test]
    fn wire_form_is_lowercase() {
        let json = serde_json::to_string(&ChallengeStatus::Declined).unwrap();
        assert_eq!(json, "\"declined\"");
    }
}
