//! Challenge records and the participant on the other side of them.

use serde::{Deserialize, Serialize};

use crate::{ChallengeId, ChallengeStatus, InstallId, OpponentHint, Timestamp};

/// Snapshot of a player as the server saw them when the list was fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub install_id: InstallId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub current_streak_at_snapshot: u32,
}

impl Participant {
    pub fn new(install_id: impl Into<InstallId>, display_name: impl Into<String>) -> Self {
        Self {
            install_id: install_id.into(),
            display_name: display_name.into(),
            current_streak_at_snapshot: 0,
        }
    }

    pub fn with_streak(mut self, streak: u32) -> Self {
        self.current_streak_at_snapshot = streak;
        self
    }

    /// Match against a reveal's opponent hint.
    ///
    /// The install id decides when the hint carries one; the display name is
    /// only consulted when it does not.
    pub fn matches(&self, hint: &OpponentHint) -> bool {
        if let Some(install_id) = &hint.install_id {
            return &self.install_id == install_id;
        }
        match &hint.display_name {
            Some(name) => {
                let name = name.trim();
                !name.is_empty() && self.display_name.trim() == name
            }
            None => false,
        }
    }
}

/// Which list a record was fetched from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// The populated side of a challenge.
///
/// Incoming records carry the challenger, outgoing records carry the target;
/// never both, never neither.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Counterpart {
    Incoming { challenger: Participant },
    Outgoing { target: Participant },
}

impl Counterpart {
    pub fn direction(&self) -> Direction {
        match self {
            Self::Incoming { .. } => Direction::Incoming,
            Self::Outgoing { .. } => Direction::Outgoing,
        }
    }

    /// The player on the other side from the viewer.
    pub fn opponent(&self) -> &Participant {
        match self {
            Self::Incoming { challenger } => challenger,
            Self::Outgoing { target } => target,
        }
    }
}

/// One challenge as the client currently knows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRecord {
    pub id: ChallengeId,
    #[serde(default)]
    pub status: ChallengeStatus,
    pub counterpart: Counterpart,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl ChallengeRecord {
    pub fn outgoing(id: impl Into<ChallengeId>, target: Participant) -> Self {
        Self {
            id: id.into(),
            status: ChallengeStatus::Pending,
            counterpart: Counterpart::Outgoing { target },
            created_at: Timestamp::EPOCH,
            updated_at: Timestamp::EPOCH,
        }
    }

    pub fn incoming(id: impl Into<ChallengeId>, challenger: Participant) -> Self {
        Self {
            id: id.into(),
            status: ChallengeStatus::Pending,
            counterpart: Counterpart::Incoming { challenger },
            created_at: Timestamp::EPOCH,
            updated_at: Timestamp::EPOCH,
        }
    }

    pub fn with_status(mut self, status: ChallengeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_times(mut self, created_at: Timestamp, updated_at: Timestamp) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub fn direction(&self) -> Direction {
        self.counterpart.direction()
    }

    pub fn opponent(&self) -> &Participant {
        self.counterpart.opponent()
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChallengeStatus::Pending
    }
}
