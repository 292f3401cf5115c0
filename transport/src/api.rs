//! Transport traits the engine is written against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use streakduel_types::{
    AcceptOutcome, ChallengeId, ChallengeRecord, EventId, InstallId, RevealEvent, UserSummary,
};

use crate::TransportError;

/// Ordering of the incoming challenge list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomingSort {
    /// Newest first.
    #[default]
    Recent,
    /// Highest challenger streak first.
    Streak,
}

impl IncomingSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Streak => "streak",
        }
    }
}

impl fmt::Display for IncomingSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request/response operations that mutate or read challenge state on the server.
#[async_trait]
pub trait ChallengeTransport: Send + Sync {
    async fn search_users(&self, query: &str, limit: u32)
        -> Result<Vec<UserSummary>, TransportError>;

    /// Challenges other installs issued to `install_id`.
    async fn list_incoming(
        &self,
        install_id: &InstallId,
        limit: u32,
        sort: IncomingSort,
    ) -> Result<Vec<ChallengeRecord>, TransportError>;

    /// Challenges `install_id` issued. The server holds at most one.
    async fn list_outgoing(
        &self,
        install_id: &InstallId,
    ) -> Result<Vec<ChallengeRecord>, TransportError>;

    async fn create(
        &self,
        challenger: &InstallId,
        target: &InstallId,
    ) -> Result<ChallengeRecord, TransportError>;

    async fn cancel(
        &self,
        challenger: &InstallId,
        challenge_id: &ChallengeId,
    ) -> Result<(), TransportError>;

    async fn decline(
        &self,
        target: &InstallId,
        challenge_id: &ChallengeId,
    ) -> Result<(), TransportError>;

    /// Accept and fight. A 2xx body missing any outcome field is a
    /// [`TransportError::Protocol`].
    async fn accept(
        &self,
        target: &InstallId,
        challenge_id: &ChallengeId,
    ) -> Result<AcceptOutcome, TransportError>;

    /// Clear the server-side attention badge.
    async fn mark_opened(&self, install_id: &InstallId) -> Result<(), TransportError>;
}

/// Delivery channel for battle reveals.
#[async_trait]
pub trait RevealTransport: Send + Sync {
    /// Oldest undelivered reveal for `install_id`, or `None`.
    async fn poll_next(&self, install_id: &InstallId)
        -> Result<Option<RevealEvent>, TransportError>;

    /// Retire `event_id` so it is not returned again.
    async fn ack(&self, install_id: &InstallId, event_id: &EventId)
        -> Result<(), TransportError>;
}
