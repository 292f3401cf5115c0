//! Legal status transitions for a challenge.
//!
//! ```text
//!            ┌──> accepted   (server; client only right after its own accept)
//!  pending ──┼──> declined   (server)
//!            ├──> canceled   (server; client after a confirmed cancel)
//!            └──> expired    (server)
//! ```
//!
//! Every non-pending state is terminal.

use streakduel_types::{ChallengeStatus, DuelError};

/// What a cancel/dismiss intent does for a row in a given status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DismissAction {
    /// Ask the server to cancel; remove locally only once it confirms.
    CancelOnServer,
    /// Nothing to tell the server; drop the row from the local view.
    DropLocally,
}

/// Who is applying a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor {
    Server,
    Client,
}

pub struct BattleStateMachine;

impl BattleStateMachine {
    /// Whether `from -> to` is a legal step. Staying put is always legal.
    pub fn can_transition(from: ChallengeStatus, to: ChallengeStatus) -> bool {
        from == to || (from == ChallengeStatus::Pending && to != ChallengeStatus::Pending)
    }

    /// Whether `actor` may drive `from -> to` itself.
    ///
    /// The client may only apply `pending -> canceled` after a confirmed
    /// cancel and `pending -> accepted` right after its own accept succeeded.
    pub fn may_apply(actor: Actor, from: ChallengeStatus, to: ChallengeStatus) -> bool {
        if !Self::can_transition(from, to) {
            return false;
        }
        match actor {
            Actor::Server => true,
            Actor::Client => {
                from == to
                    || matches!(to, ChallengeStatus::Canceled | ChallengeStatus::Accepted)
            }
        }
    }

    /// Apply a transition, rejecting illegal ones.
    pub fn transition(
        actor: Actor,
        from: ChallengeStatus,
        to: ChallengeStatus,
    ) -> Result<ChallengeStatus, DuelError> {
        if Self::may_apply(actor, from, to) {
            Ok(to)
        } else {
            Err(DuelError::IllegalTransition { from, to })
        }
    }

    /// Reconcile a locally observed status with a freshly fetched one.
    ///
    /// The server is authoritative except that an observed terminal status is
    /// never presented as pending again.
    pub fn settle(local: ChallengeStatus, server: ChallengeStatus) -> ChallengeStatus {
        if local.is_terminal() && server == ChallengeStatus::Pending {
            local
        } else {
            server
        }
    }

    /// Dismiss policy keyed by current status.
    pub fn dismiss_action(status: ChallengeStatus) -> DismissAction {
        match status {
            ChallengeStatus::Pending | ChallengeStatus::Declined => DismissAction::CancelOnServer,
            ChallengeStatus::Accepted | ChallengeStatus::Canceled | ChallengeStatus::Expired => {
                DismissAction::DropLocally
            }
        }
    }
}
