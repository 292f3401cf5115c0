//! Matching a battle outcome back to an outgoing row.

use serde::Serialize;

use streakduel_types::{
    BattleId, BattleOutcome, ChallengeId, ChallengeRecord, ChallengeStatus, OpponentHint,
    RevealEvent, Timestamp,
};

use crate::state_machine::{Actor, BattleStateMachine};

/// How a reveal was matched against the outgoing list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutcomeMatch {
    /// The pending row with the locally accepted challenge's id.
    ByChallengeId(ChallengeId),
    /// The pending row whose target matches the reveal's opponent hint.
    ByOpponent(ChallengeId),
    /// No hint matched but exactly one row was pending.
    SolePending(ChallengeId),
    /// The viewer was the receiving side; no outgoing row is touched.
    Receiver,
}

impl OutcomeMatch {
    pub fn upgraded(&self) -> Option<&ChallengeId> {
        match self {
            Self::ByChallengeId(id) | Self::ByOpponent(id) | Self::SolePending(id) => Some(id),
            Self::Receiver => None,
        }
    }
}

/// The most recent battle result, relative to the viewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastOutcome {
    pub battle_id: BattleId,
    pub outcome: BattleOutcome,
    pub opponent: Option<OpponentHint>,
    pub decided_at: Timestamp,
}

impl LastOutcome {
    pub fn from_reveal(event: &RevealEvent, outcome: BattleOutcome) -> Self {
        Self {
            battle_id: event.battle_id.clone(),
            outcome,
            opponent: event.opponent.clone(),
            decided_at: event.decided_at,
        }
    }
}

/// Upgrade the outgoing row a reveal belongs to from `pending` to `accepted`.
///
/// A local accept passes the challenge id it accepted; that id alone decides,
/// and no pending row with that id means the viewer was the receiving side.
/// Otherwise pending rows are tried in order: the opponent hint, then the
/// single pending row if there is exactly one. The last rule assumes at most
/// one open outgoing challenge per install and is ambiguous beyond that.
pub fn upgrade_outgoing(
    outgoing: &mut [ChallengeRecord],
    event: &RevealEvent,
    challenge_id: Option<&ChallengeId>,
) -> OutcomeMatch {
    if let Some(id) = challenge_id {
        return match outgoing.iter().position(|r| r.is_pending() && &r.id == id) {
            Some(index) => {
                OutcomeMatch::ByChallengeId(mark_accepted(&mut outgoing[index], event.decided_at))
            }
            None => OutcomeMatch::Receiver,
        };
    }

    let by_opponent = event.opponent.as_ref().filter(|h| !h.is_empty()).and_then(|hint| {
        outgoing
            .iter()
            .position(|r| r.is_pending() && r.opponent().matches(hint))
    });
    if let Some(index) = by_opponent {
        return OutcomeMatch::ByOpponent(mark_accepted(&mut outgoing[index], event.decided_at));
    }

    let mut pending = outgoing
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_pending())
        .map(|(index, _)| index);
    let sole = match (pending.next(), pending.next()) {
        (Some(index), None) => Some(index),
        _ => None,
    };
    if let Some(index) = sole {
        return OutcomeMatch::SolePending(mark_accepted(&mut outgoing[index], event.decided_at));
    }

    OutcomeMatch::Receiver
}

fn mark_accepted(record: &mut ChallengeRecord, decided_at: Timestamp) -> ChallengeId {
    // Candidates are pending rows, so the client transition is always legal.
    if let Ok(status) =
        BattleStateMachine::transition(Actor::Client, record.status, ChallengeStatus::Accepted)
    {
        record.status = status;
        record.updated_at = decided_at;
    }
    record.id.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use streakduel_types::{EventId, InstallId, Participant};

    fn out(id: &str, target: &str, name: &str) -> ChallengeRecord {
        ChallengeRecord::outgoing(id, Participant::new(target, name))
    }

    fn reveal(opponent: Option<OpponentHint>) -> RevealEvent {
        RevealEvent {
            event_id: EventId::new("e1"),
            battle_id: BattleId::new("b1"),
            winner_install_id: InstallId::new("me"),
            loser_install_id: InstallId::new("t1"),
            animation_seed: 3,
            decided_at: Timestamp::new(500),
            opponent,
        }
    }

    fn hint_id(id: &str) -> Option<OpponentHint> {
        Some(OpponentHint {
            install_id: Some(InstallId::new(id)),
            display_name: None,
        })
    }

    #[test]
    fn challenge_id_match_comes_first() {
        let mut rows = vec![out("c1", "t1", "Tia"), out("c2", "t2", "Tom")];
        let m = upgrade_outgoing(&mut rows, &reveal(hint_id("t1")), Some(&"c2".into()));
        assert_eq!(m, OutcomeMatch::ByChallengeId("c2".into()));
        assert_eq!(rows[1].status, ChallengeStatus::Accepted);
        assert_eq!(rows[1].updated_at, Timestamp::new(500));
        assert!(rows[0].is_pending());
    }

    #[test]
    fn strict_match_by_install_id() {
        let mut rows = vec![out("c1", "t1", "Tia"), out("c2", "t2", "Tom")];
        let m = upgrade_outgoing(&mut rows, &reveal(hint_id("t2")), None);
        assert_eq!(m, OutcomeMatch::ByOpponent("c2".into()));
        assert!(rows[0].is_pending());
    }

    #[test]
    fn strict_match_by_name_when_id_unknown() {
        let mut rows = vec![out("c1", "t1", "Tia"), out("c2", "t2", "Tom")];
        let hint = OpponentHint {
            install_id: None,
            display_name: Some("Tia".into()),
        };
        let m = upgrade_outgoing(&mut rows, &reveal(Some(hint)), None);
        assert_eq!(m, OutcomeMatch::ByOpponent("c1".into()));
    }

    #[test]
    fn sole_pending_row_is_upgraded_without_hint() {
        let mut rows = vec![
            out("c0", "t0", "Old").with_status(ChallengeStatus::Declined),
            out("c1", "t1", "Tia"),
        ];
        let m = upgrade_outgoing(&mut rows, &reveal(None), None);
        assert_eq!(m, OutcomeMatch::SolePending("c1".into()));
        assert_eq!(rows[0].status, ChallengeStatus::Declined);
    }

    #[test]
    fn receiver_side_touches_nothing() {
        let mut rows = vec![out("c1", "t1", "Tia"), out("c2", "t2", "Tom")];
        let before = rows.clone();
        let m = upgrade_outgoing(&mut rows, &reveal(hint_id("stranger")), None);
        assert_eq!(m, OutcomeMatch::Receiver);
        assert_eq!(rows, before);

        let mut empty: Vec<ChallengeRecord> = Vec::new();
        assert_eq!(
            upgrade_outgoing(&mut empty, &reveal(None), None),
            OutcomeMatch::Receiver
        );
    }

    #[test]
    fn known_challenge_id_never_falls_back() {
        let mut rows = vec![out("c1", "t1", "Tia")];
        let m = upgrade_outgoing(&mut rows, &reveal(hint_id("t1")), Some(&"c-incoming".into()));
        assert_eq!(m, OutcomeMatch::Receiver);
        assert!(rows[0].is_pending());
    }

    #[test]
    fn terminal_rows_are_never_candidates() {
        let mut rows = vec![out("c1", "t1", "Tia").with_status(ChallengeStatus::Canceled)];
        let m = upgrade_outgoing(&mut rows, &reveal(hint_id("t1")), Some(&"c1".into()));
        assert_eq!(m, OutcomeMatch::Receiver);
        assert_eq!(rows[0].status, ChallengeStatus::Canceled);
    }
}
