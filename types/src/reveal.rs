//! Battle reveal notifications.

use serde::{Deserialize, Serialize};

use crate::{BattleId, EventId, InstallId, Timestamp};

/// Who the viewer fought, as far as the sender knows.
///
/// Used only to find the matching outgoing row; both fields may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentHint {
    #[serde(default)]
    pub install_id: Option<InstallId>,
    #[serde(default, alias = "name")]
    pub display_name: Option<String>,
}

impl OpponentHint {
    pub fn from_install(install_id: InstallId, display_name: impl Into<String>) -> Self {
        let name = display_name.into();
        Self {
            install_id: Some(install_id),
            display_name: (!name.trim().is_empty()).then_some(name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.install_id.is_none() && self.display_name.is_none()
    }
}

/// "Battle decided" notification.
///
/// `event_id` differs between redundant deliveries of the same battle;
/// `battle_id` does not.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealEvent {
    pub event_id: EventId,
    pub battle_id: BattleId,
    pub winner_install_id: InstallId,
    pub loser_install_id: InstallId,
    pub animation_seed: u64,
    pub decided_at: Timestamp,
    #[serde(default)]
    pub opponent: Option<OpponentHint>,
}

impl RevealEvent {
    /// The result relative to `viewer`, if the viewer fought in this battle.
    pub fn outcome_for(&self, viewer: &InstallId) -> Option<BattleOutcome> {
        if &self.winner_install_id == viewer {
            Some(BattleOutcome::Won)
        } else if &self.loser_install_id == viewer {
            Some(BattleOutcome::Lost)
        } else {
            None
        }
    }
}

/// Result of a battle from the viewer's side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BattleOutcome {
    Won,
    Lost,
}

/// Successful body of an accept request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptOutcome {
    pub battle_id: BattleId,
    pub winner_install_id: InstallId,
    pub loser_install_id: InstallId,
    pub animation_seed: u64,
    pub decided_at: Timestamp,
}

impl AcceptOutcome {
    /// Event id given to reveals synthesized from an accept response.
    ///
    /// Never sent to the server; local reveals are not acknowledged.
    pub fn local_event_id(&self) -> EventId {
        EventId::new(format!("local:{}", self.battle_id))
    }

    /// Build the reveal the accepting side shows without waiting for a poll.
    pub fn into_reveal(self, opponent: Option<OpponentHint>) -> RevealEvent {
        RevealEvent {
            event_id: self.local_event_id(),
            battle_id: self.battle_id,
            winner_install_id: self.winner_install_id,
            loser_install_id: self.loser_install_id,
            animation_seed: self.animation_seed,
            decided_at: self.decided_at,
            opponent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> AcceptOutcome {
        AcceptOutcome {
            battle_id: BattleId::new("b-7"),
            winner_install_id: InstallId::new("alice"),
            loser_install_id: InstallId::new("bob"),
            animation_seed: 99,
            decided_at: Timestamp::new(1_000),
        }
    }

    #[test]
    fn outcome_is_relative_to_viewer() {
        let reveal = outcome().into_reveal(None);
        assert_eq!(reveal.outcome_for(&"alice".into()), Some(BattleOutcome::Won));
        assert_eq!(reveal.outcome_for(&"bob".into()), Some(BattleOutcome::Lost));
        assert_eq!(reveal.outcome_for(&"carol".into()), None);
    }

    #[test]
    fn local_reveal_keeps_battle_id_and_marks_event_id() {
        let reveal = outcome().into_reveal(Some(OpponentHint::from_install("bob".into(), "")));
        assert_eq!(reveal.battle_id.as_str(), "b-7");
        assert_eq!(reveal.event_id.as_str(), "local:b-7");
        let hint = reveal.opponent.unwrap();
        assert_eq!(hint.display_name, None);
        assert!(!hint.is_empty());
    }

    #[test]
    fn decodes_wire_event_with_name_alias() {
        let json = r#"{
            "eventId": "e1", "battleId": "b1",
            "winnerInstallId": "w", "loserInstallId": "l",
            "animationSeed": 12, "decidedAt": 1700000000,
            "opponent": { "name": "Wes" }
        }"#;
        let ev: RevealEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.opponent.unwrap().display_name.as_deref(), Some("Wes"));
        assert_eq!(ev.decided_at, Timestamp::new(1_700_000_000));
    }
}
