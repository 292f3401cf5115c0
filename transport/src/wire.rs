//! JSON shapes exchanged with the server and their conversion to domain types.
//!
//! The server sends challenge rows with nullable `challenger` / `target`
//! fields; which one is populated depends on the list the row came from.
//! Conversion folds that into [`Counterpart`] and drops rows whose expected
//! side is missing.

use serde::{Deserialize, Serialize};

use streakduel_types::{
    AcceptOutcome, BattleId, ChallengeId, ChallengeRecord, ChallengeStatus, Counterpart,
    Direction, ErrorCode, EventId, InstallId, Participant, Timestamp,
};

use crate::TransportError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParticipantWire {
    pub install_id: InstallId,
    #[serde(default, alias = "name")]
    pub display_name: Option<String>,
    #[serde(default, alias = "currentStreak")]
    pub current_streak_at_snapshot: Option<u32>,
}

impl From<ParticipantWire> for Participant {
    fn from(w: ParticipantWire) -> Self {
        Participant::new(w.install_id, w.display_name.unwrap_or_default())
            .with_streak(w.current_streak_at_snapshot.unwrap_or(0))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChallengeWire {
    pub id: ChallengeId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub challenger: Option<ParticipantWire>,
    #[serde(default)]
    pub target: Option<ParticipantWire>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl ChallengeWire {
    /// Convert a row fetched from the `direction` list.
    pub fn into_record(self, direction: Direction) -> Result<ChallengeRecord, TransportError> {
        let status: ChallengeStatus = self
            .status
            .as_deref()
            .unwrap_or("")
            .parse()
            .map_err(|e| TransportError::Decode(format!("challenge {}: {e}", self.id)))?;

        let counterpart = match direction {
            Direction::Incoming => Counterpart::Incoming {
                challenger: self
                    .challenger
                    .ok_or_else(|| missing_side(&self.id, "challenger"))?
                    .into(),
            },
            Direction::Outgoing => Counterpart::Outgoing {
                target: self
                    .target
                    .ok_or_else(|| missing_side(&self.id, "target"))?
                    .into(),
            },
        };

        let created_at = self.created_at.unwrap_or_default();
        Ok(ChallengeRecord {
            id: self.id,
            status,
            counterpart,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        })
    }

    /// Convert a create response. Some deployments echo only id and status;
    /// the target is then filled from the request.
    pub fn into_created(mut self, target: &InstallId) -> Result<ChallengeRecord, TransportError> {
        if self.target.is_none() {
            self.target = Some(ParticipantWire {
                install_id: target.clone(),
                display_name: None,
                current_streak_at_snapshot: None,
            });
        }
        self.into_record(Direction::Outgoing)
    }
}

fn missing_side(id: &ChallengeId, side: &str) -> TransportError {
    TransportError::Decode(format!("challenge {id}: missing {side}"))
}

/// Convert a list, skipping rows that cannot be represented.
///
/// Each element is decoded on its own so one bad row (unparseable id, unknown
/// status, missing side) costs only that row.
pub(crate) fn into_records(
    rows: Vec<serde_json::Value>,
    direction: Direction,
) -> Vec<ChallengeRecord> {
    rows.into_iter()
        .filter(|v| !v.is_null())
        .filter_map(|value| {
            let record = serde_json::from_value::<ChallengeWire>(value)
                .map_err(|e| TransportError::Decode(e.to_string()))
                .and_then(|row| row.into_record(direction));
            match record {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, ?direction, "dropping malformed challenge row");
                    None
                }
            }
        })
        .collect()
}

/// The outgoing endpoint returns a single object, `null`, or (tolerated) an array.
pub(crate) fn outgoing_rows(body: serde_json::Value) -> Vec<serde_json::Value> {
    match body {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items,
        other => vec![other],
    }
}

/// Accept body with every field optional so a partial body is a protocol
/// anomaly rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AcceptWire {
    #[serde(default)]
    pub battle_id: Option<String>,
    #[serde(default)]
    pub winner_install_id: Option<String>,
    #[serde(default)]
    pub loser_install_id: Option<String>,
    #[serde(default)]
    pub animation_seed: Option<u64>,
    #[serde(default)]
    pub decided_at: Option<Timestamp>,
}

impl AcceptWire {
    pub fn validate(self) -> Result<AcceptOutcome, TransportError> {
        fn required(value: Option<String>, field: &str) -> Result<String, TransportError> {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| TransportError::Protocol(format!("accept response missing {field}")))
        }

        Ok(AcceptOutcome {
            battle_id: BattleId::new(required(self.battle_id, "battleId")?),
            winner_install_id: InstallId::new(required(self.winner_install_id, "winnerInstallId")?),
            loser_install_id: InstallId::new(required(self.loser_install_id, "loserInstallId")?),
            animation_seed: self
                .animation_seed
                .ok_or_else(|| TransportError::Protocol("accept response missing animationSeed".into()))?,
            decided_at: self
                .decided_at
                .ok_or_else(|| TransportError::Protocol("accept response missing decidedAt".into()))?,
        })
    }
}

/// Error body of a non-2xx response. Servers spell the field either way.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub(crate) fn parse_error_code(body: &str) -> Option<ErrorCode> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .code
        .or(parsed.error)
        .filter(|c| !c.trim().is_empty())
        .map(|c| ErrorCode::parse(&c))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateRequest<'a> {
    pub challenger_install_id: &'a InstallId,
    pub target_install_id: &'a InstallId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CancelRequest<'a> {
    pub challenger_install_id: &'a InstallId,
    pub challenge_id: &'a ChallengeId,
}

/// Body shared by decline and accept.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RespondRequest<'a> {
    pub target_install_id: &'a InstallId,
    pub challenge_id: &'a ChallengeId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AckRequest<'a> {
    pub install_id: &'a InstallId,
    pub event_id: &'a EventId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InstallRequest<'a> {
    pub install_id: &'a InstallId,
}
