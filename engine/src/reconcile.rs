//! Reconciliation of server-authoritative lists with locally retained rows.
//!
//! The outgoing list keeps two kinds of rows the latest fetch may not return:
//! terminal rows (a `declined` row the user has not dismissed yet, an
//! `accepted` row from a local accept) and the one `pending` row whose battle
//! reveal is in flight. Everything else comes from the server.
//!
//! Merging moves records, it never rebuilds them: local-only rows keep their
//! relative order ahead of the server rows, and server rows keep the server's
//! order, so a consuming UI keyed by id sees no churn for unchanged ids.

use std::collections::{HashMap, HashSet};

use streakduel_types::{
    ChallengeId, ChallengeRecord, ChallengeStatus, InstallId, OpponentHint, RevealEvent,
};

use crate::dedup::DedupRegistry;
use crate::outcome::{upgrade_outgoing, LastOutcome, OutcomeMatch};
use crate::state_machine::BattleStateMachine;

/// Merge a freshly fetched outgoing list with the previous local one.
///
/// 1. Keep local rows that are terminal, or pending and matching the
///    in-flight reveal's opponent.
/// 2. Drop kept rows whose id the server returned.
/// 3. Kept rows first, then the server rows.
///
/// On an id collision the server row wins, except that a row already seen
/// terminal is never presented as pending again.
pub fn merge_outgoing(
    server: Vec<ChallengeRecord>,
    local: Vec<ChallengeRecord>,
    in_flight: Option<&OpponentHint>,
) -> Vec<ChallengeRecord> {
    let server_ids: HashSet<&ChallengeId> = server.iter().map(|r| &r.id).collect();

    let mut kept = Vec::new();
    let mut terminal_local: HashMap<ChallengeId, ChallengeRecord> = HashMap::new();
    for record in local {
        if server_ids.contains(&record.id) {
            if record.status.is_terminal() {
                terminal_local.insert(record.id.clone(), record);
            }
            continue;
        }
        let retain = !record.is_pending()
            || in_flight.is_some_and(|hint| record.opponent().matches(hint));
        if retain {
            kept.push(record);
        }
    }
    drop(server_ids);

    kept.reserve(server.len());
    for record in server {
        let settled = match terminal_local.remove(&record.id) {
            Some(local)
                if BattleStateMachine::settle(local.status, record.status) != record.status =>
            {
                local
            }
            _ => record,
        };
        kept.push(settled);
    }
    kept
}

/// Badge rule: a declined outgoing row or any incoming challenge.
pub fn needs_attention(outgoing: &[ChallengeRecord], incoming: &[ChallengeRecord]) -> bool {
    !incoming.is_empty() || outgoing.iter().any(|r| r.status == ChallengeStatus::Declined)
}

/// Owner of the challenge lists, the last outcome and the dedup registry.
///
/// Every mutation recomputes the attention flag before returning.
#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    incoming: Vec<ChallengeRecord>,
    outgoing: Vec<ChallengeRecord>,
    attention: bool,
    last_outcome: Option<LastOutcome>,
    registry: DedupRegistry,
}

impl ReconciliationEngine {
    pub fn new(registry: DedupRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn incoming(&self) -> &[ChallengeRecord] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[ChallengeRecord] {
        &self.outgoing
    }

    pub fn needs_attention(&self) -> bool {
        self.attention
    }

    pub fn last_outcome(&self) -> Option<&LastOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn registry(&self) -> &DedupRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DedupRegistry {
        &mut self.registry
    }

    pub fn find_incoming(&self, id: &ChallengeId) -> Option<&ChallengeRecord> {
        self.incoming.iter().find(|r| &r.id == id)
    }

    pub fn find_outgoing(&self, id: &ChallengeId) -> Option<&ChallengeRecord> {
        self.outgoing.iter().find(|r| &r.id == id)
    }

    /// Replace the incoming list. The server is the only source of incoming rows.
    pub fn apply_incoming(&mut self, server: Vec<ChallengeRecord>) {
        self.incoming = server;
        self.recompute_attention();
    }

    /// Merge a fetched outgoing list into the local one.
    pub fn apply_outgoing(&mut self, server: Vec<ChallengeRecord>, in_flight: Option<&OpponentHint>) {
        let local = std::mem::take(&mut self.outgoing);
        self.outgoing = merge_outgoing(server, local, in_flight);
        self.recompute_attention();
    }

    /// Insert or replace one outgoing row (a create response).
    pub fn upsert_outgoing(&mut self, record: ChallengeRecord) {
        match self.outgoing.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                let status = BattleStateMachine::settle(existing.status, record.status);
                *existing = record;
                existing.status = status;
            }
            None => self.outgoing.push(record),
        }
        self.recompute_attention();
    }

    pub fn remove_outgoing(&mut self, id: &ChallengeId) -> Option<ChallengeRecord> {
        let index = self.outgoing.iter().position(|r| &r.id == id)?;
        let removed = self.outgoing.remove(index);
        self.recompute_attention();
        Some(removed)
    }

    pub fn remove_incoming(&mut self, id: &ChallengeId) -> Option<ChallengeRecord> {
        let index = self.incoming.iter().position(|r| &r.id == id)?;
        let removed = self.incoming.remove(index);
        self.recompute_attention();
        Some(removed)
    }

    /// Apply a reveal: upgrade the matching outgoing row and record the
    /// outcome relative to `viewer`.
    pub fn apply_outcome(
        &mut self,
        event: &RevealEvent,
        viewer: &InstallId,
        challenge_id: Option<&ChallengeId>,
    ) -> OutcomeMatch {
        let matched = upgrade_outgoing(&mut self.outgoing, event, challenge_id);
        match event.outcome_for(viewer) {
            Some(outcome) => self.last_outcome = Some(LastOutcome::from_reveal(event, outcome)),
            None => tracing::warn!(
                battle_id = %event.battle_id,
                %viewer,
                "reveal names neither side as the viewer"
            ),
        }
        self.recompute_attention();
        matched
    }

    fn recompute_attention(&mut self) {
        self.attention = needs_attention(&self.outgoing, &self.incoming);
    }
}
