//! Nullable challenge server: an in-memory stand-in for the HTTP API.
//!
//! Implements the same rules the real server enforces (one open outgoing
//! challenge per install, streak-gap eligibility, conflict on races) so
//! engine tests can run two installs against one shared instance.
//! Every call is recorded for assertions.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use streakduel_transport::{ChallengeTransport, IncomingSort, RevealTransport, TransportError};
use streakduel_types::{
    AcceptOutcome, BattleId, ChallengeId, ChallengeRecord, ChallengeStatus, ErrorCode, EventId,
    InstallId, OpponentHint, Participant, RevealEvent, Timestamp, UserSummary,
};

/// Largest streak difference a challenge may span by default.
pub const DEFAULT_MAX_STREAK_GAP: u32 = 5;

/// A recorded transport call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    SearchUsers(String),
    ListIncoming(InstallId),
    ListOutgoing(InstallId),
    Create {
        challenger: InstallId,
        target: InstallId,
    },
    Cancel(ChallengeId),
    Decline(ChallengeId),
    Accept(ChallengeId),
    MarkOpened(InstallId),
    PollNext(InstallId),
    Ack(EventId),
}

#[derive(Clone, Debug)]
struct StoredChallenge {
    id: ChallengeId,
    challenger: InstallId,
    target: InstallId,
    challenger_streak: u32,
    target_streak: u32,
    status: ChallengeStatus,
    /// A declined challenge the challenger dismissed.
    cleared: bool,
    created_at: Timestamp,
    updated_at: Timestamp,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<InstallId, UserSummary>,
    challenges: Vec<StoredChallenge>,
    reveals: HashMap<InstallId, VecDeque<RevealEvent>>,
    calls: Vec<Call>,
    failures: VecDeque<TransportError>,
    ack_failures: usize,
    lost_acks: usize,
    offline: bool,
    malformed_accept: bool,
    duplicate_reveals: bool,
    forced_winner: Option<InstallId>,
    max_streak_gap: u32,
    now: u64,
    next_challenge: u64,
    next_battle: u64,
    next_event: u64,
}

impl Inner {
    /// Record `call`, then fail it if the server is offline or a failure is queued.
    fn enter(&mut self, call: Call) -> Result<(), TransportError> {
        self.calls.push(call);
        if self.offline {
            return Err(TransportError::Network("null transport offline".into()));
        }
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn tick(&mut self) -> Timestamp {
        self.now += 1;
        Timestamp::new(self.now)
    }

    fn streak(&self, install: &InstallId) -> u32 {
        self.users.get(install).map_or(0, |u| u.current_streak)
    }

    fn participant(&self, install: &InstallId, snapshot: u32) -> Participant {
        let name = self
            .users
            .get(install)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| install.to_string());
        Participant::new(install.clone(), name).with_streak(snapshot)
    }

    fn hint(&self, install: &InstallId) -> OpponentHint {
        let name = self
            .users
            .get(install)
            .map(|u| u.name.clone())
            .unwrap_or_default();
        OpponentHint::from_install(install.clone(), name)
    }

    fn find_mut(&mut self, id: &ChallengeId) -> Option<&mut StoredChallenge> {
        self.challenges.iter_mut().find(|c| &c.id == id)
    }

    fn outgoing_record(&self, c: &StoredChallenge) -> ChallengeRecord {
        ChallengeRecord::outgoing(c.id.clone(), self.participant(&c.target, c.target_streak))
            .with_status(c.status)
            .with_times(c.created_at, c.updated_at)
    }

    fn incoming_record(&self, c: &StoredChallenge) -> ChallengeRecord {
        ChallengeRecord::incoming(
            c.id.clone(),
            self.participant(&c.challenger, c.challenger_streak),
        )
        .with_status(c.status)
        .with_times(c.created_at, c.updated_at)
    }

    fn enqueue_reveal(&mut self, viewer: &InstallId, outcome: &AcceptOutcome, opponent: &InstallId) {
        let copies = if self.duplicate_reveals { 2 } else { 1 };
        for _ in 0..copies {
            self.next_event += 1;
            let event = RevealEvent {
                event_id: EventId::new(format!("e-{}", self.next_event)),
                battle_id: outcome.battle_id.clone(),
                winner_install_id: outcome.winner_install_id.clone(),
                loser_install_id: outcome.loser_install_id.clone(),
                animation_seed: outcome.animation_seed,
                decided_at: outcome.decided_at,
                opponent: Some(self.hint(opponent)),
            };
            self.reveals.entry(viewer.clone()).or_default().push_back(event);
        }
    }
}

fn conflict() -> TransportError {
    TransportError::Status(409)
}

fn rejected(status: u16, code: ErrorCode) -> TransportError {
    TransportError::Rejected { status, code }
}

/// In-memory challenge server for tests.
///
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullTransport {
    inner: Mutex<Inner>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                max_streak_gap: DEFAULT_MAX_STREAK_GAP,
                ..Inner::default()
            }),
        }
    }

    /// Register an install the server knows about.
    pub fn add_user(&self, install_id: &str, name: &str, streak: u32) -> &Self {
        let install = InstallId::new(install_id);
        self.inner.lock().unwrap().users.insert(
            install.clone(),
            UserSummary {
                install_id: install,
                name: name.to_string(),
                current_streak: streak,
            },
        );
        self
    }

    pub fn set_streak(&self, install_id: &InstallId, streak: u32) {
        if let Some(user) = self.inner.lock().unwrap().users.get_mut(install_id) {
            user.current_streak = streak;
        }
    }

    pub fn streak_of(&self, install_id: &InstallId) -> u32 {
        self.inner.lock().unwrap().streak(install_id)
    }

    pub fn set_max_streak_gap(&self, gap: u32) {
        self.inner.lock().unwrap().max_streak_gap = gap;
    }

    /// While offline every call fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    /// Fail the next call (of any kind) with `err`.
    pub fn fail_next(&self, err: TransportError) {
        self.inner.lock().unwrap().failures.push_back(err);
    }

    /// Fail the next ack with a network error, leaving the event queued.
    /// Other calls are unaffected.
    pub fn fail_next_ack(&self) {
        self.inner.lock().unwrap().ack_failures += 1;
    }

    /// Answer the next ack with success but keep the event queued, as a
    /// server that lost the write would.
    pub fn lose_next_ack(&self) {
        self.inner.lock().unwrap().lost_acks += 1;
    }

    /// Successful accepts answer with a body missing its animation seed.
    pub fn set_malformed_accept(&self, malformed: bool) {
        self.inner.lock().unwrap().malformed_accept = malformed;
    }

    /// Deliver every reveal twice under different event ids.
    pub fn set_duplicate_reveals(&self, duplicate: bool) {
        self.inner.lock().unwrap().duplicate_reveals = duplicate;
    }

    /// Decide every battle for `winner` when it took part.
    pub fn force_winner(&self, winner: Option<InstallId>) {
        self.inner.lock().unwrap().forced_winner = winner;
    }

    /// Server-side expiry of a pending challenge.
    pub fn expire(&self, challenge_id: &ChallengeId) {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.tick();
        if let Some(c) = inner.find_mut(challenge_id) {
            if c.status == ChallengeStatus::Pending {
                c.status = ChallengeStatus::Expired;
                c.updated_at = now;
            }
        }
    }

    pub fn status_of(&self, challenge_id: &ChallengeId) -> Option<ChallengeStatus> {
        let inner = self.inner.lock().unwrap();
        inner
            .challenges
            .iter()
            .find(|c| &c.id == challenge_id)
            .map(|c| c.status)
    }

    /// Reveals still waiting for `install_id` to acknowledge them.
    pub fn undelivered(&self, install_id: &InstallId) -> Vec<RevealEvent> {
        let inner = self.inner.lock().unwrap();
        inner
            .reveals
            .get(install_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.inner.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    /// Event ids acknowledged so far, in call order (repeats included).
    pub fn acks(&self) -> Vec<EventId> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Ack(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeTransport for NullTransport {
    async fn search_users(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<UserSummary>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(Call::SearchUsers(query.to_string()))?;
        let needle = query.to_lowercase();
        Ok(inner
            .users
            .values()
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_incoming(
        &self,
        install_id: &InstallId,
        limit: u32,
        sort: IncomingSort,
    ) -> Result<Vec<ChallengeRecord>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(Call::ListIncoming(install_id.clone()))?;
        let mut rows: Vec<&StoredChallenge> = inner
            .challenges
            .iter()
            .filter(|c| &c.target == install_id && c.status == ChallengeStatus::Pending)
            .collect();
        match sort {
            IncomingSort::Recent => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            IncomingSort::Streak => {
                rows.sort_by(|a, b| b.challenger_streak.cmp(&a.challenger_streak))
            }
        }
        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|c| inner.incoming_record(c))
            .collect())
    }

    async fn list_outgoing(
        &self,
        install_id: &InstallId,
    ) -> Result<Vec<ChallengeRecord>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(Call::ListOutgoing(install_id.clone()))?;
        let open = inner.challenges.iter().rev().find(|c| {
            &c.challenger == install_id
                && !c.cleared
                && matches!(c.status, ChallengeStatus::Pending | ChallengeStatus::Declined)
        });
        Ok(open.map(|c| inner.outgoing_record(c)).into_iter().collect())
    }

    async fn create(
        &self,
        challenger: &InstallId,
        target: &InstallId,
    ) -> Result<ChallengeRecord, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(Call::Create {
            challenger: challenger.clone(),
            target: target.clone(),
        })?;

        if inner
            .challenges
            .iter()
            .any(|c| &c.challenger == challenger && c.status == ChallengeStatus::Pending)
        {
            return Err(rejected(409, ErrorCode::HasPending));
        }
        let challenger_streak = inner.streak(challenger);
        let target_streak = inner.streak(target);
        if challenger == target || challenger_streak.abs_diff(target_streak) > inner.max_streak_gap
        {
            return Err(rejected(400, ErrorCode::NotEligible));
        }

        inner.next_challenge += 1;
        let now = inner.tick();
        let stored = StoredChallenge {
            id: ChallengeId::new(format!("c-{}", inner.next_challenge)),
            challenger: challenger.clone(),
            target: target.clone(),
            challenger_streak,
            target_streak,
            status: ChallengeStatus::Pending,
            cleared: false,
            created_at: now,
            updated_at: now,
        };
        let record = inner.outgoing_record(&stored);
        inner.challenges.push(stored);
        Ok(record)
    }

    async fn cancel(
        &self,
        challenger: &InstallId,
        challenge_id: &ChallengeId,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(Call::Cancel(challenge_id.clone()))?;
        let now = inner.tick();
        let Some(c) = inner.find_mut(challenge_id) else {
            return Err(TransportError::Status(404));
        };
        if &c.challenger != challenger {
            return Err(TransportError::Status(403));
        }
        match c.status {
            ChallengeStatus::Pending => {
                c.status = ChallengeStatus::Canceled;
                c.updated_at = now;
                Ok(())
            }
            ChallengeStatus::Declined => {
                c.cleared = true;
                Ok(())
            }
            _ => Err(conflict()),
        }
    }

    async fn decline(
        &self,
        target: &InstallId,
        challenge_id: &ChallengeId,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(Call::Decline(challenge_id.clone()))?;
        let now = inner.tick();
        let Some(c) = inner.find_mut(challenge_id) else {
            return Err(TransportError::Status(404));
        };
        if &c.target != target {
            return Err(TransportError::Status(403));
        }
        if c.status != ChallengeStatus::Pending {
            return Err(conflict());
        }
        c.status = ChallengeStatus::Declined;
        c.updated_at = now;
        Ok(())
    }

    async fn accept(
        &self,
        target: &InstallId,
        challenge_id: &ChallengeId,
    ) -> Result<AcceptOutcome, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(Call::Accept(challenge_id.clone()))?;
        let now = inner.tick();

        let Some(stored) = inner.challenges.iter().find(|c| &c.id == challenge_id).cloned() else {
            return Err(TransportError::Status(404));
        };
        if &stored.target != target {
            return Err(TransportError::Status(403));
        }
        match stored.status {
            ChallengeStatus::Pending => {}
            ChallengeStatus::Expired => return Err(rejected(410, ErrorCode::Expired)),
            _ => return Err(conflict()),
        }

        let streaks_moved = inner.streak(&stored.challenger) != stored.challenger_streak
            || inner.streak(&stored.target) != stored.target_streak;
        if streaks_moved {
            if let Some(c) = inner.find_mut(challenge_id) {
                c.status = ChallengeStatus::Canceled;
                c.updated_at = now;
            }
            return Err(rejected(409, ErrorCode::StreaksChanged));
        }

        // Higher streak wins, ties go to the accepting side.
        let challenger_wins = match &inner.forced_winner {
            Some(w) if w == &stored.challenger => true,
            Some(w) if w == &stored.target => false,
            _ => stored.challenger_streak > stored.target_streak,
        };
        let (winner, loser) = if challenger_wins {
            (stored.challenger.clone(), stored.target.clone())
        } else {
            (stored.target.clone(), stored.challenger.clone())
        };

        inner.next_battle += 1;
        let outcome = AcceptOutcome {
            battle_id: BattleId::new(format!("b-{}", inner.next_battle)),
            winner_install_id: winner.clone(),
            loser_install_id: loser.clone(),
            animation_seed: inner.next_battle.wrapping_mul(0x9E37_79B9_7F4A_7C15),
            decided_at: now,
        };

        if let Some(c) = inner.find_mut(challenge_id) {
            c.status = ChallengeStatus::Accepted;
            c.updated_at = now;
        }
        let winner_streak = inner.streak(&winner) + 1;
        if let Some(u) = inner.users.get_mut(&winner) {
            u.current_streak = winner_streak;
        }
        if let Some(u) = inner.users.get_mut(&loser) {
            u.current_streak = 0;
        }
        inner.enqueue_reveal(&stored.challenger, &outcome, &stored.target);
        inner.enqueue_reveal(&stored.target, &outcome, &stored.challenger);

        if inner.malformed_accept {
            return Err(TransportError::Protocol("accept response missing animationSeed".into()));
        }
        Ok(outcome)
    }

    async fn mark_opened(&self, install_id: &InstallId) -> Result<(), TransportError> {
        self.inner
            .lock()
            .unwrap()
            .enter(Call::MarkOpened(install_id.clone()))
    }
}

#[async_trait]
impl RevealTransport for NullTransport {
    async fn poll_next(
        &self,
        install_id: &InstallId,
    ) -> Result<Option<RevealEvent>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(Call::PollNext(install_id.clone()))?;
        Ok(inner
            .reveals
            .get(install_id)
            .and_then(|q| q.front().cloned()))
    }

    async fn ack(&self, install_id: &InstallId, event_id: &EventId) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(Call::Ack(event_id.clone()))?;
        if inner.ack_failures > 0 {
            inner.ack_failures -= 1;
            return Err(TransportError::Network("null transport dropped ack".into()));
        }
        if inner.lost_acks > 0 {
            inner.lost_acks -= 1;
            return Ok(());
        }
        if let Some(queue) = inner.reveals.get_mut(install_id) {
            queue.retain(|e| &e.event_id != event_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> NullTransport {
        let server = NullTransport::new();
        server.add_user("x", "Xena", 3).add_user("y", "Yuri", 2).add_user("z", "Zed", 40);
        server
    }

    fn id(s: &str) -> InstallId {
        InstallId::new(s)
    }

    #[tokio::test]
    async fn second_pending_challenge_is_rejected() {
        let server = server();
        server.create(&id("x"), &id("y")).await.unwrap();
        let err = server.create(&id("x"), &id("y")).await.unwrap_err();
        assert_eq!(err.rejection_code(), Some(&ErrorCode::HasPending));
    }

    #[tokio::test]
    async fn streak_gap_is_enforced() {
        let server = server();
        let err = server.create(&id("x"), &id("z")).await.unwrap_err();
        assert_eq!(err.rejection_code(), Some(&ErrorCode::NotEligible));
    }

    #[tokio::test]
    async fn accept_resolves_and_queues_reveals_for_both_sides() {
        let server = server();
        let c = server.create(&id("x"), &id("y")).await.unwrap();
        let outcome = server.accept(&id("y"), &c.id).await.unwrap();
        assert_eq!(outcome.winner_install_id, id("x"));
        assert_eq!(server.status_of(&c.id), Some(ChallengeStatus::Accepted));
        assert_eq!(server.streak_of(&id("y")), 0);
        assert_eq!(server.undelivered(&id("x")).len(), 1);
        assert_eq!(server.undelivered(&id("y")).len(), 1);

        let again = server.accept(&id("y"), &c.id).await.unwrap_err();
        assert_eq!(again, TransportError::Status(409));
    }

    #[tokio::test]
    async fn ack_retires_event() {
        let server = server();
        let c = server.create(&id("x"), &id("y")).await.unwrap();
        server.accept(&id("y"), &c.id).await.unwrap();
        let event = server.poll_next(&id("x")).await.unwrap().unwrap();
        server.ack(&id("x"), &event.event_id).await.unwrap();
        server.ack(&id("x"), &event.event_id).await.unwrap();
        assert_eq!(server.poll_next(&id("x")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn dropped_ack_leaves_event_queued() {
        let server = server();
        let c = server.create(&id("x"), &id("y")).await.unwrap();
        server.accept(&id("y"), &c.id).await.unwrap();
        let event = server.poll_next(&id("x")).await.unwrap().unwrap();

        server.fail_next_ack();
        assert!(matches!(
            server.ack(&id("x"), &event.event_id).await,
            Err(TransportError::Network(_))
        ));
        assert_eq!(server.poll_next(&id("x")).await.unwrap(), Some(event.clone()));

        server.ack(&id("x"), &event.event_id).await.unwrap();
        assert!(server.undelivered(&id("x")).is_empty());
    }

    #[tokio::test]
    async fn offline_fails_every_call_but_records_it() {
        let server = server();
        server.set_offline(true);
        assert!(matches!(
            server.list_outgoing(&id("x")).await,
            Err(TransportError::Network(_))
        ));
        assert_eq!(server.calls(), vec![Call::ListOutgoing(id("x"))]);
    }
}
