//! The façade the presentation layer drives.
//!
//! All state lives here and is mutated through `&mut self`, so results of
//! concurrent network calls are applied one at a time. Transport failures are
//! collapsed at this boundary: lists stay as they were, boolean intents report
//! `false`, polls read as "nothing to show". Only business rejections reach the
//! user, as a short-lived [`ErrorBanner`].

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;

use streakduel_transport::{
    ChallengeTransport, Delivery, IncomingSort, RevealDeliveryClient, RevealTransport,
    TransportError,
};
use streakduel_types::{
    BattleOutcome, ChallengeId, ChallengeRecord, Clock, ErrorCode, EventId, InstallId,
    OpponentHint, RevealEvent, Timestamp, UserSummary,
};

use crate::config::EngineConfig;
use crate::dedup::DedupRegistry;
use crate::guard::{RequestGeneration, RequestTicket};
use crate::messages::banner_message;
use crate::outcome::{LastOutcome, OutcomeMatch};
use crate::reconcile::ReconciliationEngine;
use crate::state_machine::{BattleStateMachine, DismissAction};

/// Where a queued reveal came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RevealOrigin {
    /// Synthesized from this client's own accept. Never acknowledged.
    Local,
    /// Delivered by the poll channel; acknowledged once presented.
    Polled { event_id: EventId },
}

/// A reveal waiting for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingReveal {
    pub event: RevealEvent,
    pub origin: RevealOrigin,
}

/// A business rejection shown to the user for a short while.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBanner {
    pub code: ErrorCode,
    pub message: &'static str,
    pub raised_at: Timestamp,
}

impl ErrorBanner {
    pub fn new(code: ErrorCode, raised_at: Timestamp) -> Self {
        Self {
            message: banner_message(&code),
            code,
            raised_at,
        }
    }

    pub fn is_active(&self, now: Timestamp, ttl_secs: u64) -> bool {
        !self.raised_at.has_expired(ttl_secs, now)
    }
}

/// Everything a screen renders, captured at one instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub incoming: Vec<ChallengeRecord>,
    pub outgoing: Vec<ChallengeRecord>,
    pub needs_attention: bool,
    pub last_outcome: Option<LastOutcome>,
    pub current_reveal: Option<PendingReveal>,
    pub banner: Option<ErrorBanner>,
    pub search_results: Vec<UserSummary>,
    pub my_streak: Option<u32>,
    pub incoming_sort: IncomingSort,
}

type ListResult = Result<Vec<ChallengeRecord>, TransportError>;

/// Orchestrates transport, reconciliation and reveal delivery for one install.
pub struct ChallengeViewModel<T: ?Sized> {
    install_id: InstallId,
    transport: Arc<T>,
    delivery: RevealDeliveryClient<T>,
    engine: ReconciliationEngine,
    reveals: VecDeque<PendingReveal>,
    presented: DedupRegistry,
    banner: Option<ErrorBanner>,
    search_results: Vec<UserSummary>,
    my_streak: Option<u32>,
    incoming_sort: IncomingSort,
    generation: RequestGeneration,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl<T> ChallengeViewModel<T>
where
    T: ChallengeTransport + RevealTransport + ?Sized,
{
    pub fn new(
        install_id: InstallId,
        transport: Arc<T>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = DedupRegistry::new(config.dedup_capacity);
        Self {
            install_id,
            delivery: RevealDeliveryClient::new(transport.clone()),
            transport,
            engine: ReconciliationEngine::new(registry),
            reveals: VecDeque::new(),
            presented: DedupRegistry::new(config.dedup_capacity),
            banner: None,
            search_results: Vec::new(),
            my_streak: None,
            incoming_sort: config.incoming_sort,
            generation: RequestGeneration::new(),
            config,
            clock,
        }
    }

    /// Replace the dedup registry (seeded sessions, tests).
    pub fn with_registry(mut self, registry: DedupRegistry) -> Self {
        self.engine = ReconciliationEngine::new(registry);
        self
    }

    pub fn with_streak(mut self, streak: u32) -> Self {
        self.my_streak = Some(streak);
        self
    }

    // -----------------------------------------------------------------------
    // Observable state
    // -----------------------------------------------------------------------

    pub fn install_id(&self) -> &InstallId {
        &self.install_id
    }

    pub fn incoming(&self) -> &[ChallengeRecord] {
        self.engine.incoming()
    }

    pub fn outgoing(&self) -> &[ChallengeRecord] {
        self.engine.outgoing()
    }

    pub fn needs_attention(&self) -> bool {
        self.engine.needs_attention()
    }

    pub fn last_outcome(&self) -> Option<&LastOutcome> {
        self.engine.last_outcome()
    }

    pub fn registry(&self) -> &DedupRegistry {
        self.engine.registry()
    }

    pub fn search_results(&self) -> &[UserSummary] {
        &self.search_results
    }

    pub fn my_streak(&self) -> Option<u32> {
        self.my_streak
    }

    pub fn incoming_sort(&self) -> IncomingSort {
        self.incoming_sort
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The reveal the presentation layer should be showing, if any.
    pub fn current_reveal(&self) -> Option<&PendingReveal> {
        self.reveals.front()
    }

    pub fn queued_reveals(&self) -> usize {
        self.reveals.len()
    }

    /// The banner, while it is still within its lifetime.
    pub fn active_banner(&self) -> Option<&ErrorBanner> {
        let now = self.clock.now();
        self.banner
            .as_ref()
            .filter(|b| b.is_active(now, self.config.banner_ttl_secs))
    }

    pub fn snapshot(&self) -> ViewState {
        ViewState {
            incoming: self.incoming().to_vec(),
            outgoing: self.outgoing().to_vec(),
            needs_attention: self.needs_attention(),
            last_outcome: self.last_outcome().cloned(),
            current_reveal: self.current_reveal().cloned(),
            banner: self.active_banner().cloned(),
            search_results: self.search_results.clone(),
            my_streak: self.my_streak,
            incoming_sort: self.incoming_sort,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle and refresh
    // -----------------------------------------------------------------------

    /// Screen opened: clear the server badge, then reconcile.
    pub async fn open(&mut self) {
        if let Err(e) = self.transport.mark_opened(&self.install_id).await {
            tracing::warn!(install_id = %self.install_id, error = %e, "mark opened failed");
        }
        self.refresh().await;
        self.refresh_reveal().await;
    }

    /// Fetch both lists in parallel and apply whichever succeeded.
    pub async fn refresh(&mut self) {
        let ticket = self.begin_refresh();
        let (incoming, outgoing) = self.fetch_lists().await;
        self.complete_refresh(ticket, incoming, outgoing);
    }

    pub fn begin_refresh(&mut self) -> RequestTicket {
        self.generation.begin()
    }

    pub async fn fetch_lists(&self) -> (ListResult, ListResult) {
        tokio::join!(
            self.transport.list_incoming(
                &self.install_id,
                self.config.incoming_limit,
                self.incoming_sort
            ),
            self.transport.list_outgoing(&self.install_id),
        )
    }

    /// Apply fetched lists started under `ticket`.
    ///
    /// Returns `false` if a newer refresh or a local mutation superseded the
    /// ticket; nothing is applied in that case. A failed list is left as is.
    pub fn complete_refresh(
        &mut self,
        ticket: RequestTicket,
        incoming: ListResult,
        outgoing: ListResult,
    ) -> bool {
        if !self.generation.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.generation(),
                "discarding superseded list refresh"
            );
            return false;
        }

        match incoming {
            Ok(rows) => self.engine.apply_incoming(rows),
            Err(e) => tracing::warn!(error = %e, "incoming list fetch failed"),
        }
        match outgoing {
            Ok(rows) => {
                let in_flight = self.in_flight_hint();
                self.engine.apply_outgoing(rows, in_flight.as_ref());
            }
            Err(e) => tracing::warn!(error = %e, "outgoing list fetch failed"),
        }
        true
    }

    pub async fn set_incoming_sort(&mut self, sort: IncomingSort) {
        self.incoming_sort = sort;
        self.refresh().await;
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Search other installs. A blank query clears results without a request.
    pub async fn search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            self.search_results.clear();
            return;
        }
        self.search_results = match self
            .transport
            .search_users(query, self.config.search_limit)
            .await
        {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(error = %e, "user search failed");
                Vec::new()
            }
        };
    }

    /// Challenge `target`. Returns whether the server created the challenge.
    pub async fn create(&mut self, target: &InstallId) -> bool {
        tracing::info!(challenger = %self.install_id, %target, "creating challenge");
        self.generation.bump();
        match self.transport.create(&self.install_id, target).await {
            Ok(record) => {
                self.engine.upsert_outgoing(record);
                self.refresh().await;
                true
            }
            Err(e) => {
                self.on_failure("create", e).await;
                false
            }
        }
    }

    /// Cancel or dismiss an outgoing row.
    ///
    /// Rows the server still tracks are removed only once it confirms the
    /// cancel; a failed cancel leaves the row and raises nothing.
    pub async fn cancel(&mut self, challenge_id: &ChallengeId) -> bool {
        let Some(status) = self.engine.find_outgoing(challenge_id).map(|r| r.status) else {
            tracing::debug!(%challenge_id, "cancel for unknown outgoing row");
            return false;
        };
        self.generation.bump();

        match BattleStateMachine::dismiss_action(status) {
            DismissAction::DropLocally => {
                tracing::info!(%challenge_id, %status, "dropping resolved challenge locally");
                self.engine.remove_outgoing(challenge_id);
                true
            }
            DismissAction::CancelOnServer => {
                match self.transport.cancel(&self.install_id, challenge_id).await {
                    Ok(()) => {
                        tracing::info!(%challenge_id, "challenge canceled");
                        self.engine.remove_outgoing(challenge_id);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(%challenge_id, error = %e, "cancel failed; row kept");
                        false
                    }
                }
            }
        }
    }

    /// Alias of [`cancel`](Self::cancel) for the dismiss gesture.
    pub async fn dismiss(&mut self, challenge_id: &ChallengeId) -> bool {
        self.cancel(challenge_id).await
    }

    pub async fn decline(&mut self, challenge_id: &ChallengeId) -> bool {
        tracing::info!(%challenge_id, "declining challenge");
        self.generation.bump();
        match self.transport.decline(&self.install_id, challenge_id).await {
            Ok(()) => {
                self.engine.remove_incoming(challenge_id);
                self.refresh().await;
                true
            }
            Err(e) => {
                self.on_failure("decline", e).await;
                false
            }
        }
    }

    /// Accept an incoming challenge and show the result right away.
    ///
    /// The battle id is recorded before anything else so a poll delivering the
    /// same battle is recognised as a duplicate.
    pub async fn accept(&mut self, challenge_id: &ChallengeId) -> bool {
        tracing::info!(%challenge_id, "accepting challenge");
        self.generation.bump();
        let outcome = match self.transport.accept(&self.install_id, challenge_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.on_failure("accept", e).await;
                return false;
            }
        };

        self.engine.registry_mut().record(outcome.battle_id.clone());

        let hint = self
            .engine
            .find_incoming(challenge_id)
            .map(|r| {
                let challenger = r.opponent();
                OpponentHint::from_install(
                    challenger.install_id.clone(),
                    challenger.display_name.clone(),
                )
            })
            .or_else(|| {
                let other = if outcome.winner_install_id == self.install_id {
                    &outcome.loser_install_id
                } else {
                    &outcome.winner_install_id
                };
                Some(OpponentHint {
                    install_id: Some(other.clone()),
                    display_name: None,
                })
            });
        let event = outcome.into_reveal(hint);

        self.engine.remove_incoming(challenge_id);
        self.apply_reveal(&event, Some(challenge_id));
        tracing::info!(battle_id = %event.battle_id, "local reveal queued");
        self.reveals.push_back(PendingReveal {
            event,
            origin: RevealOrigin::Local,
        });

        self.refresh().await;
        true
    }

    // -----------------------------------------------------------------------
    // Reveals
    // -----------------------------------------------------------------------

    /// Poll for reveals the server holds for this install.
    ///
    /// Safe to call from any trigger. Battles already shown or queued are
    /// acknowledged and skipped. Polling is skipped while a polled reveal is
    /// still queued, since it stays undelivered until presented.
    pub async fn refresh_reveal(&mut self) {
        if self
            .reveals
            .iter()
            .any(|r| matches!(r.origin, RevealOrigin::Polled { .. }))
        {
            tracing::debug!("polled reveal still queued; not polling");
            return;
        }

        for _ in 0..self.config.max_polls_per_refresh {
            let event = match self.delivery.poll_next(&self.install_id).await {
                Delivery::Event(event) => event,
                Delivery::Retired(event_id) => {
                    tracing::debug!(%event_id, "stale re-delivery retired; polling on");
                    continue;
                }
                Delivery::Empty => return,
            };

            let handled_locally = self.engine.registry().contains(&event.battle_id);
            let duplicate = handled_locally
                || self.presented.contains(&event.battle_id)
                || self
                    .reveals
                    .iter()
                    .any(|r| r.event.battle_id == event.battle_id);
            if duplicate {
                tracing::debug!(
                    battle_id = %event.battle_id,
                    event_id = %event.event_id,
                    "reveal already handled; acknowledging without showing"
                );
                // The registry entry is only released once the server has
                // retired the event, otherwise the next poll would see a
                // first delivery.
                if !self.delivery.ack(&self.install_id, &event.event_id).await {
                    return;
                }
                if handled_locally {
                    self.engine.registry_mut().take(&event.battle_id);
                    self.presented.record(event.battle_id.clone());
                }
                continue;
            }

            self.apply_reveal(&event, None);
            tracing::info!(battle_id = %event.battle_id, "polled reveal queued");
            self.reveals.push_back(PendingReveal {
                origin: RevealOrigin::Polled {
                    event_id: event.event_id.clone(),
                },
                event,
            });
            return;
        }
    }

    /// The presentation layer finished showing the current reveal.
    pub async fn reveal_presented(&mut self) -> Option<PendingReveal> {
        let shown = self.reveals.pop_front()?;
        self.presented.record(shown.event.battle_id.clone());
        if let RevealOrigin::Polled { event_id } = &shown.origin {
            self.delivery.ack(&self.install_id, event_id).await;
        }
        Some(shown)
    }

    // -----------------------------------------------------------------------
    // Misc
    // -----------------------------------------------------------------------

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Authoritative streak from the host.
    pub fn set_my_streak(&mut self, streak: u32) {
        self.my_streak = Some(streak);
    }

    fn apply_reveal(&mut self, event: &RevealEvent, challenge_id: Option<&ChallengeId>) {
        let matched = self
            .engine
            .apply_outcome(event, &self.install_id, challenge_id);
        if let OutcomeMatch::SolePending(id) = &matched {
            tracing::debug!(%id, "reveal matched the only pending row");
        }
        if event.outcome_for(&self.install_id) == Some(BattleOutcome::Lost) {
            self.my_streak = Some(0);
        }
    }

    /// Opponent of the oldest queued reveal, whose pending row must survive merges.
    fn in_flight_hint(&self) -> Option<OpponentHint> {
        self.reveals.front().and_then(|r| r.event.opponent.clone())
    }

    async fn on_failure(&mut self, op: &'static str, err: TransportError) {
        match err.rejection_code() {
            Some(code) => {
                tracing::info!(op, code = %code, "request rejected");
                self.banner = Some(ErrorBanner::new(code.clone(), self.clock.now()));
            }
            None => tracing::warn!(op, error = %err, "request failed"),
        }
        self.refresh().await;
    }
}
