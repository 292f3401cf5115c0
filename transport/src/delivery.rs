//! Best-effort reveal delivery: poll for the next undelivered reveal and
//! acknowledge it once handled.
//!
//! Polling is opportunistic (screen open, manual refresh, after a mutation),
//! never a background loop. A failed poll is indistinguishable from "nothing
//! to show"; the next opportunistic poll retries.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use streakduel_types::{EventId, InstallId, RevealEvent};

use crate::api::RevealTransport;

/// Number of acknowledged event ids remembered for idempotent `ack`.
pub const DEFAULT_ACK_MEMORY: usize = 256;

/// What a single poll produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing pending, or the poll failed.
    Empty,
    /// A re-delivery of an event this client already acknowledged. It was
    /// re-acknowledged, so whatever the server holds next can be polled.
    Retired(EventId),
    /// A reveal the caller still has to handle.
    Event(RevealEvent),
}

/// Poll/ack wrapper around a [`RevealTransport`].
pub struct RevealDeliveryClient<R: ?Sized> {
    transport: Arc<R>,
    capacity: usize,
    acked: HashSet<EventId>,
    order: VecDeque<EventId>,
}

impl<R: RevealTransport + ?Sized> RevealDeliveryClient<R> {
    pub fn new(transport: Arc<R>) -> Self {
        Self::with_ack_memory(transport, DEFAULT_ACK_MEMORY)
    }

    pub fn with_ack_memory(transport: Arc<R>, capacity: usize) -> Self {
        Self {
            transport,
            capacity: capacity.max(1),
            acked: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Oldest undelivered reveal. A failed poll reads as [`Delivery::Empty`].
    ///
    /// An event this client already acknowledged means the server missed the
    /// ack; it is re-acknowledged and reported as [`Delivery::Retired`]. If
    /// the re-ack fails too the server will hand the same event back, so the
    /// poll reads as empty instead.
    pub async fn poll_next(&self, install_id: &InstallId) -> Delivery {
        let event = match self.transport.poll_next(install_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!(%install_id, "no reveal pending");
                return Delivery::Empty;
            }
            Err(e) => {
                tracing::debug!(%install_id, error = %e, "reveal poll failed; treating as none");
                return Delivery::Empty;
            }
        };

        if !self.acked.contains(&event.event_id) {
            return Delivery::Event(event);
        }

        tracing::debug!(event_id = %event.event_id, "reveal re-delivered after ack; re-acking");
        match self.transport.ack(install_id, &event.event_id).await {
            Ok(()) => Delivery::Retired(event.event_id),
            Err(e) => {
                tracing::debug!(error = %e, "re-ack failed");
                Delivery::Empty
            }
        }
    }

    /// Acknowledge `event_id`. Returns whether the event is now known retired.
    ///
    /// A second call for the same id issues no request.
    pub async fn ack(&mut self, install_id: &InstallId, event_id: &EventId) -> bool {
        if self.acked.contains(event_id) {
            return true;
        }
        match self.transport.ack(install_id, event_id).await {
            Ok(()) => {
                self.remember(event_id.clone());
                true
            }
            Err(e) => {
                tracing::warn!(%event_id, error = %e, "reveal ack failed");
                false
            }
        }
    }

    /// Whether `event_id` was acknowledged by this client.
    pub fn was_acked(&self, event_id: &EventId) -> bool {
        self.acked.contains(event_id)
    }

    fn remember(&mut self, event_id: EventId) {
        if self.acked.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.acked.remove(&old);
            }
        }
        self.acked.insert(event_id.clone());
        self.order.push_back(event_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use streakduel_types::{BattleId, Timestamp};

    #[derive(Default)]
    struct ScriptedReveals {
        next: Mutex<Vec<Result<Option<RevealEvent>, TransportError>>>,
        acks: Mutex<Vec<EventId>>,
        fail_acks: Mutex<bool>,
    }

    #[async_trait]
    impl RevealTransport for ScriptedReveals {
        async fn poll_next(
            &self,
            _install_id: &InstallId,
        ) -> Result<Option<RevealEvent>, TransportError> {
            let mut next = self.next.lock().unwrap();
            if next.is_empty() {
                Ok(None)
            } else {
                next.remove(0)
            }
        }

        async fn ack(&self, _install_id: &InstallId, event_id: &EventId) -> Result<(), TransportError> {
            if *self.fail_acks.lock().unwrap() {
                return Err(TransportError::Network("offline".into()));
            }
            self.acks.lock().unwrap().push(event_id.clone());
            Ok(())
        }
    }

    fn event(event_id: &str) -> RevealEvent {
        RevealEvent {
            event_id: EventId::new(event_id),
            battle_id: BattleId::new("b1"),
            winner_install_id: "me".into(),
            loser_install_id: "them".into(),
            animation_seed: 7,
            decided_at: Timestamp::new(10),
            opponent: None,
        }
    }

    #[tokio::test]
    async fn poll_failure_reads_as_none() {
        let transport = Arc::new(ScriptedReveals::default());
        transport
            .next
            .lock()
            .unwrap()
            .push(Err(TransportError::Decode("garbage".into())));
        let client = RevealDeliveryClient::new(transport);
        assert_eq!(client.poll_next(&"me".into()).await, Delivery::Empty);
    }

    #[tokio::test]
    async fn second_ack_sends_nothing() {
        let transport = Arc::new(ScriptedReveals::default());
        let mut client = RevealDeliveryClient::new(transport.clone());
        let me: InstallId = "me".into();
        let id = EventId::new("e1");

        assert!(client.ack(&me, &id).await);
        assert!(client.ack(&me, &id).await);
        assert_eq!(transport.acks.lock().unwrap().len(), 1);
        assert!(client.was_acked(&id));
    }

    #[tokio::test]
    async fn failed_ack_is_retried_on_next_call() {
        let transport = Arc::new(ScriptedReveals::default());
        *transport.fail_acks.lock().unwrap() = true;
        let mut client = RevealDeliveryClient::new(transport.clone());
        let me: InstallId = "me".into();
        let id = EventId::new("e1");

        assert!(!client.ack(&me, &id).await);
        *transport.fail_acks.lock().unwrap() = false;
        assert!(client.ack(&me, &id).await);
        assert_eq!(transport.acks.lock().unwrap().as_slice(), &[id]);
    }

    #[tokio::test]
    async fn redelivered_acked_event_is_retired_and_reacked() {
        let transport = Arc::new(ScriptedReveals::default());
        let mut client = RevealDeliveryClient::new(transport.clone());
        let me: InstallId = "me".into();
        client.ack(&me, &EventId::new("e1")).await;

        transport.next.lock().unwrap().push(Ok(Some(event("e1"))));
        assert_eq!(
            client.poll_next(&me).await,
            Delivery::Retired(EventId::new("e1"))
        );
        assert_eq!(transport.acks.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_reack_reads_as_empty() {
        let transport = Arc::new(ScriptedReveals::default());
        let mut client = RevealDeliveryClient::new(transport.clone());
        let me: InstallId = "me".into();
        client.ack(&me, &EventId::new("e1")).await;

        *transport.fail_acks.lock().unwrap() = true;
        transport.next.lock().unwrap().push(Ok(Some(event("e1"))));
        assert_eq!(client.poll_next(&me).await, Delivery::Empty);
    }

    #[tokio::test]
    async fn fresh_event_is_returned() {
        let transport = Arc::new(ScriptedReveals::default());
        transport.next.lock().unwrap().push(Ok(Some(event("e2"))));
        let client = RevealDeliveryClient::new(transport);
        assert_eq!(client.poll_next(&"me".into()).await, Delivery::Event(event("e2")));
    }

    #[tokio::test]
    async fn ack_memory_is_bounded() {
        let transport = Arc::new(ScriptedReveals::default());
        let mut client = RevealDeliveryClient::with_ack_memory(transport, 2);
        let me: InstallId = "me".into();
        for id in ["e1", "e2", "e3"] {
            client.ack(&me, &EventId::new(id)).await;
        }
        assert!(!client.was_acked(&EventId::new("e1")));
        assert!(client.was_acked(&EventId::new("e3")));
    }
}
