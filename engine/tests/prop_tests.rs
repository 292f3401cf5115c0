use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use streakduel_engine::{merge_outgoing, ChallengeViewModel, EngineConfig};
use streakduel_nullables::{NullClock, NullTransport};
use streakduel_types::{
    ChallengeRecord, ChallengeStatus, InstallId, OpponentHint, Participant, Timestamp,
};

fn any_status() -> impl Strategy<Value = ChallengeStatus> {
    prop::sample::select(ChallengeStatus::ALL.to_vec())
}

fn record() -> impl Strategy<Value = ChallengeRecord> {
    (0u8..8, 0u8..4, any_status(), 0u64..1_000).prop_map(|(id, target, status, at)| {
        ChallengeRecord::outgoing(
            format!("c{id}"),
            Participant::new(format!("t{target}"), format!("T{target}")),
        )
        .with_status(status)
        .with_times(Timestamp::new(at), Timestamp::new(at))
    })
}

/// Outgoing list with unique ids.
fn list() -> impl Strategy<Value = Vec<ChallengeRecord>> {
    prop::collection::vec(record(), 0..6).prop_map(|rows| {
        let mut seen = HashSet::new();
        rows.into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect()
    })
}

fn in_flight() -> impl Strategy<Value = Option<OpponentHint>> {
    prop::option::of((0u8..4).prop_map(|t| OpponentHint {
        install_id: Some(InstallId::new(format!("t{t}"))),
        display_name: None,
    }))
}

#[derive(Clone, Copy, Debug)]
enum Step {
    PollX,
    PollY,
    PresentX,
    PresentY,
    /// The server refuses the next ack.
    FailAck,
    /// The server answers the next ack but keeps the event.
    LoseAck,
}

fn steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        prop::sample::select(vec![
            Step::PollX,
            Step::PollY,
            Step::PresentX,
            Step::PresentY,
            Step::FailAck,
            Step::LoseAck,
        ]),
        0..12,
    )
}

proptest! {
    /// merge(S, L) has unique ids, keeps every server id, and keeps a local
    /// id only when the server lacks it and it is terminal or in flight.
    #[test]
    fn merge_is_stable(server in list(), local in list(), hint in in_flight()) {
        let merged = merge_outgoing(server.clone(), local.clone(), hint.as_ref());

        let ids: Vec<_> = merged.iter().map(|r| r.id.clone()).collect();
        let unique: HashSet<_> = ids.iter().cloned().collect();
        prop_assert_eq!(unique.len(), ids.len());

        let server_ids: HashSet<_> = server.iter().map(|r| r.id.clone()).collect();
        for id in &server_ids {
            prop_assert!(unique.contains(id));
        }
        for row in &merged {
            if server_ids.contains(&row.id) {
                continue;
            }
            let original = local.iter().find(|l| l.id == row.id);
            prop_assert!(original.is_some());
            let matches_hint = hint.as_ref().is_some_and(|h| row.opponent().matches(h));
            prop_assert!(!row.is_pending() || matches_hint);
        }
    }

    /// A status observed terminal is never presented as pending after a merge.
    #[test]
    fn terminal_status_is_monotonic(server in list(), local in list(), hint in in_flight()) {
        let terminal: HashMap<_, _> = local
            .iter()
            .filter(|r| r.status.is_terminal())
            .map(|r| (r.id.clone(), r.status))
            .collect();
        let merged = merge_outgoing(server, local, hint.as_ref());
        for row in &merged {
            if terminal.contains_key(&row.id) {
                prop_assert!(row.status.is_terminal());
            }
        }
    }

    /// Merging the same server list twice changes nothing the second time.
    #[test]
    fn merge_is_idempotent(server in list(), local in list()) {
        let once = merge_outgoing(server.clone(), local, None);
        let twice = merge_outgoing(server, once.clone(), None);
        prop_assert_eq!(once, twice);
    }

    /// However polls, presentations and refused or lost acks interleave with
    /// a local accept, each side is shown the battle exactly once.
    #[test]
    fn battle_is_presented_at_most_once(
        duplicates in any::<bool>(),
        before in steps(),
        after in steps(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (shown_x, shown_y) = runtime.block_on(async move {
            let server = NullTransport::new();
            server.add_user("x", "Xena", 3).add_user("y", "Yuri", 2);
            server.set_duplicate_reveals(duplicates);
            let server = Arc::new(server);
            let clock = Arc::new(NullClock::new(0));
            let mut x = ChallengeViewModel::new(
                InstallId::new("x"), server.clone(), EngineConfig::default(), clock.clone());
            let mut y = ChallengeViewModel::new(
                InstallId::new("y"), server.clone(), EngineConfig::default(), clock);

            let mut shown_x = 0;
            let mut shown_y = 0;

            x.create(&InstallId::new("y")).await;
            y.refresh().await;
            for step in before {
                match step {
                    Step::PollX => x.refresh_reveal().await,
                    Step::PollY => y.refresh_reveal().await,
                    Step::PresentX => shown_x += usize::from(x.reveal_presented().await.is_some()),
                    Step::PresentY => shown_y += usize::from(y.reveal_presented().await.is_some()),
                    Step::FailAck => server.fail_next_ack(),
                    Step::LoseAck => server.lose_next_ack(),
                }
            }
            let challenge = y.incoming()[0].id.clone();
            assert!(y.accept(&challenge).await);
            for step in after {
                match step {
                    Step::PollX => x.refresh_reveal().await,
                    Step::PollY => y.refresh_reveal().await,
                    Step::PresentX => shown_x += usize::from(x.reveal_presented().await.is_some()),
                    Step::PresentY => shown_y += usize::from(y.reveal_presented().await.is_some()),
                    Step::FailAck => server.fail_next_ack(),
                    Step::LoseAck => server.lose_next_ack(),
                }
            }
            for _ in 0..4 {
                x.refresh_reveal().await;
                y.refresh_reveal().await;
                while x.reveal_presented().await.is_some() {
                    shown_x += 1;
                }
                while y.reveal_presented().await.is_some() {
                    shown_y += 1;
                }
            }
            (shown_x, shown_y)
        });
        prop_assert_eq!(shown_x, 1);
        prop_assert_eq!(shown_y, 1);
    }
}
