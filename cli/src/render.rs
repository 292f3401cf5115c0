//! Plain-text rendering of view-model state for stdout.

use streakduel_engine::{ErrorBanner, PendingReveal, RevealOrigin};
use streakduel_types::{BattleOutcome, ChallengeRecord, InstallId, UserSummary};

pub fn challenge_line(record: &ChallengeRecord) -> String {
    let opponent = record.opponent();
    format!(
        "{id}\t{status}\t{name} ({install}, streak {streak})\t{updated}",
        id = record.id,
        status = record.status,
        name = opponent.display_name,
        install = opponent.install_id,
        streak = opponent.current_streak_at_snapshot,
        updated = record.updated_at,
    )
}

pub fn user_line(user: &UserSummary) -> String {
    format!("{}\t{}\tstreak {}", user.install_id, user.name, user.current_streak)
}

pub fn banner_line(banner: &ErrorBanner) -> String {
    format!("{}: {}", banner.code, banner.message)
}

pub fn reveal_line(reveal: &PendingReveal, viewer: &InstallId) -> String {
    let event = &reveal.event;
    let result = match event.outcome_for(viewer) {
        Some(BattleOutcome::Won) => "WON",
        Some(BattleOutcome::Lost) => "LOST",
        None => "not a participant",
    };
    let origin = match &reveal.origin {
        RevealOrigin::Local => "local".to_string(),
        RevealOrigin::Polled { event_id } => format!("event {event_id}"),
    };
    format!(
        "battle {battle}: {result} (winner {winner}, seed {seed}, {origin})",
        battle = event.battle_id,
        winner = event.winner_install_id,
        seed = event.animation_seed,
    )
}

/// One line per row, or a placeholder when there are none.
pub fn lines<T>(rows: &[T], empty: &str, line: impl Fn(&T) -> String) -> String {
    if rows.is_empty() {
        return empty.to_string();
    }
    rows.iter().map(line).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use streakduel_types::{
        AcceptOutcome, BattleId, ChallengeStatus, ErrorCode, Participant, Timestamp,
    };

    #[test]
    fn challenge_line_names_opponent_and_status() {
        let record = ChallengeRecord::outgoing("c-1", Participant::new("t", "Tara").with_streak(4))
            .with_status(ChallengeStatus::Declined);
        let line = challenge_line(&record);
        assert!(line.starts_with("c-1\tdeclined\tTara (t, streak 4)"));
    }

    #[test]
    fn reveal_line_is_relative_to_viewer() {
        let event = AcceptOutcome {
            battle_id: BattleId::new("b-1"),
            winner_install_id: "me".into(),
            loser_install_id: "them".into(),
            animation_seed: 9,
            decided_at: Timestamp::new(1),
        }
        .into_reveal(None);
        let reveal = PendingReveal {
            event,
            origin: RevealOrigin::Local,
        };
        assert_eq!(
            reveal_line(&reveal, &"me".into()),
            "battle b-1: WON (winner me, seed 9, local)"
        );
        assert!(reveal_line(&reveal, &"them".into()).contains("LOST"));
    }

    #[test]
    fn banner_keeps_raw_code() {
        let banner = ErrorBanner::new(ErrorCode::parse("WEIRD_CODE"), Timestamp::new(0));
        assert!(banner_line(&banner).starts_with("WEIRD_CODE: "));
    }

    #[test]
    fn empty_rows_render_placeholder() {
        let rows: Vec<UserSummary> = Vec::new();
        assert_eq!(lines(&rows, "(none)", user_line), "(none)");
    }
}
