//! Fundamental types for StreakDuel challenges.
//!
//! This crate defines the shapes shared across every other crate in the workspace:
//! identifiers, challenge records and their status, battle reveal events, the
//! server's business error codes, and timestamps.

pub mod challenge;
pub mod error;
pub mod error_code;
pub mod ids;
pub mod reveal;
pub mod state;
pub mod time;
pub mod user;

pub use challenge::{ChallengeRecord, Counterpart, Direction, Participant};
pub use error::DuelError;
pub use error_code::ErrorCode;
pub use ids::{BattleId, ChallengeId, EventId, InstallId};
pub use reveal::{AcceptOutcome, BattleOutcome, OpponentHint, RevealEvent};
pub use state::ChallengeStatus;
pub use time::{Clock, SystemClock, Timestamp};
pub use user::UserSummary;
