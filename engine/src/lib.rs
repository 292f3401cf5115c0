//! Client-side challenge/battle reconciliation engine.
//!
//! - [`BattleStateMachine`]: legal status transitions and the dismiss policy.
//! - [`ReconciliationEngine`]: merges server lists with locally retained rows,
//!   upgrades outgoing rows on reveals, derives the attention flag.
//! - [`DedupRegistry`]: battle ids whose reveal was already handled locally.
//! - [`ChallengeViewModel`]: the façade the presentation layer drives.

pub mod config;
pub mod dedup;
pub mod guard;
pub mod messages;
pub mod outcome;
pub mod reconcile;
pub mod state_machine;
pub mod view_model;

pub use config::EngineConfig;
pub use dedup::DedupRegistry;
pub use guard::{RequestGeneration, RequestTicket};
pub use messages::banner_message;
pub use outcome::{LastOutcome, OutcomeMatch};
pub use reconcile::{merge_outgoing, needs_attention, ReconciliationEngine};
pub use state_machine::{Actor, BattleStateMachine, DismissAction};
pub use view_model::{ChallengeViewModel, ErrorBanner, PendingReveal, RevealOrigin, ViewState};
