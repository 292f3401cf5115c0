//! Transport layer for the StreakDuel challenge server.
//!
//! - [`ChallengeTransport`] / [`RevealTransport`]: the seams the engine talks
//!   through; every call returns a typed `Result` so callers can tell
//!   "genuinely empty" from "failed".
//! - [`HttpTransport`]: the reqwest-backed implementation of both.
//! - [`RevealDeliveryClient`]: best-effort poll/ack wrapper that turns every
//!   failure into "no event now".

pub mod api;
pub mod config;
pub mod delivery;
pub mod error;
pub mod http;
mod wire;

pub use api::{ChallengeTransport, IncomingSort, RevealTransport};
pub use config::TransportConfig;
pub use delivery::{Delivery, RevealDeliveryClient};
pub use error::TransportError;
pub use http::HttpTransport;
