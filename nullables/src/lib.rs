//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies (clock, challenge server) are abstracted behind
//! traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the network
//!
//! Usage: swap `HttpTransport` / `SystemClock` for these in tests.

pub mod clock;
pub mod transport;

pub use clock::NullClock;
pub use transport::{Call, NullTransport};
