use streakduel_types::ErrorCode;
use thiserror::Error;

/// Failure of a single request against the challenge server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, timeout or TLS failure; nothing was received.
    #[error("request failed: {0}")]
    Network(String),

    /// Non-2xx without a parseable error code.
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// Named business rejection (`NOT_ELIGIBLE`, `STREAKS_CHANGED`, ...).
    #[error("server rejected request: {code} (HTTP {status})")]
    Rejected { status: u16, code: ErrorCode },

    /// Body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// A 2xx body that decoded but is missing something the protocol requires.
    #[error("protocol anomaly: {0}")]
    Protocol(String),
}

impl TransportError {
    /// The server's rejection code, if this is a business rejection.
    pub fn rejection_code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_timeout() {
            Self::Network(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::Network(format!("connection failed: {e}"))
        } else {
            Self::Network(e.to_string())
        }
    }
}
