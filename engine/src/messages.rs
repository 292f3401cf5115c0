//! Human-readable banner text for server rejection codes.

use streakduel_types::ErrorCode;

/// Banner text for `code`. Unknown codes fall back to a generic message.
pub fn banner_message(code: &ErrorCode) -> &'static str {
    match code {
        ErrorCode::NotEligible => "Your streaks are too far apart for this challenge.",
        ErrorCode::HasPending => "You already have a challenge waiting. Cancel it first.",
        ErrorCode::StreaksChanged => "A streak changed since this challenge was sent.",
        ErrorCode::Expired => "This challenge has expired.",
        ErrorCode::Unknown(_) => "Something went wrong. Please try again.",
    }
}
