//! Search results for picking a challenge target.

use serde::{Deserialize, Serialize};

use crate::InstallId;

/// One row of a user search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub install_id: InstallId,
    pub name: String,
    #[serde(default)]
    pub current_streak: u32,
}
