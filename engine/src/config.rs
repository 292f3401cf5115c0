//! Engine configuration.

use serde::{Deserialize, Serialize};

use streakduel_transport::IncomingSort;

use crate::dedup::DEFAULT_REGISTRY_CAPACITY;

/// Tunables for the view model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum incoming challenges fetched per refresh.
    #[serde(default = "default_incoming_limit")]
    pub incoming_limit: u32,

    /// Initial ordering of the incoming list.
    #[serde(default)]
    pub incoming_sort: IncomingSort,

    /// Maximum results per user search.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Battle ids remembered for reveal dedup.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,

    /// How long a rejection banner stays up.
    #[serde(default = "default_banner_ttl_secs")]
    pub banner_ttl_secs: u64,

    /// Upper bound on poll round-trips in one reveal refresh (duplicates are
    /// acknowledged and the next event polled).
    #[serde(default = "default_max_polls")]
    pub max_polls_per_refresh: u32,
}

fn default_incoming_limit() -> u32 {
    50
}

fn default_search_limit() -> u32 {
    20
}

fn default_dedup_capacity() -> usize {
    DEFAULT_REGISTRY_CAPACITY
}

fn default_banner_ttl_secs() -> u64 {
    4
}

fn default_max_polls() -> u32 {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            incoming_limit: default_incoming_limit(),
            incoming_sort: IncomingSort::default(),
            search_limit: default_search_limit(),
            dedup_capacity: default_dedup_capacity(),
            banner_ttl_secs: default_banner_ttl_secs(),
            max_polls_per_refresh: default_max_polls(),
        }
    }
}
