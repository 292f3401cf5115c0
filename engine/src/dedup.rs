//! Bounded set of battle ids for at-most-once reveal presentation.
//!
//! When a local accept produces a battle, its id is recorded here before the
//! poll channel can possibly deliver the same battle. A later poll that finds
//! the id takes it out again (the event is acknowledged and discarded).

use std::collections::{HashSet, VecDeque};

use streakduel_types::BattleId;

/// Default capacity: far more battles than a single session will produce.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 1_024;

/// Insertion-ordered set of battle ids.
///
/// Oldest entries are evicted when capacity is reached.
#[derive(Debug, Clone)]
pub struct DedupRegistry {
    capacity: usize,
    ids: HashSet<BattleId>,
    order: VecDeque<BattleId>,
}

impl DedupRegistry {
    /// Create an empty registry with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            ids: HashSet::with_capacity(capacity.min(DEFAULT_REGISTRY_CAPACITY)),
            order: VecDeque::new(),
        }
    }

    /// Create a registry pre-seeded with `ids` (tests, session restore).
    pub fn seeded(capacity: usize, ids: impl IntoIterator<Item = BattleId>) -> Self {
        let mut registry = Self::new(capacity);
        for id in ids {
            registry.record(id);
        }
        registry
    }

    /// Record a handled battle.
    ///
    /// Returns `false` if it was already present.
    pub fn record(&mut self, battle_id: BattleId) -> bool {
        if self.ids.contains(&battle_id) {
            return false;
        }
        if self.ids.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.ids.remove(&old);
            }
        }
        self.ids.insert(battle_id.clone());
        self.order.push_back(battle_id);
        true
    }

    pub fn contains(&self, battle_id: &BattleId) -> bool {
        self.ids.contains(battle_id)
    }

    /// Remove `battle_id`, returning whether it was present.
    pub fn take(&mut self, battle_id: &BattleId) -> bool {
        if !self.ids.remove(battle_id) {
            return false;
        }
        self.order.retain(|id| id != battle_id);
        true
    }

    /// Recorded ids, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &BattleId> {
        self.order.iter()
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for DedupRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_CAPACITY)
    }
}
