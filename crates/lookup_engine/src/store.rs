use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lookup_core::ItemResult;

/// Append-only log of terminal outcomes.
///
/// Entries arrive in completion order; readers get them back in submission
/// order via each entry's `position`.
#[derive(Debug, Default)]
pub struct ResultStore {
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    entries: Vec<ItemResult>,
    positions: HashSet<usize>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result. A second result for the same position is refused.
    pub fn append(&self, result: ItemResult) -> bool {
        let mut state = self.lock();
        if !state.positions.insert(result.position) {
            return false;
        }
        state.entries.push(result);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Results sorted by submission position.
    pub fn ordered(&self) -> Vec<ItemResult> {
        let mut results = self.lock().entries.clone();
        results.sort_by_key(|result| result.position);
        results
    }

    /// Identifiers in the order their results were appended.
    pub fn completion_order(&self) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .map(|result| result.identifier.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
