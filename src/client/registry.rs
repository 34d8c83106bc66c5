//! Latest decoded state per controller

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::insen::protocol::ControllerState;

/// Shared map from controller id to its most recent snapshot
///
/// Cloning shares the underlying map. Reads copy snapshots out; entries are
/// only replaced by newer decodes of the same id and are never evicted.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    states: Arc<RwLock<HashMap<u8, ControllerState>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly decoded snapshot, replacing any previous one
    pub fn update(&self, state: ControllerState) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(state.id, state);
    }

    /// Latest snapshot for a controller
    pub fn get(&self, controller_id: u8) -> Option<ControllerState> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&controller_id)
            .cloned()
    }

    /// All snapshots, ordered by controller id
    pub fn snapshot(&self) -> Vec<ControllerState> {
        let mut states: Vec<_> = self
            .states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        states.sort_by_key(|state| state.id);
        states
    }

    pub fn len(&self) -> usize {
        self.states.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
