//! Per-run accumulator storage threaded through evaluation calls.

use qgate_core::types::Accumulator;
use rustc_hash::FxHashMap;

/// Rule identity → accumulator, owned by one run.
///
/// Mutated only inside evaluation calls. No internal locking: callers that
/// evaluate from several tasks wrap it in a mutex and serialize access.
#[derive(Debug, Clone, Default)]
pub struct QualityGateState {
    slots: FxHashMap<String, Accumulator>,
}

impl QualityGateState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, rule_id: &str) -> Option<&Accumulator> {
        self.slots.get(rule_id)
    }

    pub fn set(&mut self, rule_id: impl Into<String>, value: Accumulator) {
        self.slots.insert(rule_id.into(), value);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Accessor scoped to one rule identity.
    pub fn slot<'a>(&'a mut self, rule_id: &'a str) -> StateSlot<'a> {
        StateSlot::bound(self, rule_id)
    }
}

/// A rule's view of its own accumulator.
///
/// A detached slot (no state supplied) reads nothing and drops writes, which
/// makes a pass stateless.
#[derive(Debug)]
pub struct StateSlot<'a> {
    state: Option<&'a mut QualityGateState>,
    key: &'a str,
}

impl<'a> StateSlot<'a> {
    pub fn bound(state: &'a mut QualityGateState, key: &'a str) -> Self {
        Self {
            state: Some(state),
            key,
        }
    }

    pub fn detached(key: &'a str) -> Self {
        Self { state: None, key }
    }

    pub fn key(&self) -> &str {
        self.key
    }

    pub fn get(&self) -> Option<&Accumulator> {
        self.state.as_deref().and_then(|state| state.get(self.key))
    }

    pub fn set(&mut self, value: Accumulator) {
        if let Some(state) = self.state.as_deref_mut() {
            state.set(self.key, value);
        }
    }

    /// Previous count, zero when absent.
    pub fn count(&self) -> u64 {
        self.get().and_then(Accumulator::as_count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_slot_reads_and_writes_its_key_only() {
        let mut state = QualityGateState::new();
        state.set("other", Accumulator::Count(9));
        {
            let mut slot = state.slot("smoke/maxFailures");
            assert_eq!(slot.count(), 0);
            slot.set(Accumulator::Count(3));
            assert_eq!(slot.count(), 3);
        }
        assert_eq!(state.get("smoke/maxFailures"), Some(&Accumulator::Count(3)));
        assert_eq!(state.get("other"), Some(&Accumulator::Count(9)));
    }

    #[test]
    fn detached_slot_is_a_no_op() {
        let mut slot = StateSlot::detached("maxFailures");
        slot.set(Accumulator::Count(5));
        assert!(slot.get().is_none());
        assert_eq!(slot.count(), 0);
    }
}
