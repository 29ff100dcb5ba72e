//! # Domain Invariants

use super::entities::ChainState;

/// Invariant: the retained range is non-empty and ordered.
pub fn invariant_chain_state_ordered(state: &ChainState) -> bool {
    state.earliest_height <= state.latest_height
}

/// Invariant: the retained range never exceeds the retention window.
pub fn invariant_within_retention(state: &ChainState, retention: u64) -> bool {
    retention == 0 || state.latest_height - state.earliest_height < retention
}
