//! # Domain Invariants
//!
//! Rules tying the counter to the pending window.

use super::entities::{ChainNonces, PendingNonces};
use super::errors::NonceError;

/// Invariant: `nonce_low <= nonce_high`.
pub fn invariant_window_ordered(window: &PendingNonces) -> bool {
    window.nonce_low <= window.nonce_high
}

/// Invariant: the next nonce to hand out is the window's upper bound.
pub fn invariant_counter_matches(
    counter: &ChainNonces,
    window: &PendingNonces,
) -> Result<(), NonceError> {
    if counter.nonce != window.nonce_high {
        return Err(NonceError::NonceMismatch {
            chain_id: counter.chain_id,
            counter: counter.nonce,
            high: window.nonce_high,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_must_match_high() {
        let counter = ChainNonces {
            chain_id: 97,
            nonce: 3,
        };
        let mut window = PendingNonces {
            chain_id: 97,
            nonce_low: 1,
            nonce_high: 3,
        };
        assert!(invariant_counter_matches(&counter, &window).is_ok());
        window.nonce_high = 4;
        assert!(matches!(
            invariant_counter_matches(&counter, &window),
            Err(NonceError::NonceMismatch { counter: 3, high: 4, .. })
        ));
    }

    #[test]
    fn test_window_order() {
        let mut window = PendingNonces::empty(1);
        assert!(invariant_window_ordered(&window));
        window.nonce_low = 1;
        assert!(!invariant_window_ordered(&window));
    }
}
