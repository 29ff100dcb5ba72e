//! # Window Coalescing
//!
//! Nonces may resolve out of order. The low end of the window only moves
//! across a contiguous run of resolved nonces, so it always names the
//! oldest nonce still in flight.

use crate::domain::PendingNonces;

/// Advance `window.nonce_low` past every resolved nonce at the low end.
///
/// Returns how many nonces the window shrank by.
pub fn advance_low<E>(
    window: &mut PendingNonces,
    mut is_resolved: impl FnMut(u64) -> Result<bool, E>,
) -> Result<u64, E> {
    let start = window.nonce_low;
    while window.nonce_low < window.nonce_high && is_resolved(window.nonce_low)? {
        window.nonce_low += 1;
    }
    Ok(window.nonce_low - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn window(low: u64, high: u64) -> PendingNonces {
        PendingNonces {
            chain_id: 97,
            nonce_low: low,
            nonce_high: high,
        }
    }

    fn advance(w: &mut PendingNonces, resolved: &BTreeSet<u64>) -> u64 {
        advance_low::<()>(w, |n| Ok(resolved.contains(&n))).unwrap()
    }

    #[test]
    fn test_out_of_order_then_coalesce() {
        let mut w = window(0, 2);
        let mut resolved = BTreeSet::new();

        resolved.insert(1);
        assert_eq!(advance(&mut w, &resolved), 0);
        assert_eq!((w.nonce_low, w.nonce_high), (0, 2));

        resolved.insert(0);
        assert_eq!(advance(&mut w, &resolved), 2);
        assert_eq!((w.nonce_low, w.nonce_high), (2, 2));
    }

    #[test]
    fn test_never_passes_high() {
        let mut w = window(3, 4);
        let resolved: BTreeSet<u64> = (0..10).collect();
        advance(&mut w, &resolved);
        assert_eq!(w.nonce_low, 4);
    }

    proptest! {
        /// Whatever order nonces resolve in, low stays at the smallest
        /// unresolved nonce and never passes high.
        #[test]
        fn prop_low_is_oldest_unresolved(
            high in 0u64..40,
            order in proptest::collection::vec(0u64..40, 0..60),
        ) {
            let mut w = window(0, high);
            let mut resolved = BTreeSet::new();
            let mut previous_low = 0;
            for nonce in order.into_iter().filter(|n| *n < high) {
                resolved.insert(nonce);
                advance(&mut w, &resolved);

                prop_assert!(w.nonce_low >= previous_low);
                prop_assert!(w.nonce_low <= w.nonce_high);
                let oldest = (0..high).find(|n| !resolved.contains(n)).unwrap_or(high);
                prop_assert_eq!(w.nonce_low, oldest);
                previous_low = w.nonce_low;
            }
        }
    }
}
