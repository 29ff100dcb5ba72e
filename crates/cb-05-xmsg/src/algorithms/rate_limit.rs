//! # Withdraw Rate Limiter
//!
//! Sliding-window budget on the amount carried by pending outbound legs.
//! The budget is `per_block * window`. When the oldest pending xmsg is older
//! than the window, the window widens to reach it and the budget scales
//! with it, so a backlog is never permanently starved.

use shared_types::U256;

/// Width of the rate-limit window at `current_height`.
///
/// `oldest_pending_height` is the bridge height at which the oldest still
/// pending xmsg finalized its inbound, if any.
pub fn effective_window(current_height: u64, window_blocks: u64, oldest_pending_height: Option<u64>) -> u64 {
    let window_blocks = window_blocks.max(1);
    match oldest_pending_height {
        Some(oldest) if oldest <= current_height => {
            let pending_span = current_height - oldest + 1;
            pending_span.max(window_blocks)
        }
        _ => window_blocks,
    }
}

/// Amount budget for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawBudget {
    limit: U256,
    spent: U256,
}

impl WithdrawBudget {
    /// Budget of `per_block` for each block in the window.
    pub fn new(per_block: U256, window_blocks: u64) -> Self {
        Self {
            limit: per_block.saturating_mul(U256::from(window_blocks)),
            spent: U256::zero(),
        }
    }

    /// Charge `amount`. Returns false if the total now exceeds the limit.
    ///
    /// The amount is counted either way, so once exceeded the budget stays
    /// exceeded for the rest of the pass.
    pub fn charge(&mut self, amount: U256) -> bool {
        self.spent = self.spent.saturating_add(amount);
        self.spent <= self.limit
    }

    /// Total charged so far.
    pub fn spent(&self) -> U256 {
        self.spent
    }

    /// Window limit.
    pub fn limit(&self) -> U256 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_widens_for_old_backlog() {
        assert_eq!(effective_window(100, 10, None), 10);
        assert_eq!(effective_window(100, 10, Some(95)), 10);
        assert_eq!(effective_window(100, 10, Some(51)), 50);
        assert_eq!(effective_window(100, 0, None), 1);
    }

    #[test]
    fn test_budget_stays_exceeded() {
        let mut budget = WithdrawBudget::new(U256::from(10u64), 3);
        assert_eq!(budget.limit(), U256::from(30u64));
        assert!(budget.charge(U256::from(20u64)));
        assert!(budget.charge(U256::from(10u64)));
        assert!(!budget.charge(U256::from(1u64)));
        assert!(!budget.charge(U256::zero()));
        assert_eq!(budget.spent(), U256::from(31u64));
    }
}
