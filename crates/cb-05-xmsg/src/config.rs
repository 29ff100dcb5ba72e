//! # Xmsg Configuration

use serde::{Deserialize, Serialize};
use shared_types::U256;

/// xmsg State Machine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmsgConfig {
    /// Width of the withdraw rate-limit sliding window, in bridge blocks.
    /// Used until rate limiter flags are stored on chain.
    pub rate_limit_window_blocks: u64,
    /// Amount allowed per block inside the window; `None` disables the
    /// limiter. Used until rate limiter flags are stored on chain.
    pub rate_limit_per_block: Option<U256>,
    /// Upper bound on xmsgs returned by pending queries.
    pub max_pending_query: u32,
}

impl Default for XmsgConfig {
    fn default() -> Self {
        Self {
            rate_limit_window_blocks: 100,
            rate_limit_per_block: None,
            max_pending_query: 500,
        }
    }
}

impl XmsgConfig {
    /// Create a config for testing (small window and query cap).
    pub fn for_testing() -> Self {
        Self {
            rate_limit_window_blocks: 10,
            rate_limit_per_block: None,
            max_pending_query: 10,
        }
    }

    /// Clamp a requested limit to `max_pending_query`; zero means the maximum.
    pub fn query_limit(&self, requested: Option<u32>) -> usize {
        match requested {
            Some(limit) if limit > 0 && limit < self.max_pending_query => limit as usize,
            _ => self.max_pending_query as usize,
        }
    }
}
