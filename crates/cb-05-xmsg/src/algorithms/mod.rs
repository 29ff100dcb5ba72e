//! # Algorithms
//!
//! Pure helpers used by the xmsg service.

pub mod rate_limit;

pub use rate_limit::{effective_window, WithdrawBudget};
