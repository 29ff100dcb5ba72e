//! Pending window arithmetic.

pub mod window;

pub use window::advance_low;
