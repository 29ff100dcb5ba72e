//! # Integration Flows
//!
//! Each module drives a `BridgeNode` block by block and asserts on the
//! committed snapshot through its query service.

#[cfg(test)]
mod fixtures;

pub mod ballot_flows;
pub mod nonce_flows;
pub mod proof_flows;
pub mod xmsg_flows;
