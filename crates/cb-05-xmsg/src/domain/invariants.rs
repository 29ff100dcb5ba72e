//! # Domain Invariants
//!
//! Business rules for xmsgs.

use super::entities::Xmsg;
use super::errors::XmsgError;

/// Invariant: a leg awaiting an outbound observation holds a nonce.
pub fn invariant_outbound_has_nonce(xmsg: &Xmsg) -> Result<u64, XmsgError> {
    xmsg.current_outbound()
        .and_then(|leg| leg.nonce)
        .ok_or_else(|| XmsgError::MissingNonce(xmsg.index.to_string()))
}

/// Invariant: a queued xmsg has exactly one leg and no nonce yet.
pub fn invariant_queued_unscheduled(xmsg: &Xmsg) -> bool {
    xmsg.outbound.len() == 1 && xmsg.outbound[0].nonce.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InboundTxParams, OutboundTxParams, StatusRecord, XmsgIndex};
    use cb_02_ballot_engine::BallotId;
    use shared_types::U256;

    fn create_test_xmsg(nonce: Option<u64>) -> Xmsg {
        let mut leg = OutboundTxParams::new(97, vec![1], U256::one());
        leg.nonce = nonce;
        Xmsg {
            index: XmsgIndex([7u8; 32]),
            message: Vec::new(),
            allow_revert: false,
            status: StatusRecord::default(),
            inbound: InboundTxParams {
                sender_chain_id: 1,
                sender: vec![2],
                in_tx_hash: [3u8; 32],
                in_block_height: 1,
                event_index: 0,
                amount: U256::one(),
                ballot_id: BallotId([4u8; 32]),
                finalized_height: 1,
            },
            outbound: vec![leg],
        }
    }

    #[test]
    fn test_outbound_has_nonce() {
        assert_eq!(invariant_outbound_has_nonce(&create_test_xmsg(Some(3))).unwrap(), 3);
        assert!(matches!(
            invariant_outbound_has_nonce(&create_test_xmsg(None)),
            Err(XmsgError::MissingNonce(_))
        ));
    }

    #[test]
    fn test_queued_unscheduled() {
        assert!(invariant_queued_unscheduled(&create_test_xmsg(None)));
        assert!(!invariant_queued_unscheduled(&create_test_xmsg(Some(0))));
    }
}
