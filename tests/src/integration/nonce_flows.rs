//! # Nonce Flows
//!
//! Outbound nonce allocation on one destination chain (BSC testnet, id 97)
//! driven by inbound and outbound ballots.
//!
//! ## Flows Tested
//!
//! 1. **Out-of-order confirmation**: the low end of the pending window only
//!    moves over a contiguous run of resolved nonces
//! 2. **Window cap**: with three nonces in flight the next xmsg is parked
//!    and picks up a nonce when the oldest one resolves
//! 3. **Admin reset**: skipping the window forward drains the parked queue;
//!    moving it backwards is rejected so no nonce is handed out twice

#[cfg(test)]
mod tests {
    use bridge_runtime::{BridgeMsg, BridgeNode, ErrorKind, MsgResponse};
    use cb_04_nonce_allocator::PendingNonces;
    use cb_05_xmsg::{ReceiveStatus, Xmsg, XmsgStatus};

    use crate::integration::fixtures::*;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn window(low: u64, high: u64) -> PendingNonces {
        PendingNonces {
            chain_id: BSC,
            nonce_low: low,
            nonce_high: high,
        }
    }

    /// Finalize `count` inbound events to BSC in one block; returns the
    /// xmsgs in event order.
    fn create_test_xmsgs(node: &BridgeNode, count: u64) -> Vec<Xmsg> {
        let msgs = (0..count)
            .flat_map(|event| inbound_votes(&create_test_inbound(event, BSC), 1..=3))
            .collect();
        run_ok(node, msgs);

        let query = node.query();
        (0..count)
            .map(|event| {
                let index = create_test_inbound(event, BSC).xmsg_index();
                query.get_xmsg(&index).unwrap().unwrap()
            })
            .collect()
    }

    fn mine(node: &BridgeNode, xmsg: &Xmsg) {
        run_ok(node, outbound_votes(xmsg, ReceiveStatus::Success, 1..=3));
    }

    // =========================================================================
    // WINDOW
    // =========================================================================

    #[test]
    fn test_out_of_order_confirmation_on_chain_97() {
        let node = create_test_node(true);
        assert_eq!(node.query().pending_window(BSC).unwrap(), window(0, 0));

        let xmsgs = create_test_xmsgs(&node, 2);
        assert_eq!(xmsgs[0].current_outbound().unwrap().nonce, Some(0));
        assert_eq!(xmsgs[1].current_outbound().unwrap().nonce, Some(1));
        assert_eq!(node.query().pending_window(BSC).unwrap(), window(0, 2));

        mine(&node, &xmsgs[1]);
        let query = node.query();
        assert_eq!(query.pending_window(BSC).unwrap(), window(0, 2));
        let pending = query.list_pending_xmsgs(BSC, None).unwrap();
        assert_eq!(pending.total_pending, 2);
        assert_eq!(pending.xmsgs.len(), 1);
        assert_eq!(pending.xmsgs[0].index, xmsgs[0].index);

        mine(&node, &xmsgs[0]);
        let query = node.query();
        assert_eq!(query.pending_window(BSC).unwrap(), window(2, 2));
        assert!(query.list_pending_xmsgs(BSC, None).unwrap().xmsgs.is_empty());
        for xmsg in &xmsgs {
            let stored = query.get_xmsg(&xmsg.index).unwrap().unwrap();
            assert_eq!(stored.status(), XmsgStatus::OutboundMined);
        }
    }

    #[test]
    fn test_full_window_parks_and_drains_in_order() {
        let node = create_test_node(true);
        let xmsgs = create_test_xmsgs(&node, 5);

        assert_eq!(node.query().pending_window(BSC).unwrap(), window(0, 3));
        for parked in &xmsgs[3..] {
            assert_eq!(parked.status(), XmsgStatus::PendingInbound);
            assert!(parked.current_outbound().unwrap().nonce.is_none());
        }

        mine(&node, &xmsgs[0]);
        let query = node.query();
        assert_eq!(query.pending_window(BSC).unwrap(), window(1, 4));
        let fourth = query.get_xmsg(&xmsgs[3].index).unwrap().unwrap();
        assert_eq!(fourth.status(), XmsgStatus::PendingOutbound);
        assert_eq!(fourth.current_outbound().unwrap().nonce, Some(3));
        let fifth = query.get_xmsg(&xmsgs[4].index).unwrap().unwrap();
        assert_eq!(fifth.status(), XmsgStatus::PendingInbound);
        assert_eq!(query.xmsg_by_nonce(BSC, 3).unwrap().unwrap().index, xmsgs[3].index);
    }

    // =========================================================================
    // ADMIN RESET
    // =========================================================================

    #[test]
    fn test_reset_skips_window_and_drains_queue() {
        let node = create_test_node(true);
        let xmsgs = create_test_xmsgs(&node, 4);
        assert_eq!(xmsgs[3].status(), XmsgStatus::PendingInbound);

        let responses = run_ok(
            &node,
            vec![BridgeMsg::ResetChainNonces {
                signer: ADMIN,
                chain_id: BSC,
                low: 3,
                high: 3,
            }],
        );
        assert_eq!(
            responses[0],
            MsgResponse::NonceWindow {
                window: window(3, 3),
                scheduled: 1,
            }
        );

        let query = node.query();
        assert_eq!(query.pending_window(BSC).unwrap(), window(3, 4));
        let pending = query.list_pending_xmsgs(BSC, None).unwrap();
        assert_eq!(pending.xmsgs.len(), 1);
        assert_eq!(pending.xmsgs[0].index, xmsgs[3].index);
    }

    #[test]
    fn test_reset_requires_admin() {
        let node = create_test_node(true);
        let result = run(
            &node,
            vec![BridgeMsg::ResetChainNonces {
                signer: OPERATIONAL,
                chain_id: BSC,
                low: 0,
                high: 10,
            }],
        );
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);
        assert_eq!(node.query().pending_window(BSC).unwrap(), window(0, 0));
    }

    #[test]
    fn test_reset_backwards_rejected() {
        let node = create_test_node(true);
        let xmsgs = create_test_xmsgs(&node, 2);
        mine(&node, &xmsgs[1]);

        let result = run(
            &node,
            vec![BridgeMsg::ResetChainNonces {
                signer: ADMIN,
                chain_id: BSC,
                low: 0,
                high: 0,
            }],
        );
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);
        assert_eq!(node.query().pending_window(BSC).unwrap(), window(0, 2));

        mine(&node, &xmsgs[0]);
        assert_eq!(node.query().pending_window(BSC).unwrap(), window(2, 2));
        run_ok(&node, inbound_votes(&create_test_inbound(2, BSC), 1..=3));
        let index = create_test_inbound(2, BSC).xmsg_index();
        let third = node.query().get_xmsg(&index).unwrap().unwrap();
        assert_eq!(third.current_outbound().unwrap().nonce, Some(2));
    }
}
