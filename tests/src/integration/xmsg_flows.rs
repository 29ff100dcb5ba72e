//! # Xmsg Flows
//!
//! Full cross-chain message lifecycles through the runtime.
//!
//! ```text
//! inbound ballot ──► PendingOutbound ──► OutboundMined
//!        │                 │
//!        ▼                 ├─ failed ──► PendingRevert ──► Reverted
//!  PendingInbound (parked) │                   └─ failed ──► Aborted
//!                          └─ failed, no revert ──────────► Aborted
//! ```
//!
//! ## Flows Tested
//!
//! 1. Inbound to mined, with an observer-reported tracker
//! 2. Failed outbound reverted to the sender chain
//! 3. Failed outbound without revert permission, and a revert that fails
//! 4. Emergency abort releasing the nonce
//! 5. Parking while outbound is disabled or no TSS exists, then draining
//! 6. Inbound addressed to the home chain
//! 7. Cross-chain pending listing, throttled by runtime rate limiter flags
//! 8. Inbound tracker reported before the inbound ballot finalizes

#[cfg(test)]
mod tests {
    use bridge_runtime::{BridgeMsg, BridgeNode, ErrorKind, MsgResponse};
    use cb_01_observer_registry::CrosschainFlags;
    use cb_04_nonce_allocator::TrackerUpdate;
    use cb_05_xmsg::{
        InboundVote, RateLimiterFlags, ReceiveStatus, TrackerOutcome, Xmsg, XmsgStatus,
    };
    use shared_types::U256;

    use crate::integration::fixtures::*;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn create_test_xmsg(node: &BridgeNode, vote: &InboundVote) -> Xmsg {
        let responses = run_ok(node, inbound_votes(vote, 1..=3));
        xmsg_vote(&responses[2]).xmsg.clone().unwrap()
    }

    fn flags(inbound: bool, outbound: bool) -> CrosschainFlags {
        CrosschainFlags {
            is_inbound_enabled: inbound,
            is_outbound_enabled: outbound,
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    #[test]
    fn test_inbound_to_outbound_mined() {
        let node = create_test_node(true);
        let vote = create_test_inbound(0, BSC);
        let xmsg = create_test_xmsg(&node, &vote);
        assert_eq!(xmsg.status(), XmsgStatus::PendingOutbound);
        assert_eq!(xmsg.current_outbound().unwrap().tss_pubkey, "tss-genesis");

        let tracked = run_ok(
            &node,
            vec![BridgeMsg::AddToOutTxTracker {
                signer: grantee(2),
                chain_id: BSC,
                nonce: 0,
                tx_hash: [0x40; 32],
                proof: None,
            }],
        );
        assert_eq!(tracked[0], MsgResponse::Tracker(TrackerOutcome::Updated(TrackerUpdate::Created)));
        assert_eq!(node.query().get_tracker(BSC, 0).unwrap().unwrap().hash_list.len(), 1);

        let responses = run_ok(&node, outbound_votes(&xmsg, ReceiveStatus::Success, 1..=3));
        let mined = xmsg_vote(&responses[2]).xmsg.clone().unwrap();
        assert_eq!(mined.status(), XmsgStatus::OutboundMined);

        let query = node.query();
        let stored = query.get_xmsg(&xmsg.index).unwrap().unwrap();
        assert_eq!(stored, mined);
        let leg = stored.current_outbound().unwrap();
        assert_eq!(leg.observed_tx_hash, Some([0x40; 32]));
        assert_eq!(leg.receive_status, Some(ReceiveStatus::Success));
        assert!(query.get_tracker(BSC, 0).unwrap().is_none());
        assert_eq!(query.pending_window(BSC).unwrap().len(), 0);
        assert_eq!(query.xmsgs_by_in_tx_hash(&vote.in_tx_hash).unwrap(), vec![stored]);
    }

    #[test]
    fn test_failed_outbound_reverts_to_sender() {
        let node = create_test_node(true);
        let xmsg = create_test_xmsg(&node, &create_test_inbound(0, BSC));

        let responses = run_ok(&node, outbound_votes(&xmsg, ReceiveStatus::Failed, 1..=3));
        let reverting = xmsg_vote(&responses[2]).xmsg.clone().unwrap();
        assert_eq!(reverting.status(), XmsgStatus::PendingRevert);
        assert_eq!(reverting.outbound.len(), 2);
        let revert_leg = reverting.current_outbound().unwrap();
        assert_eq!(revert_leg.receiver_chain_id, EVM);
        assert_eq!(revert_leg.receiver, vec![0xaa; 20]);
        assert_eq!(revert_leg.nonce, Some(0));

        let query = node.query();
        assert_eq!(query.pending_window(BSC).unwrap().len(), 0);
        assert_eq!(query.pending_window(EVM).unwrap().len(), 1);

        let responses = run_ok(&node, outbound_votes(&reverting, ReceiveStatus::Success, 1..=3));
        let reverted = xmsg_vote(&responses[2]).xmsg.clone().unwrap();
        assert_eq!(reverted.status(), XmsgStatus::Reverted);
        assert_eq!(node.query().pending_window(EVM).unwrap().len(), 0);
    }

    #[test]
    fn test_failed_revert_aborts() {
        let node = create_test_node(true);
        let xmsg = create_test_xmsg(&node, &create_test_inbound(0, BSC));
        let responses = run_ok(&node, outbound_votes(&xmsg, ReceiveStatus::Failed, 1..=3));
        let reverting = xmsg_vote(&responses[2]).xmsg.clone().unwrap();
        assert_eq!(node.query().pending_window(EVM).unwrap().len(), 1);

        let responses = run_ok(&node, outbound_votes(&reverting, ReceiveStatus::Failed, 1..=3));
        let aborted = xmsg_vote(&responses[2]).xmsg.clone().unwrap();
        assert_eq!(aborted.status(), XmsgStatus::Aborted);

        let query = node.query();
        assert_eq!(query.pending_window(EVM).unwrap().len(), 0);
        assert_eq!(query.pending_window(BSC).unwrap().len(), 0);
        assert_eq!(query.get_xmsg(&xmsg.index).unwrap().unwrap().status(), XmsgStatus::Aborted);

        let mut late = outbound_votes(&reverting, ReceiveStatus::Success, [4]);
        if let BridgeMsg::VoteOutbound(vote) = &mut late[0] {
            vote.observed_tx_hash = [0xee; 32];
        }
        let result = run(&node, late);
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);
        assert_eq!(
            node.query().get_xmsg(&xmsg.index).unwrap().unwrap().status(),
            XmsgStatus::Aborted
        );
    }

    #[test]
    fn test_failed_outbound_without_revert_aborts() {
        let node = create_test_node(true);
        let vote = InboundVote {
            allow_revert: false,
            ..create_test_inbound(0, BSC)
        };
        let xmsg = create_test_xmsg(&node, &vote);

        let responses = run_ok(&node, outbound_votes(&xmsg, ReceiveStatus::Failed, 1..=3));
        let aborted = xmsg_vote(&responses[2]).xmsg.clone().unwrap();
        assert_eq!(aborted.status(), XmsgStatus::Aborted);
        assert_eq!(aborted.outbound.len(), 1);
        assert_eq!(node.query().pending_window(EVM).unwrap().len(), 0);
    }

    #[test]
    fn test_emergency_abort_releases_nonce() {
        let node = create_test_node(true);
        let xmsg = create_test_xmsg(&node, &create_test_inbound(0, BSC));

        let denied = run(
            &node,
            vec![BridgeMsg::AbortStuckXmsg {
                signer: STRANGER,
                index: xmsg.index,
            }],
        );
        assert_eq!(denied.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);

        let responses = run_ok(
            &node,
            vec![BridgeMsg::AbortStuckXmsg {
                signer: EMERGENCY,
                index: xmsg.index,
            }],
        );
        match &responses[0] {
            MsgResponse::Aborted(aborted) => assert_eq!(aborted.status(), XmsgStatus::Aborted),
            other => panic!("expected an aborted xmsg, got {other:?}"),
        }
        let window = node.query().pending_window(BSC).unwrap();
        assert_eq!((window.nonce_low, window.nonce_high), (1, 1));

        // Observers reporting the abandoned nonce change nothing.
        let late = run(&node, outbound_votes(&xmsg, ReceiveStatus::Success, 1..=3));
        assert!(late.results.iter().all(|r| r.is_err()));
    }

    // =========================================================================
    // PARKING
    // =========================================================================

    #[test]
    fn test_outbound_disabled_parks_until_reenabled() {
        let node = create_test_node(true);
        let responses = run_ok(
            &node,
            vec![BridgeMsg::UpdateCrosschainFlags {
                signer: EMERGENCY,
                flags: flags(true, false),
            }],
        );
        assert_eq!(
            responses[0],
            MsgResponse::CrosschainFlags {
                previous: flags(true, true),
                scheduled: 0,
            }
        );

        let xmsg = create_test_xmsg(&node, &create_test_inbound(0, BSC));
        assert_eq!(xmsg.status(), XmsgStatus::PendingInbound);

        // Enabling is Operational; the emergency key alone cannot do it.
        let denied = run(
            &node,
            vec![BridgeMsg::UpdateCrosschainFlags {
                signer: EMERGENCY,
                flags: flags(true, true),
            }],
        );
        assert!(denied.results[0].is_err());

        let responses = run_ok(
            &node,
            vec![BridgeMsg::UpdateCrosschainFlags {
                signer: OPERATIONAL,
                flags: flags(true, true),
            }],
        );
        assert_eq!(
            responses[0],
            MsgResponse::CrosschainFlags {
                previous: flags(true, false),
                scheduled: 1,
            }
        );
        let scheduled = node.query().get_xmsg(&xmsg.index).unwrap().unwrap();
        assert_eq!(scheduled.status(), XmsgStatus::PendingOutbound);
        assert_eq!(scheduled.current_outbound().unwrap().nonce, Some(0));
    }

    #[test]
    fn test_inbound_disabled_rejects_votes() {
        let node = create_test_node(true);
        run_ok(
            &node,
            vec![BridgeMsg::UpdateCrosschainFlags {
                signer: EMERGENCY,
                flags: flags(false, true),
            }],
        );
        let result = run(&node, inbound_votes(&create_test_inbound(0, BSC), [1]));
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);
    }

    #[test]
    fn test_missing_tss_parks_until_keygen() {
        let node = create_test_node(false);
        let xmsg = create_test_xmsg(&node, &create_test_inbound(0, BSC));
        assert_eq!(xmsg.status(), XmsgStatus::PendingInbound);

        let responses = run_ok(
            &node,
            vec![BridgeMsg::SetTss {
                signer: ADMIN,
                tss: create_test_tss("tss-rotated"),
            }],
        );
        assert_eq!(responses[0], MsgResponse::Applied { scheduled: 1 });

        let query = node.query();
        assert_eq!(query.get_tss().unwrap().unwrap().pubkey, "tss-rotated");
        let scheduled = query.get_xmsg(&xmsg.index).unwrap().unwrap();
        assert_eq!(scheduled.status(), XmsgStatus::PendingOutbound);
        assert_eq!(scheduled.current_outbound().unwrap().tss_pubkey, "tss-rotated");
    }

    // =========================================================================
    // EDGE CASES
    // =========================================================================

    #[test]
    fn test_home_chain_receiver_is_aborted() {
        let node = create_test_node(true);
        let xmsg = create_test_xmsg(&node, &create_test_inbound(0, HOME));
        assert_eq!(xmsg.status(), XmsgStatus::Aborted);
        assert!(xmsg.current_outbound().unwrap().nonce.is_none());
    }

    #[test]
    fn test_pending_listing_spans_chains() {
        let node = create_test_node(true);
        let to_bsc = create_test_xmsg(&node, &create_test_inbound(0, BSC));
        let to_evm = create_test_xmsg(&node, &create_test_inbound(1, EVM));

        let pending = node.query().list_pending_within_rate_limit(None).unwrap();
        assert_eq!(pending.total_pending, 2);
        assert!(!pending.rate_limit_exceeded);
        let indexes: Vec<_> = pending.xmsgs.iter().map(|x| x.index).collect();
        assert!(indexes.contains(&to_bsc.index));
        assert!(indexes.contains(&to_evm.index));
    }

    #[test]
    fn test_rate_limiter_flags_updated_at_runtime() {
        let node = create_test_node(true);
        create_test_xmsg(&node, &create_test_inbound(0, BSC));
        create_test_xmsg(&node, &create_test_inbound(1, EVM));
        let flags = RateLimiterFlags {
            enabled: true,
            window_blocks: 10,
            rate_per_block: U256::from(150u64),
        };

        let result = run(
            &node,
            vec![BridgeMsg::UpdateRateLimiterFlags {
                signer: STRANGER,
                flags: flags.clone(),
            }],
        );
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);
        assert!(!node.query().rate_limiter_flags().unwrap().enabled);

        let responses = run_ok(
            &node,
            vec![BridgeMsg::UpdateRateLimiterFlags {
                signer: OPERATIONAL,
                flags: flags.clone(),
            }],
        );
        match &responses[0] {
            MsgResponse::RateLimiterFlags(previous) => assert!(!previous.enabled),
            other => panic!("expected rate limiter flags, got {other:?}"),
        }

        let query = node.query();
        assert_eq!(query.rate_limiter_flags().unwrap(), flags);
        // Two 1000 transfers against at most 150 * 10.
        let pending = query.list_pending_within_rate_limit(None).unwrap();
        assert!(pending.rate_limit_exceeded);
        assert!(pending.xmsgs.is_empty());
        assert_eq!(pending.total_pending, 2);
    }

    #[test]
    fn test_in_tx_tracker_until_inbound_finalizes() {
        let node = create_test_node(true);
        let vote = create_test_inbound(0, BSC);
        let report = |signer| BridgeMsg::AddToInTxTracker {
            signer,
            chain_id: EVM,
            tx_hash: vote.in_tx_hash,
            proof: None,
        };

        let result = run(&node, vec![report(STRANGER)]);
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);
        assert!(node.query().get_in_tx_tracker(EVM, &vote.in_tx_hash).unwrap().is_none());

        let responses = run_ok(&node, vec![report(grantee(2)), report(EMERGENCY)]);
        assert_eq!(responses[0], MsgResponse::InTxTracker(TrackerUpdate::Created));
        assert_eq!(responses[1], MsgResponse::InTxTracker(TrackerUpdate::Unchanged));
        let tracker = node.query().get_in_tx_tracker(EVM, &vote.in_tx_hash).unwrap().unwrap();
        assert_eq!(tracker.signer, grantee(2));
        assert_eq!(node.query().list_in_tx_trackers(None).unwrap().len(), 1);

        create_test_xmsg(&node, &vote);
        assert!(node.query().get_in_tx_tracker(EVM, &vote.in_tx_hash).unwrap().is_none());
        assert!(node.query().list_in_tx_trackers(Some(EVM)).unwrap().is_empty());
    }
}
