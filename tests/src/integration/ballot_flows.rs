//! # Ballot Flows
//!
//! Observation consensus as seen through the runtime.
//!
//! ## Flows Tested
//!
//! 1. **Quorum**: three of four observers finalize an inbound ballot in one
//!    block; the fourth vote lands later and is recorded without changing
//!    the outcome
//! 2. **Duplicates**: a second vote from the same observer is rejected and
//!    leaves the committed state untouched
//! 3. **Failure quorum**: two failures out of four make success unreachable
//! 4. **Membership**: a removed observer is absent from new voter lists and
//!    its votes are rejected
//! 5. **Maturity**: finalized ballots surface once, `maturity_blocks` after
//!    creation

#[cfg(test)]
mod tests {
    use bridge_runtime::{BridgeMsg, ErrorKind};
    use cb_02_ballot_engine::{BallotStatus, VoteType};
    use cb_05_xmsg::{InboundVote, XmsgStatus};

    use crate::integration::fixtures::*;

    // =========================================================================
    // QUORUM
    // =========================================================================

    #[test]
    fn test_three_of_four_finalize_and_late_vote_is_recorded() {
        let node = create_test_node(true);
        let vote = create_test_inbound(0, BSC);

        let responses = run_ok(&node, inbound_votes(&vote, 1..=3));
        let first = xmsg_vote(&responses[0]);
        assert!(first.ballot_created);
        assert_eq!(first.ballot_status, BallotStatus::InProgress);
        assert_eq!(xmsg_vote(&responses[1]).ballot_status, BallotStatus::InProgress);
        let third = xmsg_vote(&responses[2]);
        assert_eq!(third.ballot_status, BallotStatus::FinalizedSuccess);
        assert_eq!(third.xmsg.as_ref().unwrap().status(), XmsgStatus::PendingOutbound);

        let ballot_id = first.ballot_id;
        let ballot = node.query().get_ballot(&ballot_id).unwrap().unwrap();
        assert_eq!(ballot.finalized_height, Some(1));
        assert_eq!(ballot.votes[3], VoteType::NotVoted);

        let late = run_ok(&node, inbound_votes(&vote, [4]));
        let late = xmsg_vote(&late[0]);
        assert_eq!(late.ballot_status, BallotStatus::FinalizedSuccess);
        assert!(late.xmsg.is_none());

        let query = node.query();
        let ballot = query.get_ballot(&ballot_id).unwrap().unwrap();
        assert_eq!(ballot.votes, vec![VoteType::Success; 4]);
        assert_eq!(ballot.finalized_height, Some(1));

        // The late vote must not create a second leg or allocate a nonce.
        let xmsg = query.get_xmsg(&vote.xmsg_index()).unwrap().unwrap();
        assert_eq!(xmsg.outbound.len(), 1);
        assert_eq!(query.pending_window(BSC).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_vote_rejected_without_side_effects() {
        let node = create_test_node(true);
        let vote = create_test_inbound(0, BSC);
        run_ok(&node, inbound_votes(&vote, [1]));
        let before = node.snapshot();

        let result = run(&node, inbound_votes(&vote, [1]));
        let err = result.results[0].as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(*node.snapshot(), *before);
        assert_eq!(node.height(), 2);
    }

    #[test]
    fn test_operator_key_counts_as_same_voter() {
        let node = create_test_node(true);
        let vote = create_test_inbound(0, BSC);
        run_ok(&node, inbound_votes(&vote, [2]));

        let via_operator = BridgeMsg::VoteInbound(InboundVote {
            signer: operator(2),
            ..vote.clone()
        });
        let result = run(&node, vec![via_operator]);
        assert!(result.results[0].is_err());
    }

    // =========================================================================
    // FAILURE
    // =========================================================================

    #[test]
    fn test_failure_quorum_creates_no_xmsg() {
        let node = create_test_node(true);
        let vote = InboundVote {
            vote: VoteType::Failure,
            ..create_test_inbound(0, BSC)
        };

        let responses = run_ok(&node, inbound_votes(&vote, 1..=2));
        let outcome = xmsg_vote(&responses[1]);
        assert_eq!(outcome.ballot_status, BallotStatus::FinalizedFailure);
        assert!(outcome.xmsg.is_none());

        let query = node.query();
        assert!(query.get_xmsg(&vote.xmsg_index()).unwrap().is_none());
        assert_eq!(query.pending_window(BSC).unwrap().len(), 0);
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    #[test]
    fn test_removed_observer_excluded_from_new_ballots() {
        let node = create_test_node(true);
        run_ok(
            &node,
            vec![BridgeMsg::RemoveObserver {
                signer: ADMIN,
                operator: operator(4),
            }],
        );
        assert_eq!(node.query().observer_set().unwrap().len(), 3);

        let vote = create_test_inbound(0, BSC);
        let result = run(&node, inbound_votes(&vote, [4]));
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);

        // Two of three is enough once the set shrinks.
        let responses = run_ok(&node, inbound_votes(&vote, 1..=2));
        let outcome = xmsg_vote(&responses[1]);
        assert_eq!(outcome.ballot_status, BallotStatus::FinalizedSuccess);

        let ballot = node.query().get_ballot(&outcome.ballot_id).unwrap().unwrap();
        assert_eq!(ballot.voter_list, vec![operator(1), operator(2), operator(3)]);
    }

    #[test]
    fn test_non_admin_cannot_change_membership() {
        let node = create_test_node(true);
        let result = run(
            &node,
            vec![BridgeMsg::AddObserver {
                signer: OPERATIONAL,
                operator: operator(9),
                grantee: grantee(9),
            }],
        );
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);
        assert!(node.query().get_observer(&operator(9)).unwrap().is_none());
    }

    // =========================================================================
    // MATURITY
    // =========================================================================

    #[test]
    fn test_finalized_ballot_matures_after_window() {
        let node = create_test_node(true);
        let vote = create_test_inbound(0, BSC);
        let responses = run_ok(&node, inbound_votes(&vote, 1..=3));
        let ballot_id = xmsg_vote(&responses[2]).ballot_id;

        run_ok(&node, Vec::new());
        assert!(node.query().matured_ballots().unwrap().is_empty());

        run_ok(&node, Vec::new());
        assert_eq!(node.query().matured_ballots().unwrap(), vec![ballot_id]);

        run_ok(&node, Vec::new());
        assert!(node.query().matured_ballots().unwrap().is_empty());
    }
}
