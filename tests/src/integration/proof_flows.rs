//! # Proof Flows
//!
//! Light-client headers voted in by observers, then used to prove outbound
//! transactions reported by parties outside the observer set.
//!
//! ## Flows Tested
//!
//! 1. **Header ballot**: a Bitcoin header is stored once three of four
//!    observers agree on it
//! 2. **Prove**: merkle inclusion against the stored header, both single
//!    and batched
//! 3. **Proved tracker**: a non-observer reports an outbound hash with a
//!    proof; without one it is rejected
//! 4. **Verification switch**: proofs fail while verification is disabled
//! 5. **Inner node**: two concatenated txids are not a transaction, even
//!    though they hash onto the merkle path

#[cfg(test)]
mod tests {
    use bridge_runtime::{BridgeMsg, BridgeNode, ErrorKind, MsgResponse};
    use cb_02_ballot_engine::BallotStatus;
    use cb_03_light_client::{
        build_merkle_path, compute_merkle_root, double_sha256, HeaderData, Proof, ProofRequest,
        VerificationFlags,
    };
    use cb_04_nonce_allocator::TrackerUpdate;
    use cb_05_xmsg::{TrackerOutcome, TrackerProof, XmsgStatus};
    use shared_types::Hash;

    use crate::integration::fixtures::*;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    /// One-input, one-output legacy transaction; `seed` varies the outpoint.
    fn create_test_tx(seed: u64) -> Vec<u8> {
        let mut tx = Vec::with_capacity(60);
        tx.extend_from_slice(&2u32.to_le_bytes());
        tx.push(1);
        tx.extend_from_slice(&[0x22; 24]);
        tx.extend_from_slice(&seed.to_le_bytes());
        tx.extend_from_slice(&0u32.to_le_bytes());
        tx.push(0);
        tx.extend_from_slice(&u32::MAX.to_le_bytes());
        tx.push(1);
        tx.extend_from_slice(&10_000u64.to_le_bytes());
        tx.push(0);
        tx.extend_from_slice(&0u32.to_le_bytes());
        tx
    }

    /// A regtest block with four transactions.
    struct TestBlock {
        header: Vec<u8>,
        hash: Hash,
        txs: Vec<Vec<u8>>,
        txids: Vec<Hash>,
    }

    impl TestBlock {
        fn proof(&self, index: usize) -> Proof {
            Proof::Bitcoin {
                tx_bytes: self.txs[index].clone(),
                path: build_merkle_path(&self.txids, index).unwrap(),
            }
        }
    }

    fn create_test_block() -> TestBlock {
        let txs: Vec<Vec<u8>> = (0..4).map(create_test_tx).collect();
        let txids: Vec<Hash> = txs.iter().map(|tx| double_sha256(tx)).collect();
        let root = compute_merkle_root(&txids);

        let mut header = Vec::with_capacity(80);
        header.extend_from_slice(&1u32.to_le_bytes());
        header.extend_from_slice(&[0x11; 32]);
        header.extend_from_slice(&root);
        header.extend_from_slice(&((NOW - 600) as u32).to_le_bytes());
        header.extend_from_slice(&0x207f_ffffu32.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());

        TestBlock {
            hash: double_sha256(&header),
            header,
            txs,
            txids,
        }
    }

    fn header_votes(block: &TestBlock, voters: impl IntoIterator<Item = u8>) -> Vec<BridgeMsg> {
        voters
            .into_iter()
            .map(|i| BridgeMsg::VoteBlockHeader {
                signer: grantee(i),
                chain_id: BTC,
                block_hash: block.hash,
                height: 120,
                header: HeaderData::Bitcoin(block.header.clone()),
            })
            .collect()
    }

    fn enable_verification() -> BridgeMsg {
        BridgeMsg::UpdateVerificationFlags {
            signer: OPERATIONAL,
            flags: VerificationFlags::all_enabled(),
        }
    }

    /// Node with verification on and `block` stored.
    fn create_test_node_with_block(block: &TestBlock) -> BridgeNode {
        let node = create_test_node(true);
        let mut msgs = vec![enable_verification()];
        msgs.extend(header_votes(block, 1..=3));
        run_ok(&node, msgs);
        node
    }

    // =========================================================================
    // HEADERS
    // =========================================================================

    #[test]
    fn test_header_stored_after_quorum() {
        let node = create_test_node(true);
        let block = create_test_block();

        let responses = run_ok(&node, header_votes(&block, 1..=2));
        match &responses[1] {
            MsgResponse::HeaderVote(outcome) => {
                assert_eq!(outcome.status, BallotStatus::InProgress);
                assert!(!outcome.header_stored);
            }
            other => panic!("expected a header vote, got {other:?}"),
        }
        assert!(node.query().get_block_header(&block.hash).unwrap().is_none());

        let responses = run_ok(&node, header_votes(&block, [3]));
        match &responses[0] {
            MsgResponse::HeaderVote(outcome) => {
                assert_eq!(outcome.status, BallotStatus::FinalizedSuccess);
                assert!(outcome.header_stored);
            }
            other => panic!("expected a header vote, got {other:?}"),
        }

        let query = node.query();
        let stored = query.get_block_header(&block.hash).unwrap().unwrap();
        assert_eq!(stored.height, 120);
        assert_eq!(stored.parent_hash, [0x11; 32]);
        let state = query.chain_state(BTC).unwrap().unwrap();
        assert_eq!(state.latest_block_hash, block.hash);
        assert_eq!((state.earliest_height, state.latest_height), (120, 120));
    }

    #[test]
    fn test_mismatched_header_hash_rejected() {
        let node = create_test_node(true);
        let block = create_test_block();
        let bad = BridgeMsg::VoteBlockHeader {
            signer: grantee(1),
            chain_id: BTC,
            block_hash: [0x77; 32],
            height: 120,
            header: HeaderData::Bitcoin(block.header.clone()),
        };
        let result = run(&node, vec![bad]);
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);
    }

    // =========================================================================
    // PROVE
    // =========================================================================

    #[test]
    fn test_prove_against_stored_header() {
        let block = create_test_block();
        let node = create_test_node_with_block(&block);
        let query = node.query();

        assert!(query
            .prove(BTC, &block.hash, &block.proof(1), 1, &block.txids[1])
            .unwrap());
        assert!(!query
            .prove(BTC, &block.hash, &block.proof(1), 1, &block.txids[2])
            .unwrap());
        assert!(!query
            .prove(BTC, &block.hash, &block.proof(1), 0, &block.txids[1])
            .unwrap());
        assert!(query
            .prove(BTC, &[0x01; 32], &block.proof(1), 1, &block.txids[1])
            .is_err());
    }

    #[test]
    fn test_batch_verification_keeps_order() {
        let block = create_test_block();
        let node = create_test_node_with_block(&block);
        let requests: Vec<_> = [(0usize, 0u64), (2, 2), (1, 2)]
            .into_iter()
            .map(|(tx, index)| ProofRequest {
                chain_id: BTC,
                block_hash: block.hash,
                proof: block.proof(tx),
                tx_index: index,
            })
            .collect();

        let results = node.query().verify_proofs(&requests);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &block.txs[0]);
        assert_eq!(results[1].as_ref().unwrap(), &block.txs[2]);
        assert!(results[2].is_err());
    }

    #[test]
    fn test_verification_disabled_fails_proofs() {
        let node = create_test_node(true);
        let block = create_test_block();
        run_ok(&node, header_votes(&block, 1..=3));

        let result = node
            .query()
            .prove(BTC, &block.hash, &block.proof(0), 0, &block.txids[0]);
        assert!(result.is_err());
    }

    // =========================================================================
    // PROVED TRACKERS
    // =========================================================================

    #[test]
    fn test_stranger_reports_tracker_with_proof() {
        let block = create_test_block();
        let node = create_test_node_with_block(&block);
        let responses = run_ok(&node, inbound_votes(&create_test_inbound(0, BTC), 1..=3));
        let xmsg = xmsg_vote(&responses[2]).xmsg.clone().unwrap();
        assert_eq!(xmsg.status(), XmsgStatus::PendingOutbound);
        assert_eq!(xmsg.current_outbound().unwrap().nonce, Some(0));

        let unproved = BridgeMsg::AddToOutTxTracker {
            signer: STRANGER,
            chain_id: BTC,
            nonce: 0,
            tx_hash: block.txids[1],
            proof: None,
        };
        let result = run(&node, vec![unproved]);
        assert_eq!(result.results[0].as_ref().unwrap_err().kind(), ErrorKind::Rejected);

        let wrong = BridgeMsg::AddToOutTxTracker {
            signer: STRANGER,
            chain_id: BTC,
            nonce: 0,
            tx_hash: block.txids[2],
            proof: Some(TrackerProof {
                block_hash: block.hash,
                proof: block.proof(1),
                tx_index: 1,
            }),
        };
        assert!(run(&node, vec![wrong]).results[0].is_err());
        assert!(node.query().get_tracker(BTC, 0).unwrap().is_none());

        let proved = BridgeMsg::AddToOutTxTracker {
            signer: STRANGER,
            chain_id: BTC,
            nonce: 0,
            tx_hash: block.txids[1],
            proof: Some(TrackerProof {
                block_hash: block.hash,
                proof: block.proof(1),
                tx_index: 1,
            }),
        };
        let responses = run_ok(&node, vec![proved]);
        assert_eq!(
            responses[0],
            MsgResponse::Tracker(TrackerOutcome::Updated(TrackerUpdate::Created))
        );

        let tracker = node.query().get_tracker(BTC, 0).unwrap().unwrap();
        assert_eq!(tracker.hash_list.len(), 1);
        assert_eq!(tracker.hash_list[0].tx_hash, block.txids[1]);
        assert_eq!(tracker.hash_list[0].signer, STRANGER);
        assert!(tracker.hash_list[0].proved);
    }

    #[test]
    fn test_inner_node_tracker_rejected() {
        let block = create_test_block();
        let node = create_test_node_with_block(&block);
        run_ok(&node, inbound_votes(&create_test_inbound(0, BTC), 1..=3));

        let mut inner = block.txids[0].to_vec();
        inner.extend_from_slice(&block.txids[1]);
        let mut sibling = block.txids[2].to_vec();
        sibling.extend_from_slice(&block.txids[3]);
        let forged = Proof::Bitcoin {
            tx_bytes: inner.clone(),
            path: vec![double_sha256(&sibling)],
        };

        assert!(!node
            .query()
            .prove(BTC, &block.hash, &forged, 0, &double_sha256(&inner))
            .unwrap());

        let msg = BridgeMsg::AddToOutTxTracker {
            signer: STRANGER,
            chain_id: BTC,
            nonce: 0,
            tx_hash: double_sha256(&inner),
            proof: Some(TrackerProof {
                block_hash: block.hash,
                proof: forged,
                tx_index: 0,
            }),
        };
        assert!(run(&node, vec![msg]).results[0].is_err());
        assert!(node.query().get_tracker(BTC, 0).unwrap().is_none());
    }
}
