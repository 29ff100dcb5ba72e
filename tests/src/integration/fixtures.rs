//! Shared fixtures for the integration flows.
//!
//! Four observers (operators `[1; 20]..[4; 20]`, grantees `[11; 20]..[14; 20]`)
//! watch an EVM chain, BSC testnet and Bitcoin regtest. Votes are submitted
//! with grantee keys, the way observer clients run in production.

use bridge_runtime::{BlockResult, BridgeConfig, BridgeError, BridgeMsg, BridgeNode, Genesis, MsgResponse};
use cb_01_observer_registry::{ChainParams, Observer, RegistryGenesis, TssRecord};
use cb_02_ballot_engine::VoteType;
use cb_05_xmsg::{InboundVote, OutboundVote, ReceiveStatus, Xmsg, XmsgVoteOutcome};
use shared_types::{Address, ChainId, PolicyGrant, PolicyTier, U256};

pub const EVM: ChainId = 1;
pub const BSC: ChainId = 97;
pub const BTC: ChainId = 18444;
pub const HOME: ChainId = 7000;

pub const ADMIN: Address = [0xad; 20];
pub const EMERGENCY: Address = [0xe1; 20];
pub const OPERATIONAL: Address = [0x0a; 20];
pub const STRANGER: Address = [0x55; 20];

/// Block timestamp used by every flow.
pub const NOW: u64 = 1_700_000_000;

pub fn operator(i: u8) -> Address {
    [i; 20]
}

pub fn grantee(i: u8) -> Address {
    [10 + i; 20]
}

pub fn create_test_config() -> BridgeConfig {
    let mut config = BridgeConfig::for_testing();
    config.policy = vec![
        PolicyGrant {
            address: ADMIN,
            tier: PolicyTier::Admin,
        },
        PolicyGrant {
            address: EMERGENCY,
            tier: PolicyTier::Emergency,
        },
        PolicyGrant {
            address: OPERATIONAL,
            tier: PolicyTier::Operational,
        },
    ];
    config
}

pub fn create_test_tss(pubkey: &str) -> TssRecord {
    TssRecord {
        pubkey: pubkey.into(),
        participant_pubkeys: vec!["p1".into(), "p2".into(), "p3".into()],
        operators: (1..=4u8).map(operator).collect(),
        keygen_height: 1,
        finalized_height: 1,
    }
}

pub fn create_test_genesis(with_tss: bool) -> Genesis {
    Genesis {
        registry: RegistryGenesis {
            observers: (1..=4u8).map(|i| Observer::new(operator(i), grantee(i))).collect(),
            tss: with_tss.then(|| create_test_tss("tss-genesis")),
            chain_params: vec![
                ChainParams::supported(EVM),
                ChainParams::supported(BSC),
                ChainParams::supported(BTC),
            ],
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn create_test_node(with_tss: bool) -> BridgeNode {
    BridgeNode::new(&create_test_config(), &create_test_genesis(with_tss)).unwrap()
}

/// Execute one block and return its result.
pub fn run(node: &BridgeNode, msgs: Vec<BridgeMsg>) -> BlockResult {
    node.execute_block(&msgs, NOW)
}

/// Execute one block and fail the test if any message was rejected.
pub fn run_ok(node: &BridgeNode, msgs: Vec<BridgeMsg>) -> Vec<MsgResponse> {
    run(node, msgs)
        .results
        .into_iter()
        .collect::<Result<Vec<_>, BridgeError>>()
        .unwrap()
}

pub fn create_test_inbound(event_index: u64, receiver_chain_id: ChainId) -> InboundVote {
    InboundVote {
        signer: grantee(1),
        sender_chain_id: EVM,
        sender: vec![0xaa; 20],
        receiver_chain_id,
        receiver: vec![0xbb; 20],
        in_tx_hash: [0x99; 32],
        in_block_height: 500,
        event_index,
        amount: U256::from(1_000u64),
        message: b"call".to_vec(),
        allow_revert: true,
        vote: VoteType::Success,
    }
}

/// The same inbound vote from observers `voters`.
pub fn inbound_votes(vote: &InboundVote, voters: impl IntoIterator<Item = u8>) -> Vec<BridgeMsg> {
    voters
        .into_iter()
        .map(|i| {
            BridgeMsg::VoteInbound(InboundVote {
                signer: grantee(i),
                ..vote.clone()
            })
        })
        .collect()
}

pub fn create_test_outbound(xmsg: &Xmsg, status: ReceiveStatus, voter: u8) -> OutboundVote {
    let leg = xmsg.current_outbound().unwrap();
    let nonce = leg.nonce.unwrap();
    OutboundVote {
        signer: grantee(voter),
        xmsg_index: xmsg.index,
        receiver_chain_id: leg.receiver_chain_id,
        nonce,
        observed_tx_hash: [0x40 + nonce as u8; 32],
        observed_block_height: 900,
        status,
    }
}

/// The current outbound leg of `xmsg` voted by observers `voters`.
pub fn outbound_votes(
    xmsg: &Xmsg,
    status: ReceiveStatus,
    voters: impl IntoIterator<Item = u8>,
) -> Vec<BridgeMsg> {
    voters
        .into_iter()
        .map(|i| BridgeMsg::VoteOutbound(create_test_outbound(xmsg, status, i)))
        .collect()
}

/// Unwrap a vote response.
pub fn xmsg_vote(response: &MsgResponse) -> &XmsgVoteOutcome {
    match response {
        MsgResponse::XmsgVote(outcome) => outcome,
        other => panic!("expected an xmsg vote, got {other:?}"),
    }
}
