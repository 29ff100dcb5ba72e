//! # Transaction Executor
//!
//! Delivers one message at a time. Each delivery runs in its own store
//! overlay and behind a panic boundary; the overlay reaches the parent store
//! only when the handler returns `Ok`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use bridge_telemetry::log_event;
use shared_types::{to_hex, with_overlay, Address, BlockContext, KeyValueStore};

use crate::app::errors::{BridgeError, ErrorKind};
use crate::app::messages::{BridgeMsg, MsgResponse};
use crate::container::{BridgeConfig, BridgeServices};
use crate::genesis::Genesis;

/// Message dispatcher over the subsystem services.
pub struct BridgeApp {
    services: BridgeServices,
}

impl BridgeApp {
    /// Wire the subsystems from `config`.
    pub fn new(config: &BridgeConfig) -> Self {
        Self::from_services(BridgeServices::new(config))
    }

    /// Use already wired services.
    pub fn from_services(services: BridgeServices) -> Self {
        Self { services }
    }

    /// Subsystem services.
    pub fn services(&self) -> &BridgeServices {
        &self.services
    }

    /// Import genesis state.
    pub fn init_genesis(
        &self,
        store: &mut dyn KeyValueStore,
        genesis: &Genesis,
    ) -> Result<(), BridgeError> {
        genesis.apply(&self.services, store)
    }

    /// Execute one message atomically.
    ///
    /// On `Err` nothing the handler wrote is visible in `store`. A panic
    /// inside a handler is reported as [`BridgeError::Panicked`].
    pub fn deliver(
        &self,
        store: &mut dyn KeyValueStore,
        msg: &BridgeMsg,
        ctx: &BlockContext,
    ) -> Result<MsgResponse, BridgeError> {
        let result = with_overlay(store, |tx| {
            match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(tx, msg, ctx))) {
                Ok(result) => result,
                Err(payload) => Err(BridgeError::Panicked(panic_message(payload.as_ref()))),
            }
        });

        match &result {
            Ok(_) => log_event!(
                debug,
                "runtime",
                "Delivered message",
                msg_type = msg.name(),
                signer = %to_hex(msg.signer()),
                height = ctx.height
            ),
            Err(e) if e.kind() == ErrorKind::Rejected => log_event!(
                warn,
                "runtime",
                "Rejected message",
                msg_type = msg.name(),
                signer = %to_hex(msg.signer()),
                error = %e
            ),
            Err(e) => log_event!(
                error,
                "runtime",
                "Message failed",
                msg_type = msg.name(),
                kind = e.kind().as_str(),
                error = %e
            ),
        }
        result
    }

    /// Host hook: tombstone a slashed observer until the next keygen.
    pub fn tombstone_observer(
        &self,
        store: &mut dyn KeyValueStore,
        operator: &Address,
    ) -> Result<(), BridgeError> {
        with_overlay(store, |tx| {
            self.services.registry.tombstone_observer(tx, operator)?;
            Ok(())
        })
    }

    fn dispatch(
        &self,
        store: &mut dyn KeyValueStore,
        msg: &BridgeMsg,
        ctx: &BlockContext,
    ) -> Result<MsgResponse, BridgeError> {
        let s = &self.services;
        let response = match msg {
            BridgeMsg::AddObserver {
                signer,
                operator,
                grantee,
            } => MsgResponse::Observer(s.registry.add_observer(store, signer, *operator, *grantee)?),
            BridgeMsg::RemoveObserver { signer, operator } => {
                MsgResponse::Observer(s.registry.remove_observer(store, signer, operator)?)
            }
            BridgeMsg::UpdateObserverGrantee {
                signer,
                operator,
                grantee,
            } => MsgResponse::Observer(
                s.registry
                    .update_observer_grantee(store, signer, operator, *grantee)?,
            ),
            BridgeMsg::SetTss { signer, tss } => {
                s.registry.set_tss(store, signer, tss.clone())?;
                let scheduled = s.xmsg.drain_all_awaiting(store, ctx)?;
                MsgResponse::Applied { scheduled }
            }
            BridgeMsg::UpsertChainParams { signer, params } => {
                s.registry.upsert_chain_params(store, signer, params.clone())?;
                let scheduled = if params.is_supported {
                    s.xmsg.drain_awaiting(store, params.chain_id, ctx)?
                } else {
                    0
                };
                MsgResponse::Applied { scheduled }
            }
            BridgeMsg::UpdateCrosschainFlags { signer, flags } => {
                let previous = s.registry.update_crosschain_flags(store, signer, *flags)?;
                let scheduled = if flags.is_outbound_enabled && !previous.is_outbound_enabled {
                    s.xmsg.drain_all_awaiting(store, ctx)?
                } else {
                    0
                };
                MsgResponse::CrosschainFlags {
                    previous,
                    scheduled,
                }
            }
            BridgeMsg::UpdateVerificationFlags { signer, flags } => MsgResponse::VerificationFlags(
                s.light_client.update_verification_flags(store, signer, *flags)?,
            ),
            BridgeMsg::VoteBlockHeader {
                signer,
                chain_id,
                block_hash,
                height,
                header,
            } => MsgResponse::HeaderVote(s.light_client.vote_block_header(
                store,
                signer,
                *chain_id,
                *block_hash,
                *height,
                header.clone(),
                ctx,
            )?),
            BridgeMsg::VoteInbound(vote) => MsgResponse::XmsgVote(s.xmsg.vote_inbound(store, vote, ctx)?),
            BridgeMsg::VoteOutbound(vote) => {
                MsgResponse::XmsgVote(s.xmsg.vote_outbound(store, vote, ctx)?)
            }
            BridgeMsg::AddToOutTxTracker {
                signer,
                chain_id,
                nonce,
                tx_hash,
                proof,
            } => MsgResponse::Tracker(s.xmsg.add_to_out_tx_tracker(
                store,
                signer,
                *chain_id,
                *nonce,
                *tx_hash,
                proof.as_ref(),
            )?),
            BridgeMsg::AddToInTxTracker {
                signer,
                chain_id,
                tx_hash,
                proof,
            } => MsgResponse::InTxTracker(s.xmsg.add_to_in_tx_tracker(
                store,
                signer,
                *chain_id,
                *tx_hash,
                proof.as_ref(),
            )?),
            BridgeMsg::UpdateRateLimiterFlags { signer, flags } => MsgResponse::RateLimiterFlags(
                s.xmsg.update_rate_limiter_flags(store, signer, flags.clone())?,
            ),
            BridgeMsg::AbortStuckXmsg { signer, index } => {
                MsgResponse::Aborted(s.xmsg.abort_stuck_xmsg(store, signer, index, ctx)?)
            }
            BridgeMsg::ResetChainNonces {
                signer,
                chain_id,
                low,
                high,
            } => {
                let window = s.nonces.reset_chain_nonces(store, signer, *chain_id, *low, *high)?;
                let scheduled = s.xmsg.drain_awaiting(store, *chain_id, ctx)?;
                MsgResponse::NonceWindow { window, scheduled }
            }
        };
        Ok(response)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
