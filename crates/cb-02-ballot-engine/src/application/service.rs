//! # Ballot Engine Service
//!
//! Creates ballots, records votes and finalizes them.
//!
//! ## Vote acceptance
//!
//! | Voter's slot | Ballot | Result |
//! |--------------|--------|--------|
//! | empty | in progress | recorded, tally re-evaluated |
//! | empty | finalized | recorded if `accept_late_votes`, status unchanged |
//! | voted | in progress | overwritten if `allow_vote_overwrite`, else `DuplicateVote` |
//! | voted | finalized | `BallotAlreadyFinalized` if overwrite is enabled, else `DuplicateVote` |
//!
//! Eligibility is judged against the ballot's own voter list plus the
//! voter's current tombstone status. Later observer-set changes never touch
//! an existing ballot.

use std::sync::Arc;

use shared_types::{
    get_record, put_record, scan_records, to_hex, Address, BlockContext, KeyValueStore,
    StoreKey,
};

use crate::algorithms::evaluate;
use crate::config::BallotConfig;
use crate::domain::{
    invariant_status_transition, invariant_votes_aligned, Ballot, BallotError, BallotId,
    NewBallot, Observation, VoteOutcome, VoteType,
};
use crate::metrics;
use crate::ports::ObserverDirectory;

const PREFIX_BALLOT: &str = "ballot";

fn ballot_key(id: &BallotId) -> Vec<u8> {
    StoreKey::new(PREFIX_BALLOT).push("id").bytes(id.as_bytes()).build()
}

fn height_index_key(height: u64, id: &BallotId) -> Vec<u8> {
    StoreKey::new(PREFIX_BALLOT)
        .push("height")
        .height(height)
        .bytes(id.as_bytes())
        .build()
}

fn height_index_prefix(height: u64) -> Vec<u8> {
    StoreKey::new(PREFIX_BALLOT).push("height").height(height).prefix()
}

/// Ballot Engine service.
pub struct BallotEngine {
    config: BallotConfig,
    directory: Arc<dyn ObserverDirectory>,
}

impl BallotEngine {
    /// Create a ballot engine.
    pub fn new(config: BallotConfig, directory: Arc<dyn ObserverDirectory>) -> Self {
        Self { config, directory }
    }

    /// Engine configuration.
    pub fn config(&self) -> &BallotConfig {
        &self.config
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Look up a ballot.
    pub fn get_ballot(
        &self,
        store: &dyn KeyValueStore,
        id: &BallotId,
    ) -> Result<Option<Ballot>, BallotError> {
        Ok(get_record(store, &ballot_key(id))?)
    }

    /// Look up a ballot or fail with `BallotNotFound`.
    pub fn require_ballot(
        &self,
        store: &dyn KeyValueStore,
        id: &BallotId,
    ) -> Result<Ballot, BallotError> {
        self.get_ballot(store, id)?
            .ok_or_else(|| BallotError::BallotNotFound(id.to_string()))
    }

    /// Identifiers of ballots created at `height`, in identifier order.
    pub fn ballots_created_at(
        &self,
        store: &dyn KeyValueStore,
        height: u64,
    ) -> Result<Vec<BallotId>, BallotError> {
        let prefix = height_index_prefix(height);
        let entries = store.prefix_scan(&prefix)?;
        Ok(entries
            .into_iter()
            .filter_map(|(key, _)| {
                let raw = hex::decode(&key[prefix.len()..]).ok()?;
                let bytes: [u8; 32] = raw.try_into().ok()?;
                Some(BallotId(bytes))
            })
            .collect())
    }

    /// Finalized ballots that mature at `current_height`.
    ///
    /// These are the ballots created exactly `maturity_blocks` earlier. Each
    /// height's list is reported once, when the chain passes it, so the
    /// emissions collaborator sees every matured ballot exactly once.
    pub fn matured_ballot_list(
        &self,
        store: &dyn KeyValueStore,
        current_height: u64,
    ) -> Result<Vec<BallotId>, BallotError> {
        let Some(created) = current_height.checked_sub(self.config.maturity_blocks) else {
            return Ok(Vec::new());
        };

        let mut matured = Vec::new();
        for id in self.ballots_created_at(store, created)? {
            if self.require_ballot(store, &id)?.is_finalized() {
                matured.push(id);
            }
        }
        Ok(matured)
    }

    /// Every stored ballot, in identifier order.
    pub fn all_ballots(&self, store: &dyn KeyValueStore) -> Result<Vec<Ballot>, BallotError> {
        let prefix = StoreKey::new(PREFIX_BALLOT).push("id").prefix();
        Ok(scan_records::<Ballot>(store, &prefix)?
            .into_iter()
            .map(|(_, ballot)| ballot)
            .collect())
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Return the ballot for `new.id`, creating it if it does not exist.
    ///
    /// The voter list and threshold are fixed at creation; for an existing
    /// ballot the ones in `new` are ignored. Returns `(ballot, created)`.
    pub fn get_or_create_ballot(
        &self,
        store: &mut dyn KeyValueStore,
        new: NewBallot,
        ctx: &BlockContext,
    ) -> Result<(Ballot, bool), BallotError> {
        if let Some(ballot) = self.get_ballot(store, &new.id)? {
            return Ok((ballot, false));
        }

        if new.voters.is_empty() {
            return Err(BallotError::EmptyVoterSet(new.id.to_string()));
        }
        new.threshold.validate()?;

        let ballot = Ballot::new(
            new.id,
            new.observation_type,
            new.chain_id,
            new.voters,
            new.threshold,
            ctx.height,
        );
        put_record(store, &ballot_key(&ballot.id), &ballot)?;
        store.put(&height_index_key(ctx.height, &ballot.id), &[])?;

        metrics::record_ballot_created(ballot.observation_type.as_str());
        tracing::info!(
            "[cb-02] Ballot created: id={} type={} chain={} voters={} threshold={}",
            ballot.id,
            ballot.observation_type.as_str(),
            ballot.chain_id,
            ballot.voter_list.len(),
            ballot.threshold
        );
        Ok((ballot, true))
    }

    /// Record a vote on an existing ballot.
    pub fn cast_vote(
        &self,
        store: &mut dyn KeyValueStore,
        id: &BallotId,
        voter: &Address,
        vote: VoteType,
        ctx: &BlockContext,
    ) -> Result<VoteOutcome, BallotError> {
        let ballot = self.require_ballot(store, id)?;
        self.record_vote(store, ballot, false, voter, vote, ctx)
    }

    /// Vote on an observation, creating its ballot on first sight.
    ///
    /// A new ballot snapshots the current observer set and the chain's
    /// threshold.
    pub fn vote_on_observation(
        &self,
        store: &mut dyn KeyValueStore,
        observation: &Observation,
        voter: &Address,
        vote: VoteType,
        ctx: &BlockContext,
    ) -> Result<VoteOutcome, BallotError> {
        let id = observation.ballot_id();
        let (ballot, created) = match self.get_ballot(store, &id)? {
            Some(ballot) => (ballot, false),
            None => {
                let new = NewBallot {
                    id,
                    observation_type: observation.observation_type,
                    chain_id: observation.chain_id,
                    voters: self.directory.voter_snapshot(store)?,
                    threshold: self.directory.ballot_threshold(store, observation.chain_id)?,
                };
                self.get_or_create_ballot(store, new, ctx)?
            }
        };
        self.record_vote(store, ballot, created, voter, vote, ctx)
    }

    fn record_vote(
        &self,
        store: &mut dyn KeyValueStore,
        mut ballot: Ballot,
        created: bool,
        voter: &Address,
        vote: VoteType,
        ctx: &BlockContext,
    ) -> Result<VoteOutcome, BallotError> {
        if vote == VoteType::NotVoted {
            return Err(BallotError::InvalidVote(format!(
                "{} is not a decision",
                vote.as_str()
            )));
        }
        invariant_votes_aligned(&ballot)?;

        let index = ballot
            .voter_index(voter)
            .ok_or_else(|| BallotError::NotAuthorizedVoter(to_hex(voter)))?;
        if self.directory.is_tombstoned(store, voter)? {
            return Err(BallotError::NotAuthorizedVoter(to_hex(voter)));
        }

        let previous = ballot.votes[index];
        let finalized = ballot.is_finalized();
        match (previous, finalized) {
            (VoteType::NotVoted, false) => {}
            (VoteType::NotVoted, true) if self.config.accept_late_votes => {}
            (VoteType::NotVoted, true) => {
                return Err(BallotError::BallotAlreadyFinalized(ballot.id.to_string()));
            }
            (_, false) if self.config.allow_vote_overwrite => {}
            (_, true) if self.config.allow_vote_overwrite => {
                return Err(BallotError::BallotAlreadyFinalized(ballot.id.to_string()));
            }
            _ => {
                return Err(BallotError::DuplicateVote {
                    ballot: ballot.id.to_string(),
                    voter: to_hex(voter),
                });
            }
        }

        ballot.votes[index] = vote;
        metrics::record_vote_cast(vote.as_str());

        let mut finalized_now = false;
        if !finalized {
            let tally = ballot.tally();
            if let Some(status) = evaluate(&tally, &ballot.threshold, self.config.failure_policy) {
                debug_assert!(invariant_status_transition(ballot.status, status));
                ballot.status = status;
                ballot.finalized_height = Some(ctx.height);
                finalized_now = true;

                metrics::record_ballot_finalized(status.as_str());
                tracing::info!(
                    "[cb-02] Ballot finalized: id={} status={} success={} failure={} voters={}",
                    ballot.id,
                    status.as_str(),
                    tally.success,
                    tally.failure,
                    tally.total()
                );
            }
        }

        put_record(store, &ballot_key(&ballot.id), &ballot)?;
        tracing::debug!(
            "[cb-02] Vote recorded: ballot={} voter={} vote={} late={}",
            ballot.id,
            to_hex(voter),
            vote.as_str(),
            finalized
        );

        Ok(VoteOutcome {
            ballot,
            created,
            finalized_now,
        })
    }
}
