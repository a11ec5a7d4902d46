use crate::error::ElectionError;
use crate::race::{Race, RaceId};
use crate::server::ServerArray;
use crate::vote::{CastVoteRecord, VoteRecordId};
use rand_core::{CryptoRng, RngCore};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sv_crypto::{Commitment, Open, Randomness};

/// The three commitments posted for one cast vote: one per share and one
/// to their mod-m sum. The sum commitment lets a challenge confirm
/// consistency without revealing the shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCommitments {
    pub vote_record_id: VoteRecordId,
    pub share_u: Commitment,
    pub share_v: Commitment,
    pub sum: Commitment,
}

/// All three openings of a vote's commitments. Revealing this exposes the
/// vote value, so it leaves the prover only on challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullOpening {
    pub share_u: Open,
    pub share_v: Open,
    pub sum: Open,
}

/// Commits to every cast vote of a race after the tally is posted, and
/// answers challenges with either a full or a sum-only opening. Which of
/// the two will be asked is not known at commitment time.
pub struct RaceProver {
    race_id: RaceId,
    commitments: BTreeMap<VoteRecordId, VoteCommitments>,
    openings: BTreeMap<VoteRecordId, FullOpening>,
}

impl RaceProver {
    /// Read each vote's shares back from the array (the prover's one
    /// transient look at raw shares) and commit to them. Randomness is
    /// drawn sequentially from the injected source; the digest work is
    /// independent per vote and runs in parallel.
    pub fn commit_race<R: RngCore + CryptoRng>(
        rng: &mut R,
        race: &Race,
        records: &[CastVoteRecord],
        servers: &ServerArray,
    ) -> Result<Self, ElectionError> {
        let modulus = race.modulus();
        let mut prepared = Vec::with_capacity(records.len());
        for record in records {
            let (u, v) = servers.shares_of(&record.vote_record_id)?;
            let blinds = (
                Randomness::random(rng),
                Randomness::random(rng),
                Randomness::random(rng),
            );
            prepared.push((record.vote_record_id.clone(), u, v, blinds));
        }

        let built: Vec<(VoteCommitments, FullOpening)> = prepared
            .into_par_iter()
            .map(|(id, u, v, (ru, rv, rs))| {
                let sum = modulus.add(u, v);
                let commitments = VoteCommitments {
                    vote_record_id: id,
                    share_u: Commitment::commit(u, &ru),
                    share_v: Commitment::commit(v, &rv),
                    sum: Commitment::commit(sum, &rs),
                };
                let opening = FullOpening {
                    share_u: Open {
                        value: u,
                        randomness: ru,
                    },
                    share_v: Open {
                        value: v,
                        randomness: rv,
                    },
                    sum: Open {
                        value: sum,
                        randomness: rs,
                    },
                };
                (commitments, opening)
            })
            .collect();

        let mut commitments = BTreeMap::new();
        let mut openings = BTreeMap::new();
        for (c, o) in built {
            let id = c.vote_record_id.clone();
            commitments.insert(id.clone(), c);
            openings.insert(id, o);
        }
        log::debug!(
            "race {}: committed to {} cast votes",
            race.id(),
            commitments.len()
        );
        Ok(RaceProver {
            race_id: race.id().clone(),
            commitments,
            openings,
        })
    }

    pub fn race_id(&self) -> &RaceId {
        &self.race_id
    }

    pub fn n_votes(&self) -> usize {
        self.commitments.len()
    }

    pub fn commitments(&self) -> impl Iterator<Item = &VoteCommitments> {
        self.commitments.values()
    }

    pub fn commitments_for(
        &self,
        vote_record_id: &VoteRecordId,
    ) -> Result<&VoteCommitments, ElectionError> {
        self.commitments
            .get(vote_record_id)
            .ok_or_else(|| ElectionError::UnknownVoteRecord(vote_record_id.clone()))
    }

    /// Full opening: all three commitments, revealing the vote. Used for
    /// spot audits.
    pub fn open_full(&self, vote_record_id: &VoteRecordId) -> Result<&FullOpening, ElectionError> {
        self.openings
            .get(vote_record_id)
            .ok_or_else(|| ElectionError::UnknownVoteRecord(vote_record_id.clone()))
    }

    /// Sum-only opening: confirms the committed sum without revealing
    /// either share.
    pub fn open_sum(&self, vote_record_id: &VoteRecordId) -> Result<Open, ElectionError> {
        self.open_full(vote_record_id).map(|o| o.sum)
    }
}
