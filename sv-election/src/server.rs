use crate::error::ElectionError;
use crate::race::RaceId;
use crate::vote::VoteRecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use sv_crypto::Modulus;

/// One simulated server row of the array.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(usize);

impl ServerId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server:{}", self.0)
    }
}

/// The array of share-holding servers. Every cast vote is assigned two
/// distinct rows, one per share; a row's store alone reveals nothing
/// about any vote value (each share is uniform on its own).
///
/// Only the tally engine, and the prover transiently for openings, read
/// raw share values back out of the array.
#[derive(Debug, Clone)]
pub struct ServerArray {
    n_servers: usize,
    assignments: BTreeMap<VoteRecordId, Assignment>,
    shares: BTreeMap<(VoteRecordId, ServerId), u64>,
}

#[derive(Debug, Clone)]
struct Assignment {
    race_id: RaceId,
    first: ServerId,
    second: ServerId,
}

impl ServerArray {
    pub fn new(n_servers: usize) -> Result<Self, ElectionError> {
        if n_servers < 2 {
            return Err(ElectionError::TooFewServers(n_servers));
        }
        Ok(ServerArray {
            n_servers,
            assignments: BTreeMap::new(),
            shares: BTreeMap::new(),
        })
    }

    pub fn n_servers(&self) -> usize {
        self.n_servers
    }

    /// Assign the two share-holder rows for a new cast vote. Rows rotate
    /// with the cast position so the load spreads over the array.
    pub fn assign(
        &mut self,
        vote_record_id: VoteRecordId,
        race_id: RaceId,
        position: usize,
    ) -> (ServerId, ServerId) {
        let first = ServerId(position % self.n_servers);
        let second = ServerId((position + 1) % self.n_servers);
        self.assignments.insert(
            vote_record_id,
            Assignment {
                race_id,
                first,
                second,
            },
        );
        (first, second)
    }

    pub fn holders(&self, vote_record_id: &VoteRecordId) -> Result<(ServerId, ServerId), ElectionError> {
        let a = self
            .assignments
            .get(vote_record_id)
            .ok_or_else(|| ElectionError::UnknownVoteRecord(vote_record_id.clone()))?;
        Ok((a.first, a.second))
    }

    /// Store a share under its `(vote_record_id, server_id)` key. The key
    /// has exactly one writer; a second write is rejected.
    pub fn receive_share(
        &mut self,
        vote_record_id: VoteRecordId,
        server_id: ServerId,
        value: u64,
    ) -> Result<(), ElectionError> {
        let assignment = self
            .assignments
            .get(&vote_record_id)
            .ok_or_else(|| ElectionError::UnknownVoteRecord(vote_record_id.clone()))?;
        if server_id != assignment.first && server_id != assignment.second {
            return Err(ElectionError::UnknownVoteRecord(vote_record_id));
        }
        let key = (vote_record_id, server_id);
        if self.shares.contains_key(&key) {
            return Err(ElectionError::DuplicateShare {
                vote_record_id: key.0,
                server_id,
            });
        }
        self.shares.insert(key, value);
        Ok(())
    }

    fn share(&self, vote_record_id: &VoteRecordId, server_id: ServerId) -> Result<u64, ElectionError> {
        self.shares
            .get(&(vote_record_id.clone(), server_id))
            .copied()
            .ok_or_else(|| ElectionError::MissingShare {
                vote_record_id: vote_record_id.clone(),
                server_id,
            })
    }

    /// Both raw shares of a record, first-holder share first. Surfaces
    /// [`ElectionError::MissingShare`] if either half was never posted.
    pub fn shares_of(&self, vote_record_id: &VoteRecordId) -> Result<(u64, u64), ElectionError> {
        let (first, second) = self.holders(vote_record_id)?;
        Ok((
            self.share(vote_record_id, first)?,
            self.share(vote_record_id, second)?,
        ))
    }

    /// Per-server sums mod `m` of all shares held for a race. The mod-m
    /// total over all rows equals the sum of every vote value of the
    /// race, which the tally posts as a cross-check.
    pub fn partial_sums(&self, race_id: &RaceId, modulus: Modulus) -> BTreeMap<ServerId, u64> {
        let mut sums: BTreeMap<ServerId, u64> = BTreeMap::new();
        for ((record, server), value) in &self.shares {
            let assignment = &self.assignments[record];
            if &assignment.race_id == race_id {
                let entry = sums.entry(*server).or_insert(0);
                *entry = modulus.add(*entry, *value);
            }
        }
        sums
    }

    /// Simulation-only adversarial hook: overwrite one stored share so a
    /// later audit can demonstrate detection. Not part of the protocol.
    pub fn tamper_share(
        &mut self,
        vote_record_id: &VoteRecordId,
        server_id: ServerId,
        value: u64,
    ) -> Result<(), ElectionError> {
        let key = (vote_record_id.clone(), server_id);
        if !self.shares.contains_key(&key) {
            return Err(ElectionError::MissingShare {
                vote_record_id: vote_record_id.clone(),
                server_id,
            });
        }
        self.shares.insert(key, value);
        Ok(())
    }
}
