use crate::error::ElectionError;
use crate::race::{Race, RaceId};
use crate::server::{ServerArray, ServerId};
use crate::vote::{CastVoteRecord, VoteRecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sv_crypto::combine;

/// The public outcome of one race, derived from share sums only. Counts
/// are keyed by candidate label (write-ins under `writein:<text>`) and
/// ordered by identifier, so recomputation is bit-for-bit reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub race_id: RaceId,
    pub counts: BTreeMap<String, u64>,
    /// Per-row share sums mod m, posted alongside the counts.
    pub partial_sums: Vec<PartialSum>,
    /// The mod-m combination of all partial sums; equals the mod-m sum of
    /// every vote value of the race.
    pub combined_sum: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSum {
    pub server_id: ServerId,
    pub sum: u64,
}

/// A computed tally plus the per-record reconstructions it counted.
/// The reconstructions stay off the public board; the verifier reads
/// them back as "what the tally counted for this record".
#[derive(Debug, Clone)]
pub struct RaceTally {
    pub result: TallyResult,
    pub(crate) reconstructed: BTreeMap<VoteRecordId, u64>,
}

impl RaceTally {
    /// Reconstruct every cast vote of the race from its two shares,
    /// decode the choice and count it. Deterministic for fixed shares;
    /// a missing share aborts the whole race.
    pub fn compute(
        race: &Race,
        records: &[CastVoteRecord],
        write_in_labels: &BTreeMap<u64, String>,
        servers: &ServerArray,
    ) -> Result<Self, ElectionError> {
        let modulus = race.modulus();
        let mut counts: BTreeMap<String, u64> = race
            .candidates()
            .iter()
            .map(|c| (c.clone(), 0))
            .collect();
        let mut reconstructed = BTreeMap::new();
        let mut value_sum = 0u64;

        for record in records {
            let (u, v) = servers.shares_of(&record.vote_record_id)?;
            let value = combine(u, v, modulus)?;
            let choice = race.decode(value, write_in_labels)?;
            *counts.entry(choice.count_label()).or_insert(0) += 1;
            value_sum = modulus.add(value_sum, value);
            reconstructed.insert(record.vote_record_id.clone(), value);
        }

        let partial_sums: Vec<PartialSum> = servers
            .partial_sums(race.id(), modulus)
            .into_iter()
            .map(|(server_id, sum)| PartialSum { server_id, sum })
            .collect();
        let combined_sum = partial_sums
            .iter()
            .fold(0, |acc, p| modulus.add(acc, p.sum));
        debug_assert_eq!(combined_sum, value_sum);

        Ok(RaceTally {
            result: TallyResult {
                race_id: race.id().clone(),
                counts,
                partial_sums,
                combined_sum,
            },
            reconstructed,
        })
    }

    /// The value the tally counted for a record.
    pub fn counted_value(&self, vote_record_id: &VoteRecordId) -> Result<u64, ElectionError> {
        self.reconstructed
            .get(vote_record_id)
            .copied()
            .ok_or_else(|| ElectionError::UnknownVoteRecord(vote_record_id.clone()))
    }

    pub fn n_votes(&self) -> usize {
        self.reconstructed.len()
    }
}
