use crate::error::ElectionError;
use crate::prover::{FullOpening, RaceProver, VoteCommitments};
use crate::race::Race;
use crate::race::RaceId;
use crate::tally::RaceTally;
use crate::vote::{CastVoteRecord, VoteRecordId};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sv_crypto::Validity;

/// Outcome of a verification session. `Reject` is the expected signal of
/// detected fraud (or a bug), distinct from an [`ElectionError`], which
/// means the session itself could not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// A challenged opening disagreed with its commitment, the share-sum
    /// relation, or the tallied value.
    InconsistentOpening {
        vote_record_id: VoteRecordId,
        detail: String,
    },
}

/// One challenged record of the transcript: the posted commitments, the
/// demanded opening and whether every check passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengedRecord {
    pub vote_record_id: VoteRecordId,
    pub commitments: VoteCommitments,
    pub opening: FullOpening,
    pub passed: bool,
}

/// The public, replayable proof: challenge set, openings, per-record
/// results and the verdict, posted to the board in this order. A third
/// party can recompute every check from this transcript and the earlier
/// board entries alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofTranscript {
    pub race_id: RaceId,
    pub challenge_size: usize,
    pub challenged: Vec<ChallengedRecord>,
    pub verdict: Verdict,
}

/// Run one challenge session against a race's posted commitments.
///
/// Draws `challenge_size` record ids uniformly without replacement,
/// demands the full opening of each and checks, per record:
///
/// 1. every opening recomputes its posted commitment digest,
/// 2. the opened shares sum to the opened vote value mod m,
/// 3. the opened vote value is what the tally counted for the record.
///
/// The first mismatch ends the session with `Reject`. Sessions are
/// stateless; re-running with a fresh random source is always safe.
pub fn verify_race<R: RngCore + CryptoRng>(
    rng: &mut R,
    race: &Race,
    records: &[CastVoteRecord],
    prover: &RaceProver,
    tally: &RaceTally,
    challenge_size: usize,
) -> Result<ProofTranscript, ElectionError> {
    if challenge_size == 0 || challenge_size > records.len() {
        return Err(ElectionError::InvalidChallengeSize {
            requested: challenge_size,
            available: records.len(),
        });
    }

    let mut challenge: Vec<&VoteRecordId> = rand::seq::index::sample(rng, records.len(), challenge_size)
        .iter()
        .map(|i| &records[i].vote_record_id)
        .collect();
    // deterministic transcript order; the draw itself stays uniform
    challenge.sort();

    let modulus = race.modulus();
    let mut challenged = Vec::with_capacity(challenge_size);
    let mut verdict = Verdict::Accept;

    for vote_record_id in challenge {
        let commitments = prover.commitments_for(vote_record_id)?;
        let opening = prover.open_full(vote_record_id)?;
        let counted = tally.counted_value(vote_record_id)?;

        let failure = check_opening(counted, modulus, commitments, opening);
        let passed = failure.is_none();
        challenged.push(ChallengedRecord {
            vote_record_id: vote_record_id.clone(),
            commitments: commitments.clone(),
            opening: opening.clone(),
            passed,
        });
        if let Some(detail) = failure {
            verdict = Verdict::Reject(RejectReason::InconsistentOpening {
                vote_record_id: vote_record_id.clone(),
                detail,
            });
            break;
        }
    }

    Ok(ProofTranscript {
        race_id: race.id().clone(),
        challenge_size,
        challenged,
        verdict,
    })
}

fn check_opening(
    counted_value: u64,
    modulus: sv_crypto::Modulus,
    commitments: &VoteCommitments,
    opening: &FullOpening,
) -> Option<String> {
    if commitments.share_u.verify(&opening.share_u) == Validity::Invalid {
        return Some("first share opening does not match its commitment".to_string());
    }
    if commitments.share_v.verify(&opening.share_v) == Validity::Invalid {
        return Some("second share opening does not match its commitment".to_string());
    }
    if commitments.sum.verify(&opening.sum) == Validity::Invalid {
        return Some("sum opening does not match its commitment".to_string());
    }
    let recombined = modulus.add(opening.share_u.value, opening.share_v.value);
    if recombined != opening.sum.value {
        return Some(format!(
            "opened shares combine to {} but the committed sum is {}",
            recombined, opening.sum.value
        ));
    }
    if opening.sum.value != counted_value {
        return Some(format!(
            "opened vote value {} but the tally counted {}",
            opening.sum.value, counted_value
        ));
    }
    None
}

/// Sum-only spot check of a single record: confirms the committed sum
/// equals the tallied value without revealing either share.
pub fn audit_sum(
    prover: &RaceProver,
    tally: &RaceTally,
    vote_record_id: &VoteRecordId,
) -> Result<Verdict, ElectionError> {
    let commitments = prover.commitments_for(vote_record_id)?;
    let opening = prover.open_sum(vote_record_id)?;
    let counted = tally.counted_value(vote_record_id)?;
    if commitments.sum.verify(&opening) == Validity::Invalid {
        return Ok(Verdict::Reject(RejectReason::InconsistentOpening {
            vote_record_id: vote_record_id.clone(),
            detail: "sum opening does not match its commitment".to_string(),
        }));
    }
    if opening.value != counted {
        return Ok(Verdict::Reject(RejectReason::InconsistentOpening {
            vote_record_id: vote_record_id.clone(),
            detail: format!(
                "opened vote value {} but the tally counted {}",
                opening.value, counted
            ),
        }));
    }
    Ok(Verdict::Accept)
}
