//! Simulated split-value verifiable election: votes are additively
//! secret-shared over a server array, tallied from share sums, and
//! publicly audited through hash commitments and random challenges, with
//! every stage mediated by the bulletin board in `sv-sbb`.

mod election;
mod error;
mod prover;
mod race;
mod server;
pub mod soundness;
mod tally;
mod verifier;
mod vote;

pub use crate::{
    election::{
        Election, StageReport, TAG_CASTING_RECEIPTS, TAG_CASTING_VOTES, TAG_PROOF_COMMITMENTS,
        TAG_PROOF_TRANSCRIPT, TAG_SETUP_FINISHED, TAG_SETUP_RACES, TAG_TALLY_RESULT,
    },
    error::ElectionError,
    prover::{FullOpening, RaceProver, VoteCommitments},
    race::{BallotStyle, Choice, Race, RaceId, WriteInRule},
    server::{ServerArray, ServerId},
    tally::{PartialSum, RaceTally, TallyResult},
    verifier::{audit_sum, verify_race, ChallengedRecord, ProofTranscript, RejectReason, Verdict},
    vote::{CastVote, CastVoteRecord, VoteRecordId, VoterId},
};
