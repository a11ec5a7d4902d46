use crate::race::RaceId;
use crate::server::ServerId;
use crate::vote::VoteRecordId;
use sv_crypto::CryptoError;
use sv_sbb::SbbError;
use thiserror::Error;

/// Errors of the election core. All are deterministic for a given input,
/// so nothing here is ever retried automatically.
#[derive(Debug, Error)]
pub enum ElectionError {
    /// A vote value or share outside the race's field. Caller error,
    /// rejected at the boundary before any state changes.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Sbb(#[from] SbbError),

    #[error("race {0} is not part of the ballot style")]
    UnknownRace(RaceId),

    #[error("invalid race {race_id}: {reason}")]
    InvalidRace { race_id: RaceId, reason: String },

    #[error("candidate {label:?} is not a choice in race {race_id}")]
    UnknownCandidate { race_id: RaceId, label: String },

    #[error("invalid write-in for race {race_id}: {reason}")]
    InvalidWriteIn { race_id: RaceId, reason: String },

    /// Reference to a vote record that was never cast. Caller error.
    #[error("no vote record {0}")]
    UnknownVoteRecord(VoteRecordId),

    /// A cast vote lacks one of its posted shares. Fatal to the affected
    /// race's tally; never silently excluded.
    #[error("share of vote record {vote_record_id} was never posted by server {server_id}")]
    MissingShare {
        vote_record_id: VoteRecordId,
        server_id: ServerId,
    },

    /// Two writers tried to store a share under one
    /// `(vote_record_id, server_id)` key.
    #[error("duplicate share for vote record {vote_record_id} from server {server_id}")]
    DuplicateShare {
        vote_record_id: VoteRecordId,
        server_id: ServerId,
    },

    #[error("challenge size {requested} invalid for {available} cast votes")]
    InvalidChallengeSize { requested: usize, available: usize },

    /// A pipeline stage was driven before the stage it reads from had
    /// posted its data.
    #[error("stage out of order: {0}")]
    StageOrder(String),

    #[error("server array needs at least 2 servers, got {0}")]
    TooFewServers(usize),
}
