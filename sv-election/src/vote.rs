use crate::error::ElectionError;
use crate::race::{Choice, Race, RaceId};
use crate::server::ServerId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(String);

impl VoterId {
    pub fn new(id: impl Into<String>) -> Self {
        VoterId(id.into())
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VoterId {
    fn from(s: &str) -> Self {
        VoterId(s.to_string())
    }
}

/// Identifier of one cast-vote record, unique per (voter, race) cast.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteRecordId(String);

impl VoteRecordId {
    /// Position-style id within a race: `<race>/p0000`, `<race>/p0001`, ...
    /// Fixed width keeps the ids in cast order under lexicographic sort.
    pub(crate) fn at_position(race_id: &RaceId, position: usize) -> Self {
        VoteRecordId(format!("{}/p{:04}", race_id, position))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoteRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One vote as delivered by the external casting simulation: the encoded
/// value plus, for write-ins, the free-text label to record at cast time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastVote {
    pub voter_id: VoterId,
    pub race_id: RaceId,
    pub value: u64,
    pub write_in_label: Option<String>,
}

impl CastVote {
    /// A pre-encoded vote value. The core re-checks the range on posting
    /// and rejects out-of-field values, it never clamps them.
    pub fn new(voter_id: VoterId, race_id: RaceId, value: u64) -> Self {
        CastVote {
            voter_id,
            race_id,
            value,
            write_in_label: None,
        }
    }

    /// Encode a tagged choice against its race.
    pub fn for_choice(
        race: &Race,
        voter_id: VoterId,
        choice: &Choice,
    ) -> Result<Self, ElectionError> {
        let value = race.encode(choice)?;
        let write_in_label = match choice {
            Choice::WriteIn(text) => Some(text.clone()),
            Choice::Candidate(_) => None,
        };
        Ok(CastVote {
            voter_id,
            race_id: race.id().clone(),
            value,
            write_in_label,
        })
    }
}

/// The public record of a cast vote: who holds which share. The raw value
/// lives only as shares inside the server array from here on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteRecord {
    pub vote_record_id: VoteRecordId,
    pub voter_id: VoterId,
    pub race_id: RaceId,
    pub first_holder: ServerId,
    pub second_holder: ServerId,
}
