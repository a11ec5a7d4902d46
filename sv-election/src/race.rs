use crate::error::ElectionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use sv_crypto::{Digest, Modulus};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceId(String);

impl RaceId {
    pub fn new(id: impl Into<String>) -> Self {
        RaceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RaceId {
    fn from(s: &str) -> Self {
        RaceId(s.to_string())
    }
}

/// Write-in votes allowed, free text up to `max_len` bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteInRule {
    pub max_len: usize,
}

/// What a voter selected in one race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    Candidate(String),
    WriteIn(String),
}

impl Choice {
    /// The label a tally counts this choice under. Write-ins are
    /// namespaced so they can never shadow a declared candidate.
    pub fn count_label(&self) -> String {
        match self {
            Choice::Candidate(label) => label.clone(),
            Choice::WriteIn(text) => format!("writein:{}", text),
        }
    }
}

/// One race of the ballot style: an ordered candidate list, an optional
/// write-in rule, and the modulus of the race's value field. Immutable
/// once the election starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    id: RaceId,
    candidates: Vec<String>,
    write_in: Option<WriteInRule>,
    modulus: Modulus,
}

impl Race {
    /// Candidate `i` encodes as `i`; values in `[candidates.len(), m)`
    /// are reserved for write-ins. The modulus must leave room for every
    /// candidate, and for at least one write-in residue when write-ins
    /// are allowed.
    pub fn new(
        id: RaceId,
        candidates: Vec<String>,
        write_in: Option<WriteInRule>,
        modulus: Modulus,
    ) -> Result<Self, ElectionError> {
        let reserved = candidates.len() as u64 + if write_in.is_some() { 1 } else { 0 };
        if modulus.as_u64() < reserved {
            return Err(ElectionError::InvalidRace {
                race_id: id,
                reason: format!(
                    "modulus {} cannot encode {} candidates plus write-ins",
                    modulus, reserved
                ),
            });
        }
        let mut seen = candidates.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != candidates.len() {
            return Err(ElectionError::InvalidRace {
                race_id: id,
                reason: "duplicate candidate labels".to_string(),
            });
        }
        Ok(Race {
            id,
            candidates,
            write_in,
            modulus,
        })
    }

    pub fn id(&self) -> &RaceId {
        &self.id
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn modulus(&self) -> Modulus {
        self.modulus
    }

    pub fn allows_write_in(&self) -> bool {
        self.write_in.is_some()
    }

    /// First residue of the write-in sub-range.
    fn write_in_base(&self) -> u64 {
        self.candidates.len() as u64
    }

    /// Encode a choice as a residue of `Z_m`. Write-in text maps into the
    /// reserved sub-range through its digest; the caller records the
    /// free-text label at cast time so the tally can decode it back.
    pub fn encode(&self, choice: &Choice) -> Result<u64, ElectionError> {
        match choice {
            Choice::Candidate(label) => self
                .candidates
                .iter()
                .position(|c| c == label)
                .map(|i| i as u64)
                .ok_or_else(|| ElectionError::UnknownCandidate {
                    race_id: self.id.clone(),
                    label: label.clone(),
                }),
            Choice::WriteIn(text) => {
                let rule = self.write_in.as_ref().ok_or_else(|| {
                    ElectionError::InvalidWriteIn {
                        race_id: self.id.clone(),
                        reason: "race does not allow write-ins".to_string(),
                    }
                })?;
                if text.is_empty() || text.len() > rule.max_len {
                    return Err(ElectionError::InvalidWriteIn {
                        race_id: self.id.clone(),
                        reason: format!(
                            "write-in length {} outside 1..={}",
                            text.len(),
                            rule.max_len
                        ),
                    });
                }
                let base = self.write_in_base();
                let span = self.modulus.as_u64() - base;
                Ok(base + digest_to_residue(text) % span)
            }
        }
    }

    /// Decode a residue back into a choice. `labels` maps encoded
    /// write-in values to the free text recorded at cast time; a write-in
    /// value with no recorded label is counted under its numeric form.
    pub fn decode(&self, value: u64, labels: &BTreeMap<u64, String>) -> Result<Choice, ElectionError> {
        self.modulus.check(value).map_err(ElectionError::from)?;
        if value < self.write_in_base() {
            return Ok(Choice::Candidate(self.candidates[value as usize].clone()));
        }
        Ok(match labels.get(&value) {
            Some(text) => Choice::WriteIn(text.clone()),
            None => Choice::WriteIn(format!("unrecorded:{}", value)),
        })
    }
}

fn digest_to_residue(text: &str) -> u64 {
    let digest = Digest::hash(text.as_bytes());
    let mut le = [0u8; 8];
    le.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(le)
}

/// The finalized race configuration the core consumes before any vote is
/// cast; never renegotiated mid-election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotStyle {
    races: BTreeMap<RaceId, Race>,
}

impl BallotStyle {
    pub fn new(races: Vec<Race>) -> Result<Self, ElectionError> {
        let mut map = BTreeMap::new();
        for race in races {
            let id = race.id().clone();
            if map.insert(id.clone(), race).is_some() {
                return Err(ElectionError::InvalidRace {
                    race_id: id,
                    reason: "duplicate race id in ballot style".to_string(),
                });
            }
        }
        Ok(BallotStyle { races: map })
    }

    pub fn race(&self, id: &RaceId) -> Result<&Race, ElectionError> {
        self.races
            .get(id)
            .ok_or_else(|| ElectionError::UnknownRace(id.clone()))
    }

    pub fn races(&self) -> impl Iterator<Item = &Race> {
        self.races.values()
    }
}
