use crate::entry::{Entry, Payload};
use crate::error::SbbError;
use serde::Serialize;
use serde_json::json;
use sv_crypto::Digest;

pub const TAG_SETUP_START: &str = "setup:start";
pub const TAG_ELECTION_DONE: &str = "election:done";

/// The append-only board. Opened at election start with a genesis entry,
/// sealed at the end; a single writer extends the chain.
#[derive(Debug, Clone)]
pub struct BulletinBoard {
    election_id: String,
    entries: Vec<Entry>,
    closed: bool,
}

impl BulletinBoard {
    /// Open a board for an election and post the genesis entry.
    pub fn new(election_id: &str) -> Self {
        let mut board = BulletinBoard {
            election_id: election_id.to_string(),
            entries: Vec::new(),
            closed: false,
        };
        board.append(
            Payload::new(TAG_SETUP_START, &json!({ "election_id": election_id }))
                .expect("static genesis payload"),
        );
        board
    }

    fn append(&mut self, payload: Payload) -> u64 {
        let sequence_no = self.entries.len() as u64;
        let prev_hash = self
            .entries
            .last()
            .map(|e| e.entry_hash)
            .unwrap_or_else(Digest::zero);
        self.entries.push(Entry::seal(sequence_no, prev_hash, payload));
        sequence_no
    }

    /// Post a payload, extending the hash chain. Returns the sequence
    /// number assigned to the new entry.
    pub fn post<T: Serialize>(&mut self, tag: &str, body: &T) -> Result<u64, SbbError> {
        if self.closed {
            return Err(SbbError::Closed);
        }
        let payload = Payload::new(tag, body)?;
        Ok(self.append(payload))
    }

    /// Seal the board. Posts a final closing entry; every later `post`
    /// fails with [`SbbError::Closed`].
    pub fn close(&mut self) -> Result<u64, SbbError> {
        let body = json!({ "election_id": self.election_id });
        let seq = self.post(TAG_ELECTION_DONE, &body)?;
        self.closed = true;
        Ok(seq)
    }

    pub fn election_id(&self) -> &str {
        &self.election_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The latest posted entry. The board always holds at least the
    /// genesis entry.
    pub fn latest(&self) -> &Entry {
        self.entries.last().expect("board holds a genesis entry")
    }

    pub fn entry(&self, sequence_no: u64) -> Result<&Entry, SbbError> {
        self.entries
            .get(sequence_no as usize)
            .ok_or(SbbError::UnknownSequence(sequence_no))
    }

    /// All entries with sequence number `>= sequence_no`, in order.
    pub fn entries_since(&self, sequence_no: u64) -> &[Entry] {
        let start = (sequence_no as usize).min(self.entries.len());
        &self.entries[start..]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// The most recent entry carrying `tag`, if any.
    pub fn find_latest(&self, tag: &str) -> Option<&Entry> {
        self.entries.iter().rev().find(|e| e.payload.tag == tag)
    }

    /// Walk the whole chain from the genesis entry, recomputing every
    /// hash and checking predecessor linkage.
    pub fn verify_chain(&self) -> Result<(), SbbError> {
        let mut prev_hash = Digest::zero();
        for (i, entry) in self.entries.iter().enumerate() {
            let broken = SbbError::ChainBroken {
                sequence_no: i as u64,
            };
            if entry.sequence_no != i as u64 || entry.prev_hash != prev_hash {
                return Err(broken);
            }
            if !entry.is_intact() {
                return Err(broken);
            }
            prev_hash = entry.entry_hash;
        }
        Ok(())
    }

    /// Serialize the board as a JSON-lines log, one entry per line.
    /// This is the durable, externally replayable record.
    pub fn to_log_string(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry).expect("entry always serializes"));
            out.push('\n');
        }
        out
    }

    /// Rebuild a board from a saved log, re-verifying the whole chain.
    pub fn from_log_str(log: &str) -> Result<Self, SbbError> {
        let mut entries = Vec::new();
        for (i, line) in log.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let entry: Entry = serde_json::from_str(line)
                .map_err(|e| SbbError::BadLog(format!("line {}: {}", i + 1, e)))?;
            entries.push(entry);
        }
        let genesis = entries
            .first()
            .ok_or_else(|| SbbError::BadLog("empty log".to_string()))?;
        if genesis.payload.tag != TAG_SETUP_START {
            return Err(SbbError::BadLog(format!(
                "log does not start with a genesis entry, got {}",
                genesis.payload.tag
            )));
        }
        let election_id = genesis
            .payload
            .body
            .get("election_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SbbError::BadLog("genesis entry without election_id".to_string()))?
            .to_string();
        let closed = entries
            .last()
            .map(|e| e.payload.tag == TAG_ELECTION_DONE)
            .unwrap_or(false);
        let board = BulletinBoard {
            election_id,
            entries,
            closed,
        };
        board.verify_chain()?;
        Ok(board)
    }

    #[cfg(test)]
    pub(crate) fn corrupt_payload_for_tests(&mut self, sequence_no: u64, body: serde_json::Value) {
        self.entries[sequence_no as usize].payload.body = body;
    }
}
