use crate::error::SbbError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sv_crypto::{Digest, DigestContext};

/// What an entry carries: a short namespaced tag (`"tally:result"`, ...)
/// and an arbitrary JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub tag: String,
    pub body: Value,
}

impl Payload {
    pub fn new<T: Serialize>(tag: &str, body: &T) -> Result<Self, SbbError> {
        let body = serde_json::to_value(body).map_err(|e| SbbError::Payload(e.to_string()))?;
        Ok(Payload {
            tag: tag.to_string(),
            body,
        })
    }

    /// The bytes the entry hash commits to. Lengths are prefixed so that
    /// (tag, body) pairs cannot collide across a boundary shift.
    ///
    /// `serde_json` maps are sorted by key, so this encoding is
    /// deterministic for a given body.
    fn hash_input(&self) -> Vec<u8> {
        let body = serde_json::to_vec(&self.body).expect("JSON value always serializes");
        let mut bytes = Vec::with_capacity(16 + self.tag.len() + body.len());
        bytes.extend_from_slice(&(self.tag.len() as u64).to_le_bytes());
        bytes.extend_from_slice(self.tag.as_bytes());
        bytes.extend_from_slice(&(body.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&body);
        bytes
    }
}

/// One immutable record of the bulletin board:
/// `entry_hash = H(sequence_no ‖ prev_hash ‖ payload)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub sequence_no: u64,
    pub prev_hash: Digest,
    pub payload: Payload,
    pub entry_hash: Digest,
}

impl Entry {
    pub(crate) fn seal(sequence_no: u64, prev_hash: Digest, payload: Payload) -> Self {
        let entry_hash = Self::compute_hash(sequence_no, &prev_hash, &payload);
        Entry {
            sequence_no,
            prev_hash,
            payload,
            entry_hash,
        }
    }

    pub fn compute_hash(sequence_no: u64, prev_hash: &Digest, payload: &Payload) -> Digest {
        let mut ctx = DigestContext::new();
        ctx.append(&sequence_no.to_le_bytes());
        ctx.append(prev_hash.as_bytes());
        ctx.append(&payload.hash_input());
        ctx.finalize()
    }

    /// Recompute this entry's hash and compare against the stored one.
    pub fn is_intact(&self) -> bool {
        Self::compute_hash(self.sequence_no, &self.prev_hash, &self.payload) == self.entry_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sealed_entry_is_intact() {
        let payload = Payload::new("test:entry", &json!({"k": 1})).unwrap();
        let entry = Entry::seal(0, Digest::zero(), payload);
        assert!(entry.is_intact());
    }

    #[test]
    fn payload_edit_breaks_entry() {
        let payload = Payload::new("test:entry", &json!({"k": 1})).unwrap();
        let mut entry = Entry::seal(0, Digest::zero(), payload);
        entry.payload.body = json!({"k": 2});
        assert!(!entry.is_intact());
    }

    #[test]
    fn tag_and_body_boundaries_do_not_collide() {
        let a = Payload::new("ab", &json!("c")).unwrap();
        let b = Payload::new("a", &json!("bc")).unwrap();
        assert_ne!(
            Entry::compute_hash(0, &Digest::zero(), &a),
            Entry::compute_hash(0, &Digest::zero(), &b)
        );
    }

    #[test]
    fn json_round_trip_preserves_hash() {
        let payload = Payload::new("test:entry", &json!({"b": 2, "a": 1})).unwrap();
        let entry = Entry::seal(3, Digest::hash(b"prev"), payload);
        let back: Entry = serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
        assert_eq!(back, entry);
        assert!(back.is_intact());
    }
}
