use thiserror::Error;

#[derive(Debug, Error)]
pub enum SbbError {
    /// Recomputing the hash chain found a mismatch. Tamper evidence:
    /// nothing posted after this point can be trusted.
    #[error("hash chain broken at entry {sequence_no}")]
    ChainBroken { sequence_no: u64 },

    /// The board was sealed; no further entries are accepted.
    #[error("bulletin board is closed")]
    Closed,

    #[error("no entry with sequence number {0}")]
    UnknownSequence(u64),

    /// A payload body failed to serialize to JSON.
    #[error("unserializable payload: {0}")]
    Payload(String),

    /// A saved log could not be parsed back into a board.
    #[error("malformed bulletin board log: {0}")]
    BadLog(String),
}
