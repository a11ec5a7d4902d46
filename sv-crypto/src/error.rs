use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The value does not belong to `Z_m` for the race modulus `m`.
    #[error("value {value} out of range for modulus {modulus}")]
    OutOfRangeValue { value: u64, modulus: u64 },

    /// A modulus must leave room for at least two residues.
    #[error("modulus must be at least 2, got {0}")]
    ModulusTooSmall(u64),

    /// A hex-encoded digest did not parse back into 32 bytes.
    #[error("invalid digest encoding: {0}")]
    InvalidDigest(String),
}
