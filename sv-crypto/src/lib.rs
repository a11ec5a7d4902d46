//! Cryptographic primitives for the split-value voting protocol:
//! modular share codec, Blake2b-256 digests and hash commitments.

mod commitment;
mod digest;
mod error;
mod field;

pub use crate::{
    commitment::{Commitment, Open, Randomness, Validity},
    digest::{Digest, DigestContext},
    error::CryptoError,
    field::{combine, sample_mod, split, Modulus, SplitValue},
};
