use crate::digest::{Digest, DigestContext};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blinding randomness for a commitment. 256 bits, so the digest reveals
/// nothing about the committed value without it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Randomness(#[serde(with = "hex_bytes")] [u8; 32]);

impl Randomness {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Randomness(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Randomness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let v = hex::decode(&s).map_err(de::Error::custom)?;
        v.try_into()
            .map_err(|_| de::Error::custom("expected 32 bytes"))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid,
}

/// The opening of a commitment, retained privately by the committer and
/// revealed only on challenge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Open {
    pub value: u64,
    pub randomness: Randomness,
}

/// Hash commitment to a field value: `digest = H(value ‖ randomness)`.
///
/// Binding under collision resistance of Blake2b-256, hiding under the
/// 256-bit blinding randomness.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment {
    digest: Digest,
}

impl Commitment {
    pub fn commit(value: u64, randomness: &Randomness) -> Self {
        let mut ctx = DigestContext::new();
        ctx.append(&value.to_le_bytes());
        ctx.append(randomness.as_bytes());
        Commitment {
            digest: ctx.finalize(),
        }
    }

    pub fn new<R: RngCore + CryptoRng>(rng: &mut R, value: u64) -> (Self, Open) {
        let randomness = Randomness::random(rng);
        let commitment = Self::commit(value, &randomness);
        (commitment, Open { value, randomness })
    }

    /// Check an opening against this commitment.
    pub fn verify(&self, open: &Open) -> Validity {
        if Self::commit(open.value, &open.randomness) == *self {
            Validity::Valid
        } else {
            Validity::Invalid
        }
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digest)
    }
}
