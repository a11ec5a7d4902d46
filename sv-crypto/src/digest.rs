use crate::error::CryptoError;
use cryptoxide::blake2b::Blake2b;
use cryptoxide::digest::Digest as _;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A Blake2b-256 digest. Used both for commitment digests and for the
/// bulletin-board hash chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; Self::BYTES_LEN]);

impl Digest {
    pub const BYTES_LEN: usize = 32;

    /// Digest of all zeroes, the `prev_hash` of a chain's genesis entry.
    pub fn zero() -> Self {
        Digest([0u8; Self::BYTES_LEN])
    }

    pub fn hash(bytes: &[u8]) -> Self {
        let mut ctx = DigestContext::new();
        ctx.append(bytes);
        ctx.finalize()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Digest {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidDigest(e.to_string()))?;
        let bytes: [u8; Self::BYTES_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidDigest(format!("wrong length in {}", s)))?;
        Ok(Digest(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Incremental digest computation over multiple fields.
#[derive(Clone)]
pub struct DigestContext(Blake2b);

impl DigestContext {
    pub fn new() -> Self {
        DigestContext(Blake2b::new(Digest::BYTES_LEN))
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.0.input(bytes);
    }

    pub fn finalize(mut self) -> Digest {
        let mut out = [0u8; Digest::BYTES_LEN];
        self.0.result(&mut out);
        Digest(out)
    }
}

impl Default for DigestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_matches_one_shot() {
        let mut ctx = DigestContext::new();
        ctx.append(b"split");
        ctx.append(b"-value");
        assert_eq!(ctx.finalize(), Digest::hash(b"split-value"));
    }

    #[test]
    fn hex_round_trip() {
        let d = Digest::hash(b"ballot");
        let parsed: Digest = d.to_string().parse().unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("zz".parse::<Digest>().is_err());
        assert!("abcd".parse::<Digest>().is_err());
    }

    #[test]
    fn distinct_inputs_distinct_digests() {
        assert_ne!(Digest::hash(b"a"), Digest::hash(b"b"));
    }
}
