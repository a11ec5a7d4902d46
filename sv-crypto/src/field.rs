use crate::error::CryptoError;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The modulus of a race's value field `Z_m`. All vote values and shares for
/// a race are residues modulo this number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modulus(u64);

impl Modulus {
    pub fn new(m: u64) -> Result<Self, CryptoError> {
        if m < 2 {
            return Err(CryptoError::ModulusTooSmall(m));
        }
        Ok(Modulus(m))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Check that `value` is a residue of this field.
    pub fn check(&self, value: u64) -> Result<u64, CryptoError> {
        if value >= self.0 {
            return Err(CryptoError::OutOfRangeValue {
                value,
                modulus: self.0,
            });
        }
        Ok(value)
    }

    pub fn add(&self, a: u64, b: u64) -> u64 {
        // residues are < 2^63 in practice, but stay safe for any u64 inputs
        ((a as u128 + b as u128) % self.0 as u128) as u64
    }

    pub fn sub(&self, a: u64, b: u64) -> u64 {
        let b = b % self.0;
        (a % self.0 + self.0 - b) % self.0
    }
}

impl fmt::Display for Modulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sample a uniform residue of `Z_m` from a cryptographically strong source.
/// Rejection sampling over `u64` avoids modulo bias.
pub fn sample_mod<R: RngCore + CryptoRng>(rng: &mut R, modulus: Modulus) -> u64 {
    let m = modulus.as_u64();
    let zone = u64::MAX - (u64::MAX % m);
    loop {
        let x = rng.next_u64();
        if x < zone {
            return x % m;
        }
    }
}

/// The two additive shares of a vote value: `u + v ≡ value (mod m)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SplitValue {
    pub u: u64,
    pub v: u64,
}

/// Split `value` into two shares, each individually uniform over `Z_m`.
///
/// Only the first share is sampled; the second is fixed by the sum
/// constraint. Sampling both would break recombination.
pub fn split<R: RngCore + CryptoRng>(
    rng: &mut R,
    value: u64,
    modulus: Modulus,
) -> Result<SplitValue, CryptoError> {
    modulus.check(value)?;
    let u = sample_mod(rng, modulus);
    let v = modulus.sub(value, u);
    Ok(SplitValue { u, v })
}

/// Recombine two shares into the original value.
pub fn combine(u: u64, v: u64, modulus: Modulus) -> Result<u64, CryptoError> {
    modulus.check(u)?;
    modulus.check(v)?;
    Ok(modulus.add(u, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen, TestResult};
    use quickcheck_macros::quickcheck;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    impl Arbitrary for Modulus {
        fn arbitrary<G: Gen>(g: &mut G) -> Self {
            Modulus(2 + u64::arbitrary(g) % 100_003)
        }
    }

    #[quickcheck]
    fn split_then_combine_is_identity(value: u64, modulus: Modulus) -> TestResult {
        let value = value % modulus.as_u64();
        let mut rng = ChaCha20Rng::seed_from_u64(value ^ modulus.as_u64());
        let shares = split(&mut rng, value, modulus).unwrap();
        TestResult::from_bool(combine(shares.u, shares.v, modulus).unwrap() == value)
    }

    #[quickcheck]
    fn shares_are_residues(value: u64, modulus: Modulus) -> TestResult {
        let value = value % modulus.as_u64();
        let mut rng = ChaCha20Rng::seed_from_u64(value.wrapping_mul(31));
        let shares = split(&mut rng, value, modulus).unwrap();
        TestResult::from_bool(shares.u < modulus.as_u64() && shares.v < modulus.as_u64())
    }

    #[test]
    fn split_rejects_out_of_range() {
        let m = Modulus::new(5).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(
            split(&mut rng, 5, m),
            Err(CryptoError::OutOfRangeValue {
                value: 5,
                modulus: 5
            })
        );
    }

    #[test]
    fn combine_rejects_out_of_range_share() {
        let m = Modulus::new(5).unwrap();
        assert!(combine(6, 1, m).is_err());
    }

    #[test]
    fn modulus_must_hold_two_residues() {
        assert!(Modulus::new(0).is_err());
        assert!(Modulus::new(1).is_err());
        assert!(Modulus::new(2).is_ok());
    }

    #[test]
    fn sample_mod_covers_small_field() {
        let m = Modulus::new(5).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut seen = [false; 5];
        for _ in 0..200 {
            seen[sample_mod(&mut rng, m) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
