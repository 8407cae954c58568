//! Non-interactive proof that a partial decryption is well formed.
//!
//! The proof is a Fiat-Shamir transform of a protocol for equality of
//! discrete logs, `log_{C^4}(c_i^2) = log_V(V_i)`, showing the server
//! raised the ciphertext to its secret exponent matching the public
//! verification key `V_i = V^(delta * s_i)`.
//!
//! Construction (prover side, see `ThresholdSecretKey::decrypt_with_zkp`):
//!
//! - pick random `r` in `[0, N^2)`
//! - `a = (C^4)^r mod N^2`, `b = V^r mod N^2`
//! - `e = SHA-256(a, b, C^4, c_i^2)`
//! - `z = r + e * delta * s_i` over the integers
//!
//! Verification recomputes the commitments from the public values,
//!
//! - `a' = (C^4)^z * ((c_i^2)^e)^-1 mod N^2`
//! - `b' = V^z * (V_i^e)^-1 mod N^2`
//!
//! and accepts iff hashing them reproduces the challenge `e`.
//!
//! Hash inputs are the plain big-endian magnitudes of the values, with
//! `C^4` and `c_i^2` deliberately not reduced modulo `N^2`. Changing
//! either convention breaks interoperability of the proofs.

use num_bigint::{BigInt, Sign};
use num_traits::Pow;
use sha2::{Digest, Sha256};

use crate::decryption_share::PartialDecryption;
use crate::paillier::Ciphertext;
use crate::pub_key::ThresholdPublicKey;

/// A partial decryption bundled with its proof of correctness and
/// everything needed to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDecryptionZKP {
    pub share: PartialDecryption,
    /// The public key the ciphertext was produced under.
    pub key: ThresholdPublicKey,
    /// The ciphertext this share decrypts.
    pub c: Ciphertext,
    /// The challenge.
    pub e: BigInt,
    /// The response binding the challenge to the secret share.
    pub z: BigInt,
}

impl PartialDecryptionZKP {
    /// Checks the proof. A failed verification is an ordinary `false`,
    /// never an error; combining treats it as a filter predicate.
    pub fn verify(&self) -> bool {
        // An honest prover never produces negative values; a decoded
        // proof carrying them must not reach modpow.
        if self.e.sign() == Sign::Minus || self.z.sign() == Sign::Minus {
            return false;
        }

        let (a, b) = match (self.verify_part1(), self.verify_part2()) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };

        let c4 = (&self.c.c).pow(4u32);
        let ci2 = (&self.share.decryption).pow(2u32);
        let expected_e = compute_hash(&a, &b, &c4, &ci2);
        self.e == expected_e
    }

    /// Recomputes the commitment `a' = (C^4)^z * ((c_i^2)^e)^-1 mod N^2`.
    fn verify_part1(&self) -> Option<BigInt> {
        let n_squared = self.key.n_squared();
        let c4 = (&self.c.c).pow(4u32);
        let ci2 = (&self.share.decryption).pow(2u32);

        let a1 = c4.modpow(&self.z, &n_squared);
        let a2 = ci2.modpow(&self.e, &n_squared).modinv(&n_squared)?;
        Some((a1 * a2) % n_squared)
    }

    /// Recomputes the commitment `b' = V^z * (V_i^e)^-1 mod N^2`.
    /// Servers are numbered from 1, so `V_i` sits at index `id - 1`.
    fn verify_part2(&self) -> Option<BigInt> {
        let n_squared = self.key.n_squared();
        let vi = self
            .share
            .id
            .checked_sub(1)
            .and_then(|i| self.key.vi.get(i))?;

        let b1 = self.key.v.modpow(&self.z, &n_squared);
        let b2 = vi.modpow(&self.e, &n_squared).modinv(&n_squared)?;
        Some((b1 * b2) % n_squared)
    }
}

/// `SHA-256(a, b, c4, ci2)` over big-endian magnitudes, interpreted as a
/// big-endian integer.
pub(crate) fn compute_hash(a: &BigInt, b: &BigInt, c4: &BigInt, ci2: &BigInt) -> BigInt {
    let mut hash = Sha256::new();
    hash.update(be_bytes(a));
    hash.update(be_bytes(b));
    hash.update(be_bytes(c4));
    hash.update(be_bytes(ci2));
    BigInt::from_bytes_be(Sign::Plus, &hash.finalize())
}

/// Big-endian magnitude with no sign byte and no leading zeros; zero is
/// the empty string.
fn be_bytes(n: &BigInt) -> Vec<u8> {
    use num_traits::Zero;
    if n.is_zero() {
        return Vec::new();
    }
    n.to_bytes_be().1
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    fn fixture() -> PartialDecryptionZKP {
        PartialDecryptionZKP {
            share: PartialDecryption {
                id: 1,
                decryption: BigInt::from(101),
            },
            key: ThresholdPublicKey::new(
                BigInt::from(131),
                2,
                2,
                BigInt::from(101),
                vec![BigInt::from(77), BigInt::from(67)],
            ),
            c: Ciphertext {
                c: BigInt::from(99),
            },
            e: BigInt::from(112),
            z: BigInt::from(88),
        }
    }

    #[test]
    fn verify_part1_fixture() {
        assert_eq!(fixture().verify_part1(), Some(BigInt::from(11986)));
    }

    #[test]
    fn verify_part2_fixture() {
        // id 1 selects vi = 77.
        assert_eq!(fixture().verify_part2(), Some(BigInt::from(14602)));
    }

    #[test]
    fn verify_part2_rejects_out_of_range_ids() {
        let mut pd = fixture();
        pd.share.id = 0;
        assert_eq!(pd.verify_part2(), None);
        pd.share.id = 3;
        assert_eq!(pd.verify_part2(), None);
        assert!(!pd.verify());
    }

    #[test]
    fn negative_proof_values_verify_false() {
        let mut pd = fixture();
        pd.e = -pd.e.clone();
        assert!(!pd.verify());
        let mut pd = fixture();
        pd.z = -pd.z.clone();
        assert!(!pd.verify());
    }

    #[test]
    fn be_bytes_of_zero_is_empty() {
        assert!(be_bytes(&BigInt::zero()).is_empty());
        assert_eq!(be_bytes(&BigInt::from(0x01ff)), vec![0x01, 0xff]);
    }
}
