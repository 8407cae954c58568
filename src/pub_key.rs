//! Public side of the threshold scheme: holds the scheme parameters and
//! combines partial decryptions into a plaintext.
//!
//! Key generation, encryption, share decryption and share combining for
//! the threshold Paillier scheme are described in section 5.1 of
//! Damgård, Jurik and Nielsen, "A Generalization of Paillier's
//! Public-Key System with Applications to Electronic Voting" (2010).

use std::collections::HashSet;

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use rand::{CryptoRng, RngCore};
use thiserror::Error;

use crate::decryption_share::PartialDecryption;
use crate::functions::factorial;
use crate::paillier::{l_function, Ciphertext, EncryptError, PublicKey};
use crate::zk_proof::PartialDecryptionZKP;

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("threshold not met: got {got} shares, need {required}")]
    ThresholdNotMet { required: usize, got: usize },
    #[error("two shares have been produced by server {id}")]
    DuplicateShare { id: usize },
    #[error("share from server {id} embeds a different ciphertext than the one being verified")]
    ShareMismatch { id: usize },
    #[error("combined plaintext differs from the expected one")]
    PlaintextMismatch,
}

/// Public key of the threshold scheme.
///
/// `v` is a generator of the cyclic group of squares in `Z*_{N^2}`; it
/// and the per-server verification keys `vi = v^(delta * s_i) mod N^2`
/// exist only to support the zero-knowledge proof of a share decryption.
///
/// Combining is only guaranteed to recover the plaintext when the
/// threshold exceeds half the number of servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdPublicKey {
    pub public_key: PublicKey,
    /// Total number of decryption servers, `l`.
    pub servers: usize,
    /// Number of shares required to decrypt, `t`.
    pub threshold: usize,
    pub v: BigInt,
    pub vi: Vec<BigInt>,
}

impl ThresholdPublicKey {
    pub fn new(n: BigInt, servers: usize, threshold: usize, v: BigInt, vi: Vec<BigInt>) -> Self {
        ThresholdPublicKey {
            public_key: PublicKey::new(n),
            servers,
            threshold,
            v,
            vi,
        }
    }

    pub fn n_squared(&self) -> BigInt {
        self.public_key.n_squared()
    }

    /// Encrypts `m` under the embedded public key.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        m: &BigInt,
        rng: &mut R,
    ) -> Result<Ciphertext, EncryptError> {
        self.public_key.encrypt(m, rng)
    }

    /// Homomorphic addition under the embedded public key.
    pub fn add(&self, cts: &[Ciphertext]) -> Ciphertext {
        self.public_key.add(cts)
    }

    /// Homomorphic scalar multiplication under the embedded public key.
    pub fn mul(&self, ct: &Ciphertext, scalar: &BigInt) -> Ciphertext {
        self.public_key.mul(ct, scalar)
    }

    /// `delta = l!`, a constant of the key.
    pub fn delta(&self) -> BigInt {
        factorial(self.servers)
    }

    /// `(4 * delta^2)^-1 mod N`, the constant applied in the last step of
    /// share combining.
    pub fn combine_shares_constant(&self) -> BigInt {
        let delta = self.delta();
        let tmp = BigInt::from(4) * &delta * &delta;
        tmp.modinv(&self.public_key.n)
            .expect("4 * delta^2 is invertible modulo N for a dealer-generated key")
    }

    /// Combines partial decryptions provided by decryption servers and
    /// returns the decrypted message.
    ///
    /// No zero-knowledge proofs are checked here; a corrupted partial
    /// decryption silently yields a wrong message. Use
    /// [`ThresholdPublicKey::combine_with_zkp`] when shares come from
    /// untrusted servers.
    pub fn combine(&self, shares: &[PartialDecryption]) -> Result<BigInt, CombineError> {
        self.check_shares(shares)?;

        let mut cprime = BigInt::one();
        for share in shares {
            let lambda = self.lagrange_coefficient(share, shares);
            cprime = self.update_cprime(&cprime, &lambda, share);
        }

        Ok(self.decryption_of_cprime(&cprime))
    }

    /// Combines partial decryptions, first filtering out every share
    /// whose zero-knowledge proof fails to verify.
    pub fn combine_with_zkp(&self, shares: &[PartialDecryptionZKP]) -> Result<BigInt, CombineError> {
        let valid: Vec<PartialDecryption> = shares
            .iter()
            .filter(|zkp| zkp.verify())
            .map(|zkp| zkp.share.clone())
            .collect();
        self.combine(&valid)
    }

    /// Verifies that `ct` decrypts to `expected` given the servers'
    /// proofs: every share must embed `ct`, every proof must verify, and
    /// the surviving shares must combine to `expected`.
    pub fn verify_decryption(
        &self,
        ct: &Ciphertext,
        expected: &BigInt,
        shares: &[PartialDecryptionZKP],
    ) -> Result<(), CombineError> {
        for share in shares {
            if &share.c != ct {
                return Err(CombineError::ShareMismatch { id: share.share.id });
            }
        }
        let decrypted = self.combine_with_zkp(shares)?;
        if &decrypted != expected {
            return Err(CombineError::PlaintextMismatch);
        }
        Ok(())
    }

    /// Rejects share sets that are too small or contain two shares from
    /// the same server.
    fn check_shares(&self, shares: &[PartialDecryption]) -> Result<(), CombineError> {
        if shares.len() < self.threshold {
            return Err(CombineError::ThresholdNotMet {
                required: self.threshold,
                got: shares.len(),
            });
        }
        let mut seen = HashSet::new();
        for share in shares {
            if !seen.insert(share.id) {
                return Err(CombineError::DuplicateShare { id: share.id });
            }
        }
        Ok(())
    }

    /// Integer Lagrange coefficient for `share` over the share set,
    /// built on a running accumulator seeded with `delta`:
    ///
    /// `lambda_i = delta * prod_{j != i} (-j) / (i - j)`
    ///
    /// Every step divides exactly because `delta = l!` is a multiple of
    /// each `(i - j)`.
    fn lagrange_coefficient(
        &self,
        share: &PartialDecryption,
        shares: &[PartialDecryption],
    ) -> BigInt {
        let mut lambda = self.delta();
        for other in shares {
            if other.id != share.id {
                lambda = update_lambda(&lambda, share.id, other.id);
            }
        }
        lambda
    }

    /// Folds one share into the combined value
    /// `c' = prod c_i^(2 * lambda_i) mod N^2`.
    fn update_cprime(&self, cprime: &BigInt, lambda: &BigInt, share: &PartialDecryption) -> BigInt {
        let two_lambda = BigInt::from(2) * lambda;
        let ci = exp_signed(&share.decryption, &two_lambda, &self.n_squared());
        (cprime * ci) % self.n_squared()
    }

    /// Last step of combining: `m = L(c', N) * (4 * delta^2)^-1 mod N`.
    fn decryption_of_cprime(&self, cprime: &BigInt) -> BigInt {
        let l = l_function(cprime, &self.public_key.n);
        (self.combine_shares_constant() * l) % &self.public_key.n
    }
}

/// One multiplication step of the Lagrange accumulator. The division is
/// exact whenever the accumulator started from `delta`.
fn update_lambda(lambda: &BigInt, share_id: usize, other_id: usize) -> BigInt {
    let num = lambda * BigInt::from(-(other_id as i64));
    let denom = BigInt::from(share_id as i64 - other_id as i64);
    debug_assert!(
        (&num % &denom).is_zero(),
        "Lagrange accumulator not divisible by {}",
        denom
    );
    num / denom
}

/// `a^b mod m` where `b` may be negative; a negative exponent goes
/// through the modular inverse of `a^|b|`.
fn exp_signed(a: &BigInt, b: &BigInt, m: &BigInt) -> BigInt {
    if b.is_negative() {
        let inv = a.modpow(&-b, m);
        inv.modinv(m)
            .expect("honest partial decryptions are invertible modulo N^2")
    } else {
        a.modpow(b, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_key(n: i64, servers: usize, threshold: usize) -> ThresholdPublicKey {
        ThresholdPublicKey::new(BigInt::from(n), servers, threshold, BigInt::zero(), vec![])
    }

    fn share(id: usize, decryption: i64) -> PartialDecryption {
        PartialDecryption {
            id,
            decryption: BigInt::from(decryption),
        }
    }

    #[test]
    fn delta_is_factorial_of_server_count() {
        let key = bare_key(35, 6, 4);
        assert_eq!(key.delta(), BigInt::from(720));
    }

    #[test]
    fn combine_shares_constant_fixture() {
        let key = bare_key(101 * 103, 6, 4);
        assert_eq!(key.combine_shares_constant(), BigInt::from(4558));
    }

    #[test]
    fn check_shares_accepts_distinct_ids() {
        let key = bare_key(35, 2, 2);
        assert!(key.check_shares(&[share(1, 0), share(2, 0)]).is_ok());
    }

    #[test]
    fn check_shares_rejects_too_few() {
        let key = bare_key(35, 2, 2);
        match key.check_shares(&[share(1, 0)]) {
            Err(CombineError::ThresholdNotMet { required: 2, got: 1 }) => {}
            other => panic!("expected ThresholdNotMet, got {:?}", other),
        }
    }

    #[test]
    fn check_shares_rejects_duplicate_ids() {
        let key = bare_key(35, 2, 2);
        match key.check_shares(&[share(3, 0), share(3, 0)]) {
            Err(CombineError::DuplicateShare { id: 3 }) => {}
            other => panic!("expected DuplicateShare, got {:?}", other),
        }
    }

    #[test]
    fn update_lambda_divides_exactly() {
        // 12 * (-7) / (3 - 7) = 21
        assert_eq!(
            update_lambda(&BigInt::from(12), 3, 7),
            BigInt::from(21)
        );
        // 720 * (-2) / (1 - 2) = 1440
        assert_eq!(
            update_lambda(&BigInt::from(720), 1, 2),
            BigInt::from(1440)
        );
    }

    #[test]
    fn update_cprime_fixture() {
        let key = bare_key(99, 0, 0);
        let cprime = key.update_cprime(&BigInt::from(77), &BigInt::from(52), &share(3, 5));
        assert_eq!(cprime, BigInt::from(8558));
    }

    #[test]
    fn exp_signed_handles_negative_exponents() {
        let m = BigInt::from(35);
        // 2^-1 mod 35 = 18
        assert_eq!(
            exp_signed(&BigInt::from(2), &BigInt::from(-1), &m),
            BigInt::from(18)
        );
        assert_eq!(
            exp_signed(&BigInt::from(2), &BigInt::from(5), &m),
            BigInt::from(32)
        );
    }

    #[test]
    fn combine_recovers_known_plaintext() {
        // Two fixed partial decryptions of an encryption of 100.
        let key = ThresholdPublicKey::new(
            BigInt::from(637753i64),
            2,
            2,
            BigInt::from(70661107826i64),
            vec![],
        );
        let shares = [
            share(1, 384111638639),
            share(2, 235243761043),
        ];
        assert_eq!(key.combine(&shares).unwrap(), BigInt::from(100));
    }
}
