//! Private side of the threshold scheme: one decryption server's share
//! of the secret, with partial decryption and the Fiat-Shamir prover.

use num_bigint::BigInt;
use num_traits::{Pow, Zero};
use rand::{CryptoRng, RngCore};
use thiserror::Error;
use zeroize::Zeroize;

use crate::decryption_share::PartialDecryption;
use crate::functions::{random_mod, RandomError};
use crate::paillier::{Ciphertext, EncryptError};
use crate::pub_key::ThresholdPublicKey;
use crate::zk_proof::{compute_hash, PartialDecryptionZKP};

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("invalid share: the decryption proof does not verify")]
    InvalidShare,
    #[error(transparent)]
    Rng(#[from] RandomError),
    #[error(transparent)]
    Encrypt(#[from] EncryptError),
}

/// Secret key material handed to one decryption server by the dealer.
///
/// `share` is `f(id) mod n*m` for the dealer's hiding polynomial `f`.
/// Each server owns an independent copy of the public key, so no state
/// is shared between servers.
#[derive(Debug, Clone)]
pub struct ThresholdSecretKey {
    pub key: ThresholdPublicKey,
    /// Identifier of this server, numbered from 1.
    pub id: usize,
    pub share: BigInt,
}

impl Zeroize for ThresholdSecretKey {
    fn zeroize(&mut self) {
        // The public key and id are not secret.
        self.share = BigInt::zero();
    }
}

impl Drop for ThresholdSecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ThresholdSecretKey {
    /// Returns an independent copy of the public portion of this key,
    /// suitable for handing to encrypting or combining parties.
    pub fn public_key(&self) -> ThresholdPublicKey {
        self.key.clone()
    }

    /// Encrypts `m` under the embedded public key.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        m: &BigInt,
        rng: &mut R,
    ) -> Result<Ciphertext, EncryptError> {
        self.key.encrypt(m, rng)
    }

    /// Produces this server's partial decryption,
    /// `c_i = C^(2 * delta * s_i) mod N^2`.
    pub fn decrypt(&self, ct: &Ciphertext) -> PartialDecryption {
        let exponent = BigInt::from(2) * self.key.delta() * &self.share;
        PartialDecryption {
            id: self.id,
            decryption: ct.c.modpow(&exponent, &self.key.n_squared()),
        }
    }

    /// Produces a partial decryption together with a non-interactive
    /// proof of its correctness.
    ///
    /// The random exponent is drawn uniformly from `[0, N^2)`; the
    /// challenge hashes the commitments with the unreduced `C^4` and
    /// `c_i^2`, and the response `z = r + e * delta * s_i` is computed
    /// over the integers.
    pub fn decrypt_with_zkp<R: RngCore + CryptoRng>(
        &self,
        ct: &Ciphertext,
        rng: &mut R,
    ) -> Result<PartialDecryptionZKP, RandomError> {
        let n_squared = self.key.n_squared();
        let share = self.decrypt(ct);

        let r = random_mod(&n_squared, rng)?;

        let c4 = (&ct.c).pow(4u32);
        let a = c4.modpow(&r, &n_squared);
        let b = self.key.v.modpow(&r, &n_squared);
        let ci2 = (&share.decryption).pow(2u32);

        let e = compute_hash(&a, &b, &c4, &ci2);
        let z = &r + &e * self.key.delta() * &self.share;

        Ok(PartialDecryptionZKP {
            share,
            key: self.key.clone(),
            c: ct.clone(),
            e,
            z,
        })
    }

    /// Checks that this key is well formed by encrypting a random
    /// message and verifying the proof its own decryption produces.
    pub fn validate<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<(), ValidateError> {
        let m = random_mod(&self.key.public_key.n, rng)?;
        let ct = self.encrypt(&m, rng)?;
        let proof = self.decrypt_with_zkp(&ct, rng)?;
        if !proof.verify() {
            return Err(ValidateError::InvalidShare);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    fn fixture_key() -> ThresholdSecretKey {
        ThresholdSecretKey {
            key: ThresholdPublicKey::new(
                BigInt::from(101 * 103),
                10,
                6,
                BigInt::zero(),
                vec![],
            ),
            id: 9,
            share: BigInt::from(862),
        }
    }

    #[test]
    fn partial_decrypt_fixture() {
        let key = fixture_key();
        let partial = key.decrypt(&Ciphertext {
            c: BigInt::from(56),
        });
        assert_eq!(partial.id, 9);
        assert_eq!(partial.decryption, BigInt::from(40644522));
    }

    #[test]
    fn zeroize_clears_the_share() {
        let mut key = fixture_key();
        key.zeroize();
        assert!(key.share.is_zero());
        assert_eq!(key.id, 9);
        assert_eq!(key.key.public_key.n, BigInt::from(101 * 103));
    }

    #[test]
    fn public_key_accessor_is_a_deep_copy() {
        let key = fixture_key();
        let mut public = key.public_key();
        public.vi.push(BigInt::from(5));
        assert!(key.key.vi.is_empty());
    }
}
