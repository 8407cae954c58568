//! The plain (single decryptor) Paillier cryptosystem.
//!
//! Construction 11.32 of Katz and Lindell's "Introduction to Modern
//! Cryptography" (2008), which is compatible with section 3.2 of
//! Damgård, Jurik and Nielsen's "A Generalization of Paillier's
//! Public-Key System with Applications to Electronic Voting" (2010),
//! except that the private exponent is Euler's totient of `N` rather
//! than the Carmichael function.

use std::fmt;

use num_bigint::BigInt;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use thiserror::Error;

use crate::functions::{random_in_mult_group, RandomError};

#[derive(Error, Debug)]
pub enum EncryptError {
    #[error("{m} is out of allowed plaintext space [0, {n})")]
    InvalidPlaintext { m: BigInt, n: BigInt },
    #[error(transparent)]
    Rng(#[from] RandomError),
}

/// Paillier public key. The generator is always `G = N + 1`; threshold
/// decryption is only safe for that choice (DJN 10, section 5.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub n: BigInt,
    pub g: BigInt,
}

impl PublicKey {
    pub fn new(n: BigInt) -> Self {
        let g = &n + BigInt::one();
        PublicKey { n, g }
    }

    pub fn n_squared(&self) -> BigInt {
        &self.n * &self.n
    }

    /// Encrypts `m` with the randomness `r` supplied by the caller. The
    /// plaintext must lie in `[0, N)` and `r` must be an element of the
    /// multiplicative group of integers modulo `N`.
    ///
    /// `E(m, r) = (1 + N)^m * r^N mod N^2`
    ///
    /// Use [`PublicKey::encrypt`] unless a specific `r` is needed.
    pub fn encrypt_with_r(&self, m: &BigInt, r: &BigInt) -> Result<Ciphertext, EncryptError> {
        if m.sign() == num_bigint::Sign::Minus || m >= &self.n {
            return Err(EncryptError::InvalidPlaintext {
                m: m.clone(),
                n: self.n.clone(),
            });
        }

        let n_squared = self.n_squared();
        let gm = self.g.modpow(m, &n_squared);
        let rn = r.modpow(&self.n, &n_squared);
        Ok(Ciphertext {
            c: (gm * rn) % n_squared,
        })
    }

    /// Encrypts `m` with randomness drawn from `rng`. The plaintext must
    /// lie in `[0, N)`.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        m: &BigInt,
        rng: &mut R,
    ) -> Result<Ciphertext, EncryptError> {
        let r = random_in_mult_group(&self.n, rng)?;
        self.encrypt_with_r(m, &r)
    }

    /// Returns a ciphertext encoding the sum of the given ciphertexts'
    /// plaintexts. The product of two ciphertexts decrypts to the sum of
    /// the corresponding plaintexts:
    ///
    /// `D(E(m1) * E(m2) mod N^2) = m1 + m2 mod N`
    pub fn add(&self, cts: &[Ciphertext]) -> Ciphertext {
        let n_squared = self.n_squared();
        let mut accumulator = BigInt::one();
        for ct in cts {
            accumulator = (accumulator * &ct.c) % &n_squared;
        }
        Ciphertext { c: accumulator }
    }

    /// Returns a ciphertext encoding the product of `ct`'s plaintext and
    /// `scalar`, without decrypting. A ciphertext raised to `k` decrypts
    /// to `k` times the plaintext:
    ///
    /// `D(E(m)^k mod N^2) = k * m mod N`
    pub fn mul(&self, ct: &Ciphertext, scalar: &BigInt) -> Ciphertext {
        Ciphertext {
            c: ct.c.modpow(scalar, &self.n_squared()),
        }
    }
}

/// Paillier secret key, holding `lambda = (p-1)(q-1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKey {
    pub public_key: PublicKey,
    pub lambda: BigInt,
}

impl SecretKey {
    /// Builds a secret key from two large primes of equal length (or any
    /// `p`, `q` with `gcd(pq, (p-1)(q-1)) = 1`). Primality is not
    /// checked.
    pub fn from_primes(p: &BigInt, q: &BigInt) -> Self {
        let n = p * q;
        let lambda = compute_phi(p, q);
        SecretKey {
            public_key: PublicKey::new(n),
            lambda,
        }
    }

    /// Decrypts a ciphertext back to its plaintext:
    ///
    /// `D(c) = L(c^lambda mod N^2, N) * lambda^-1 mod N`
    pub fn decrypt(&self, ct: &Ciphertext) -> BigInt {
        let n = &self.public_key.n;
        let mu = self
            .lambda
            .modinv(n)
            .expect("lambda is invertible modulo N for a key built from distinct odd primes");
        let tmp = ct.c.modpow(&self.lambda, &self.public_key.n_squared());
        (l_function(&tmp, n) * mu) % n
    }
}

/// A Paillier ciphertext, an element of `Z*_{N^2}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub c: BigInt,
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.c)
    }
}

/// `L(u, n) = (u - 1) / n`, an exact integer division whenever
/// `u = 1 (mod n)`.
pub(crate) fn l_function(u: &BigInt, n: &BigInt) -> BigInt {
    (u - BigInt::one()) / n
}

pub(crate) fn compute_phi(p: &BigInt, q: &BigInt) -> BigInt {
    (p - BigInt::one()) * (q - BigInt::one())
}
