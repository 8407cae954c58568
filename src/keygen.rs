//! Trusted-dealer key generation for the threshold scheme, following
//! section 5.1, "Key generation", of Damgård, Jurik and Nielsen (2010).
//!
//! The dealer draws two safe primes, shares the CRT-derived secret
//! exponent with a hiding polynomial, and hands each decryption server
//! an independently owned [`ThresholdSecretKey`]. All intermediate
//! secrets live in the builder, which is consumed and scrubbed by
//! [`ThresholdKeyGenerator::generate`].

use std::time::Duration;

use num_bigint::BigInt;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroize;

use crate::functions::{factorial, random_qr_generator, RandomError};
use crate::polynomial::HidingPolynomial;
use crate::pub_key::ThresholdPublicKey;
use crate::safe_prime::{generate_safe_prime, SafePrimeError};
use crate::threshold_share::ThresholdSecretKey;

const SAFE_PRIME_CONCURRENCY: usize = 4;
const SAFE_PRIME_TIMEOUT: Duration = Duration::from_secs(120);

/// Minimum bit length of the public modulus for which all the properties
/// required of a threshold key can hold.
const MIN_PUBLIC_KEY_BIT_LENGTH: usize = 18;

#[derive(Error, Debug)]
pub enum KeyGenError {
    #[error("public key bit length must be an even number")]
    BitLenNotEven,
    #[error("public key bit length must be at least 18 bits")]
    BitLenTooSmall,
    #[error(transparent)]
    SafePrime(#[from] SafePrimeError),
    #[error(transparent)]
    Rng(#[from] RandomError),
}

/// Dealer-side builder for a threshold key.
///
/// The plaintext space of the generated key is `Z_N` with `N` of
/// `public_key_bit_length` bits. Combining only recovers plaintexts when
/// `threshold > servers / 2`; that property is the caller's to uphold,
/// it is not enforced here.
pub struct ThresholdKeyGenerator {
    public_key_bit_length: usize,
    servers: usize,
    threshold: usize,

    // p and q are safe primes, p = 2*p1 + 1 and q = 2*q1 + 1, with p1
    // and q1 prime as well.
    p: BigInt,
    p1: BigInt,
    q: BigInt,
    q1: BigInt,

    n: BigInt,         // n = p * q
    m: BigInt,         // m = p1 * q1
    n_squared: BigInt, // n_squared = n * n
    nm: BigInt,        // nm = n * m

    // The secret exponent, d = 1 (mod n) and d = 0 (mod m).
    d: BigInt,

    // A generator of the quadratic residues in Z*_{n^2}.
    v: BigInt,

    polynomial: Option<HidingPolynomial>,
}

impl ThresholdKeyGenerator {
    /// Creates a generator for an `l`-server scheme with decryption
    /// threshold `t` and a public modulus of `public_key_bit_length`
    /// bits. The bit length must be even and at least 18.
    pub fn new(
        public_key_bit_length: usize,
        servers: usize,
        threshold: usize,
    ) -> Result<Self, KeyGenError> {
        if public_key_bit_length % 2 != 0 {
            return Err(KeyGenError::BitLenNotEven);
        }
        if public_key_bit_length < MIN_PUBLIC_KEY_BIT_LENGTH {
            return Err(KeyGenError::BitLenTooSmall);
        }

        Ok(ThresholdKeyGenerator {
            public_key_bit_length,
            servers,
            threshold,
            p: BigInt::zero(),
            p1: BigInt::zero(),
            q: BigInt::zero(),
            q1: BigInt::zero(),
            n: BigInt::zero(),
            m: BigInt::zero(),
            n_squared: BigInt::zero(),
            nm: BigInt::zero(),
            d: BigInt::zero(),
            v: BigInt::zero(),
            polynomial: None,
        })
    }

    /// Runs the full dealer protocol and returns one secret key per
    /// server, ids numbered from 1. Consumes the builder; every
    /// intermediate secret is scrubbed when it goes out of scope.
    pub fn generate<R: RngCore + CryptoRng>(
        mut self,
        rng: &mut R,
    ) -> Result<Vec<ThresholdSecretKey>, KeyGenError> {
        debug!(
            bits = self.public_key_bit_length,
            servers = self.servers,
            threshold = self.threshold,
            "generating threshold key"
        );

        self.init_primes()?;
        self.init_shortcuts();
        self.init_d();
        self.v = random_qr_generator(&self.n_squared, rng)?;
        self.init_hiding_polynomial(rng)?;

        let keys = self.create_secret_keys();
        debug!(servers = keys.len(), "threshold key generated");
        Ok(keys)
    }

    fn generate_safe_primes(&self) -> Result<(BigInt, BigInt), SafePrimeError> {
        let bit_length = self.public_key_bit_length / 2;
        generate_safe_prime(bit_length, SAFE_PRIME_CONCURRENCY, SAFE_PRIME_TIMEOUT)
    }

    /// Draws the two safe-prime pairs. The second draw is repeated until
    /// the four primes are pairwise usable; equal primes would collapse
    /// the modulus or leak a factor.
    fn init_primes(&mut self) -> Result<(), KeyGenError> {
        let (p, p1) = self.generate_safe_primes()?;
        self.p = p;
        self.p1 = p1;

        loop {
            let (q, q1) = self.generate_safe_primes()?;
            self.q = q;
            self.q1 = q1;
            if self.primes_are_distinct() {
                return Ok(());
            }
        }
    }

    fn primes_are_distinct(&self) -> bool {
        self.p != self.q && self.p != self.q1 && self.p1 != self.q
    }

    fn init_shortcuts(&mut self) {
        self.n = &self.p * &self.q;
        self.m = &self.p1 * &self.q1;
        self.n_squared = &self.n * &self.n;
        self.nm = &self.n * &self.m;
    }

    /// Chooses `d` with `d = 0 (mod m)` and `d = 1 (mod n)` through the
    /// Chinese Remainder Theorem. With the first residue zero the full
    /// CRT sum collapses to its second term:
    ///
    /// `d = m * (m^-1 mod n)`
    fn init_d(&mut self) {
        let m_inverse = self
            .m
            .modinv(&self.n)
            .expect("m is coprime with n for distinct safe prime pairs");
        self.d = m_inverse * &self.m;
    }

    /// Builds the hiding polynomial `f` of degree `threshold - 1` over
    /// `Z_nm` with `f(0) = d`.
    fn init_hiding_polynomial<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), KeyGenError> {
        let polynomial = HidingPolynomial::new(self.d.clone(), self.threshold, &self.nm, rng)?;
        self.polynomial = Some(polynomial);
        Ok(())
    }

    /// The secret share of server `id` is `f(id) mod nm`.
    fn compute_share(&self, id: usize) -> BigInt {
        let polynomial = self
            .polynomial
            .as_ref()
            .expect("shares are computed after the hiding polynomial");
        polynomial.evaluate(id, &self.nm)
    }

    /// Verification keys for the decryption servers,
    /// `v_i = v^(delta * s_i) mod n^2` with `delta = l!`.
    fn create_verification_keys(&self, shares: &[BigInt]) -> Vec<BigInt> {
        let delta = factorial(self.servers);
        shares
            .iter()
            .map(|share| self.v.modpow(&(share * &delta), &self.n_squared))
            .collect()
    }

    fn create_secret_keys(&mut self) -> Vec<ThresholdSecretKey> {
        let mut shares: Vec<BigInt> = (1..=self.servers)
            .map(|id| self.compute_share(id))
            .collect();
        let vi = self.create_verification_keys(&shares);

        let keys = shares
            .iter()
            .enumerate()
            .map(|(i, share)| ThresholdSecretKey {
                key: ThresholdPublicKey::new(
                    self.n.clone(),
                    self.servers,
                    self.threshold,
                    self.v.clone(),
                    vi.clone(),
                ),
                id: i + 1,
                share: share.clone(),
            })
            .collect();

        for share in &mut shares {
            *share = BigInt::zero();
        }
        keys
    }
}

impl Zeroize for ThresholdKeyGenerator {
    fn zeroize(&mut self) {
        self.p = BigInt::zero();
        self.p1 = BigInt::zero();
        self.q = BigInt::zero();
        self.q1 = BigInt::zero();
        self.n = BigInt::zero();
        self.m = BigInt::zero();
        self.n_squared = BigInt::zero();
        self.nm = BigInt::zero();
        self.d = BigInt::zero();
        self.v = BigInt::zero();
        if let Some(polynomial) = &mut self.polynomial {
            polynomial.zeroize();
        }
        self.polynomial = None;
    }
}

impl Drop for ThresholdKeyGenerator {
    fn drop(&mut self) {
        self.zeroize();
    }
}
