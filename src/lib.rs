//! Paillier cryptosystem with a threshold variant and verifiable partial
//! decryption.
//!
//! The single-party scheme follows construction 11.32 of Katz and
//! Lindell, "Introduction to Modern Cryptography" (2008). The threshold
//! scheme, in which a trusted dealer splits the decryption key among `l`
//! servers so that any `t` of them can jointly recover a plaintext,
//! follows section 5.1 of
//! [Damgård, Jurik and Nielsen (2010)](https://people.csail.mit.edu/rivest/voting/papers/DamgardJurikNielsen-AGeneralizationOfPailliersPublicKeySystemWithApplicationsToElectronicVoting.pdf),
//! "A Generalization of Paillier's Public-Key System with Applications
//! to Electronic Voting". Each server can accompany its partial
//! decryption with a non-interactive zero-knowledge proof that the share
//! is well formed, and the combiner can filter on those proofs.
//!
//! # Example
//!
//! ```
//! use num_bigint::BigInt;
//! use quorum_paillier::ThresholdKeyGenerator;
//! use rand::rngs::OsRng;
//!
//! // A dealer shares a 32-bit key among 3 servers, any 2 of which can
//! // decrypt. Real keys want thousands of bits.
//! let keys = ThresholdKeyGenerator::new(32, 3, 2)?.generate(&mut OsRng)?;
//! let public_key = keys[0].public_key();
//!
//! let ct = public_key.encrypt(&BigInt::from(87), &mut OsRng)?;
//! let shares: Vec<_> = keys.iter().take(2).map(|key| key.decrypt(&ct)).collect();
//! assert_eq!(public_key.combine(&shares)?, BigInt::from(87));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Caveat
//!
//! This code has not been verified by a third party. It is a reference
//! implementation: if you need to encrypt something serious, use a
//! reviewed library. Arithmetic runs on a variable-time big-integer
//! backend and no side-channel resistance is promised.

pub mod decryption_share;
mod encoding;
pub mod functions;
pub mod keygen;
pub mod paillier;
mod polynomial;
pub mod pub_key;
pub mod safe_prime;
pub mod threshold_share;
pub mod zk_proof;

pub use decryption_share::PartialDecryption;
pub use functions::{factorial, random_in_mult_group, random_qr_generator, RandomError};
pub use keygen::{KeyGenError, ThresholdKeyGenerator};
pub use paillier::{Ciphertext, EncryptError, PublicKey, SecretKey};
pub use pub_key::{CombineError, ThresholdPublicKey};
pub use safe_prime::{generate_safe_prime, SafePrimeError};
pub use threshold_share::{ThresholdSecretKey, ValidateError};
pub use zk_proof::PartialDecryptionZKP;
