//! Serde representations of the public structs.
//!
//! Every big integer travels as the lowercase hex string of its
//! magnitude, with no prefix and no padding, and every struct flattens
//! into a record of named string and integer fields, so the encodings
//! stay stable across serialization formats.

use num_bigint::BigInt;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::decryption_share::PartialDecryption;
use crate::paillier::{Ciphertext, PublicKey, SecretKey};
use crate::pub_key::ThresholdPublicKey;
use crate::zk_proof::PartialDecryptionZKP;

fn to_hex(n: &BigInt) -> String {
    format!("{:x}", n)
}

fn from_hex<E: DeError>(hex: &str) -> Result<BigInt, E> {
    BigInt::parse_bytes(hex.as_bytes(), 16)
        .ok_or_else(|| E::custom(format!("cannot decode {:?} as a hexadecimal integer", hex)))
}

fn vec_to_hex(ns: &[BigInt]) -> Vec<String> {
    ns.iter().map(to_hex).collect()
}

fn vec_from_hex<E: DeError>(hexes: &[String]) -> Result<Vec<BigInt>, E> {
    hexes.iter().map(|hex| from_hex(hex)).collect()
}

#[derive(Serialize, Deserialize)]
struct CiphertextRecord {
    c: String,
}

impl Serialize for Ciphertext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CiphertextRecord { c: to_hex(&self.c) }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ciphertext {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = CiphertextRecord::deserialize(deserializer)?;
        Ok(Ciphertext {
            c: from_hex(&record.c)?,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct SecretKeyRecord {
    n: String,
    lambda: String,
}

impl Serialize for SecretKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SecretKeyRecord {
            n: to_hex(&self.public_key.n),
            lambda: to_hex(&self.lambda),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = SecretKeyRecord::deserialize(deserializer)?;
        Ok(SecretKey {
            public_key: PublicKey::new(from_hex(&record.n)?),
            lambda: from_hex(&record.lambda)?,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct ThresholdPublicKeyRecord {
    total_number_of_decryption_servers: usize,
    threshold: usize,
    v: String,
    vi: Vec<String>,
    n: String,
}

impl Serialize for ThresholdPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ThresholdPublicKeyRecord {
            total_number_of_decryption_servers: self.servers,
            threshold: self.threshold,
            v: to_hex(&self.v),
            vi: vec_to_hex(&self.vi),
            n: to_hex(&self.public_key.n),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ThresholdPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = ThresholdPublicKeyRecord::deserialize(deserializer)?;
        Ok(ThresholdPublicKey::new(
            from_hex(&record.n)?,
            record.total_number_of_decryption_servers,
            record.threshold,
            from_hex(&record.v)?,
            vec_from_hex(&record.vi)?,
        ))
    }
}

#[derive(Serialize, Deserialize)]
struct PartialDecryptionZKPRecord {
    z: String,
    e: String,
    c: String,
    v: String,
    n: String,
    vi: Vec<String>,
    decryption: String,
    id: usize,
    total_number_of_decryption_servers: usize,
    threshold: usize,
}

impl Serialize for PartialDecryptionZKP {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PartialDecryptionZKPRecord {
            z: to_hex(&self.z),
            e: to_hex(&self.e),
            c: to_hex(&self.c.c),
            v: to_hex(&self.key.v),
            n: to_hex(&self.key.public_key.n),
            vi: vec_to_hex(&self.key.vi),
            decryption: to_hex(&self.share.decryption),
            id: self.share.id,
            total_number_of_decryption_servers: self.key.servers,
            threshold: self.key.threshold,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PartialDecryptionZKP {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = PartialDecryptionZKPRecord::deserialize(deserializer)?;
        Ok(PartialDecryptionZKP {
            share: PartialDecryption {
                id: record.id,
                decryption: from_hex(&record.decryption)?,
            },
            key: ThresholdPublicKey::new(
                from_hex(&record.n)?,
                record.total_number_of_decryption_servers,
                record.threshold,
                from_hex(&record.v)?,
                vec_from_hex(&record.vi)?,
            ),
            c: Ciphertext {
                c: from_hex(&record.c)?,
            },
            e: from_hex(&record.e)?,
            z: from_hex(&record.z)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn ciphertext_round_trips() {
        let sk = SecretKey::from_primes(&BigInt::from(101), &BigInt::from(113));
        let ct = sk.public_key.encrypt(&BigInt::from(100), &mut OsRng).unwrap();

        let json = serde_json::to_string(&ct).unwrap();
        let back: Ciphertext = serde_json::from_str(&json).unwrap();
        assert_eq!(ct, back);
    }

    #[test]
    fn secret_key_round_trips() {
        let sk = SecretKey::from_primes(&BigInt::from(101), &BigInt::from(113));
        let json = serde_json::to_string(&sk).unwrap();
        let back: SecretKey = serde_json::from_str(&json).unwrap();
        assert_eq!(sk, back);
    }

    #[test]
    fn threshold_public_key_round_trips() {
        let key = ThresholdPublicKey::new(
            BigInt::from(637753i64),
            2,
            2,
            BigInt::from(70661107826i64),
            vec![BigInt::from(77), BigInt::from(67)],
        );
        let json = serde_json::to_string(&key).unwrap();
        let back: ThresholdPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }

    #[test]
    fn partial_decryption_zkp_round_trips() {
        let pd = PartialDecryptionZKP {
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
        };
        let json = serde_json::to_string(&pd).unwrap();
        let back: PartialDecryptionZKP = serde_json::from_str(&json).unwrap();
        assert_eq!(pd, back);
    }

    #[test]
    fn field_names_are_flat_and_stable() {
        let ct = Ciphertext {
            c: BigInt::from(255),
        };
        assert_eq!(serde_json::to_string(&ct).unwrap(), r#"{"c":"ff"}"#);
    }

    #[test]
    fn bad_hex_is_rejected() {
        let err = serde_json::from_str::<Ciphertext>(r#"{"c":"zz"}"#).unwrap_err();
        assert!(err.to_string().contains("hexadecimal"));

        assert!(serde_json::from_str::<Ciphertext>(r#"{"c":""}"#).is_err());
    }
}
