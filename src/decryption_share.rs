use num_bigint::BigInt;

/// One server's contribution to a threshold decryption,
/// `c_i = C^(2 * delta * s_i) mod N^2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDecryption {
    /// Identifier of the decryption server, numbered from 1.
    pub id: usize,
    pub decryption: BigInt,
}
