use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RandomError {
    #[error("random byte source failed: {0}")]
    RngFailure(#[from] rand::Error),
}

/// Returns a uniformly random integer in `[0, n)`.
///
/// Bits above the length of `n` are masked off before the rejection test,
/// so the expected number of redraws is below two.
pub fn random_mod<R: RngCore + CryptoRng>(n: &BigInt, rng: &mut R) -> Result<BigInt, RandomError> {
    debug_assert!(n > &BigInt::zero());

    let bits = n.bits();
    let len = ((bits + 7) / 8) as usize;
    let excess = (len as u64 * 8 - bits) as u32;
    let mut bytes = vec![0u8; len];

    loop {
        rng.try_fill_bytes(&mut bytes)?;
        bytes[0] &= 0xff >> excess;
        let r = BigInt::from_bytes_be(Sign::Plus, &bytes);
        if &r < n {
            return Ok(r);
        }
    }
}

/// Returns a random element of `Z*_n`, the group of integers modulo `n`
/// that have a multiplicative inverse.
///
/// Samples by rejection: a draw equal to zero or sharing a factor with
/// `n` is thrown away and redrawn.
pub fn random_in_mult_group<R: RngCore + CryptoRng>(
    n: &BigInt,
    rng: &mut R,
) -> Result<BigInt, RandomError> {
    loop {
        let r = random_mod(n, rng)?;
        if !r.is_zero() && n.gcd(&r).is_one() {
            return Ok(r);
        }
    }
}

/// Returns a random generator of the quadratic-residue subgroup of `Z*_n`
/// with high probability. THIS HEURISTIC ONLY WORKS IF `n` IS THE PRODUCT
/// OF TWO SAFE PRIMES. It is the sampling used for the verification-key
/// generator in Shoup's threshold-signature construction.
pub fn random_qr_generator<R: RngCore + CryptoRng>(
    n: &BigInt,
    rng: &mut R,
) -> Result<BigInt, RandomError> {
    let r = random_in_mult_group(n, rng)?;
    Ok((&r * &r) % n)
}

/// Returns `k! = k * (k-1) * ... * 2 * 1`.
pub fn factorial(k: usize) -> BigInt {
    let mut ret = BigInt::one();
    for i in 1..=k {
        ret *= BigInt::from(i);
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn random_mod_stays_in_range() {
        let n = BigInt::from(1u8) << 256;
        let r1 = random_mod(&n, &mut OsRng).unwrap();
        let r2 = random_mod(&n, &mut OsRng).unwrap();
        assert!(r1 >= BigInt::zero() && r1 < n);
        assert!(r2 >= BigInt::zero() && r2 < n);
        assert_ne!(r1, r2, "two 256-bit draws collided");
    }

    #[test]
    fn random_mod_handles_non_byte_aligned_modulus() {
        let n = BigInt::from(1000);
        for _ in 0..100 {
            let r = random_mod(&n, &mut OsRng).unwrap();
            assert!(r < n);
        }
    }

    #[test]
    fn mult_group_elements_are_invertible() {
        let n = BigInt::from(2 * 3 * 5 * 7);
        for _ in 0..100 {
            let r = random_in_mult_group(&n, &mut OsRng).unwrap();
            assert!(!r.is_zero());
            assert!(n.gcd(&r).is_one());
        }
    }

    #[test]
    fn qr_generator_is_a_square() {
        // 23 and 47 are safe primes.
        let n = BigInt::from(23 * 47);
        let n_squared = &n * &n;
        for _ in 0..10 {
            let v = random_qr_generator(&n_squared, &mut OsRng).unwrap();
            assert!(v < n_squared);
            assert!(!v.is_zero());
        }
    }

    #[test]
    fn factorial_small_values() {
        assert_eq!(factorial(0), BigInt::from(1));
        assert_eq!(factorial(1), BigInt::from(1));
        assert_eq!(factorial(5), BigInt::from(120));
        assert_eq!(factorial(6), BigInt::from(720));
    }
}
