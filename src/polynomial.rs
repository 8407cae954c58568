use num_bigint::BigInt;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::functions::{random_mod, RandomError};

/// Shamir-style hiding polynomial over `Z_max`,
/// `f(X) = a_0 + a_1 X + ... + a_(t-1) X^(t-1)`, with the secret as the
/// constant term and the remaining coefficients drawn uniformly from
/// `[0, max)`.
pub(crate) struct HidingPolynomial {
    coefficients: Vec<BigInt>,
}

impl HidingPolynomial {
    pub fn new<R: RngCore + CryptoRng>(
        secret: BigInt,
        threshold: usize,
        max: &BigInt,
        rng: &mut R,
    ) -> Result<Self, RandomError> {
        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(secret);
        for _ in 1..threshold {
            coefficients.push(random_mod(max, rng)?);
        }
        Ok(HidingPolynomial { coefficients })
    }

    /// Evaluates `f(x) mod modulus`.
    pub fn evaluate(&self, x: usize, modulus: &BigInt) -> BigInt {
        let x = BigInt::from(x);
        let mut result = BigInt::zero();
        let mut x_power = BigInt::one();
        for coefficient in &self.coefficients {
            result += coefficient * &x_power;
            x_power *= &x;
        }
        result % modulus
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }
}

impl Zeroize for HidingPolynomial {
    fn zeroize(&mut self) {
        for coefficient in &mut self.coefficients {
            *coefficient = BigInt::zero();
        }
        self.coefficients.clear();
    }
}

impl Drop for HidingPolynomial {
    fn drop(&mut self) {
        self.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn constant_term_is_the_secret() {
        let max = BigInt::from(1000);
        let f = HidingPolynomial::new(BigInt::from(29), 3, &max, &mut OsRng).unwrap();
        assert_eq!(f.degree(), 2);
        assert_eq!(f.evaluate(0, &max), BigInt::from(29));
    }

    #[test]
    fn evaluation_fixture() {
        let modulus = BigInt::from(103);
        let f = HidingPolynomial {
            coefficients: vec![BigInt::from(29), BigInt::from(88), BigInt::from(51)],
        };
        // f(3) = 29 + 88*3 + 51*9 = 752 = 31 (mod 103)
        assert_eq!(f.evaluate(3, &modulus), BigInt::from(31));
    }

    #[test]
    fn threshold_one_keeps_only_the_secret() {
        let max = BigInt::from(1000);
        let f = HidingPolynomial::new(BigInt::from(7), 1, &max, &mut OsRng).unwrap();
        assert_eq!(f.degree(), 0);
        assert_eq!(f.evaluate(5, &max), BigInt::from(7));
    }
}
