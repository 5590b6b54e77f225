//! Implementation of ring ops using modular arithmetic over arbitrary precision integers.

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::errors::MifeCryptoError;

/// Represents a finite ring Z_q using modular arithmetic.
///
/// Elements are plain [`BigInt`]s; every operation returns a representative in `[0, q)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    modulus: BigInt,
}

impl Ring {
    /// Create a new Ring with the given modulus.
    ///
    /// The modulus must be greater than 1.
    pub fn try_with(modulus: &BigUint) -> Result<Self, MifeCryptoError> {
        if *modulus <= BigUint::one() {
            return Err(MifeCryptoError::InvalidParameters(format!(
                "Modulus must be greater than 1, got {}",
                modulus
            )));
        }

        Ok(Ring {
            modulus: BigInt::from_biguint(Sign::Plus, modulus.clone()),
        })
    }

    /// Returns the modulus of the ring.
    ///
    /// # Example
    ///
    /// ```
    /// # use mife_crypto::ring::Ring;
    /// # use num_bigint::{BigInt, BigUint};
    /// let ring = Ring::try_with(&BigUint::from(13u32)).unwrap();
    /// assert_eq!(ring.modulus(), &BigInt::from(13));
    /// ```
    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    /// Normalizes a value to be within the range `[0, modulus - 1]`.
    ///
    /// # Example
    ///
    /// ```
    /// # use mife_crypto::ring::Ring;
    /// # use num_bigint::{BigInt, BigUint};
    /// let ring = Ring::try_with(&BigUint::from(10u32)).unwrap();
    /// assert_eq!(ring.normalize(&BigInt::from(15)), BigInt::from(5));
    /// assert_eq!(ring.normalize(&BigInt::from(-3)), BigInt::from(7));
    /// ```
    pub fn normalize(&self, value: &BigInt) -> BigInt {
        value.mod_floor(&self.modulus)
    }

    /// Maps a value into the symmetric range `(-q/2, q/2]`.
    pub fn to_signed(&self, value: &BigInt) -> BigInt {
        let v = self.normalize(value);
        if v > &self.modulus / 2u32 {
            v - &self.modulus
        } else {
            v
        }
    }

    pub fn from_i64(&self, value: i64) -> BigInt {
        self.normalize(&BigInt::from(value))
    }

    /// Computes `(a + b) mod modulus`.
    pub fn add(&self, a: &BigInt, b: &BigInt) -> BigInt {
        self.normalize(&(a + b))
    }

    /// Computes `(a - b) mod modulus`.
    pub fn sub(&self, a: &BigInt, b: &BigInt) -> BigInt {
        self.normalize(&(a - b))
    }

    /// Computes `(a * b) mod modulus`.
    pub fn mul(&self, a: &BigInt, b: &BigInt) -> BigInt {
        self.normalize(&(a * b))
    }

    /// Computes the additive inverse `-a mod modulus`.
    pub fn neg(&self, a: &BigInt) -> BigInt {
        self.normalize(&-a)
    }

    /// Computes the modular multiplicative inverse `a^-1 mod modulus`.
    ///
    /// # Errors
    ///
    /// Returns `MifeCryptoError::NotInvertible` if `gcd(a, modulus) != 1`, including `a = 0`.
    pub fn inv(&self, a: &BigInt) -> Result<BigInt, MifeCryptoError> {
        let a_norm = self.normalize(a);
        if a_norm.is_zero() {
            return Err(MifeCryptoError::NotInvertible(format!(
                "Cannot invert 0 in mod {}",
                self.modulus
            )));
        }

        let egcd = a_norm.extended_gcd(&self.modulus);
        if !egcd.gcd.is_one() {
            return Err(MifeCryptoError::NotInvertible(format!(
                "Modular inverse does not exist for {} mod {} (gcd={})",
                a_norm, self.modulus, egcd.gcd
            )));
        }

        Ok(self.normalize(&egcd.x))
    }

    pub fn is_unit(&self, a: &BigInt) -> bool {
        let a_norm = self.normalize(a);
        !a_norm.is_zero() && a_norm.gcd(&self.modulus).is_one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(modulus: u32) -> Result<Ring, MifeCryptoError> {
        Ring::try_with(&BigUint::from(modulus))
    }

    fn big(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn test_ring_creation() {
        assert!(ring(11).is_ok());
        assert!(ring(25).is_ok());
        assert!(ring(1).is_err());
        assert!(ring(0).is_err());
    }

    #[test]
    fn test_element_normalization() -> Result<(), MifeCryptoError> {
        let ring = ring(11)?;
        assert_eq!(ring.normalize(&big(5)), big(5));
        assert_eq!(ring.normalize(&big(16)), big(5));
        assert_eq!(ring.normalize(&big(-6)), big(5));
        Ok(())
    }

    #[test]
    fn test_arithmetic() -> Result<(), MifeCryptoError> {
        let ring = ring(11)?;
        assert_eq!(ring.add(&big(5), &big(8)), big(2));
        assert_eq!(ring.sub(&big(5), &big(8)), big(8));
        assert_eq!(ring.mul(&big(-2), &big(8)), big(6));
        assert_eq!(ring.neg(&big(5)), big(6));
        assert_eq!(ring.neg(&big(0)), big(0));
        Ok(())
    }

    #[test]
    fn test_inversion() -> Result<(), MifeCryptoError> {
        let ring = ring(11)?;
        assert_eq!(ring.inv(&big(5))?, big(9));
        assert!(matches!(
            ring.inv(&big(22)),
            Err(MifeCryptoError::NotInvertible(_))
        ));

        let composite = Ring::try_with(&BigUint::from(10u32))?;
        assert_eq!(composite.inv(&big(3))?, big(7));
        assert!(composite.inv(&big(2)).is_err());
        assert!(!composite.is_unit(&big(5)));
        Ok(())
    }

    #[test]
    fn test_signed_representative() -> Result<(), MifeCryptoError> {
        let ring = ring(11)?;
        assert_eq!(ring.to_signed(&big(5)), big(5));
        assert_eq!(ring.to_signed(&big(6)), big(-5));
        assert_eq!(ring.to_signed(&big(-1)), big(-1));
        Ok(())
    }

    #[quickcheck_macros::quickcheck]
    fn prop_inverse_multiplies_to_one(a: i64) -> bool {
        let ring = Ring::try_with(&BigUint::from(1_000_003u32)).unwrap();
        match ring.inv(&BigInt::from(a)) {
            Ok(inv) => ring.mul(&inv, &BigInt::from(a)).is_one(),
            Err(_) => ring.normalize(&BigInt::from(a)).is_zero(),
        }
    }
}
