//! Randomness used by key generation and encryption.
//!
//! Every sampler takes the caller's RNG explicitly; nothing here keeps global state.

use num_bigint::{BigInt, BigUint, Sign};
use num_prime::nt_funcs::is_prime;
use num_traits::{FromPrimitive, One, Zero};
use rand::{CryptoRng, RngCore};
use rand_distr::{Distribution, Normal};

use crate::errors::MifeCryptoError;
use crate::ring::matrix_ops::matrix_inverse;
use crate::ring::{Matrix, Ring, Vector};

/// Uniform integer in `[0, bound)`, by rejection sampling on the bit length of `bound`.
pub fn random_below<R: CryptoRng + ?Sized>(bound: &BigUint, rng: &mut R) -> BigUint {
    if bound.is_zero() {
        return BigUint::zero();
    }
    let bits = bound.bits();
    let len = bits.div_ceil(8) as usize;
    let excess = (len as u64 * 8 - bits) as u32;
    let mut buf = vec![0u8; len];
    loop {
        rng.fill_bytes(&mut buf);
        buf[0] &= 0xffu8 >> excess;
        let candidate = BigUint::from_bytes_be(&buf);
        if &candidate < bound {
            return candidate;
        }
    }
}

/// Uniform integer in `[1, bound)`.
pub fn random_nonzero_below<R: CryptoRng + ?Sized>(bound: &BigUint, rng: &mut R) -> BigUint {
    loop {
        let v = random_below(bound, rng);
        if !v.is_zero() {
            return v;
        }
    }
}

/// Uniform integer of exactly `bits` bits.
pub fn random_bits<R: CryptoRng + ?Sized>(bits: u64, rng: &mut R) -> BigUint {
    if bits == 0 {
        return BigUint::zero();
    }
    let top = BigUint::one() << (bits - 1);
    top.clone() + random_below(&top, rng)
}

/// Uniform scalar in `[0, bound)` as a signed integer, ready for group operations.
pub fn random_scalar<R: CryptoRng + ?Sized>(bound: &BigUint, rng: &mut R) -> BigInt {
    BigInt::from_biguint(Sign::Plus, random_below(bound, rng))
}

pub fn random_vector<R: CryptoRng + ?Sized>(len: usize, bound: &BigUint, rng: &mut R) -> Vector {
    (0..len).map(|_| random_scalar(bound, rng)).collect()
}

pub fn random_matrix<R: CryptoRng + ?Sized>(
    rows: usize,
    cols: usize,
    bound: &BigUint,
    rng: &mut R,
) -> Matrix {
    (0..rows)
        .map(|_| random_vector(cols, bound, rng))
        .collect()
}

/// Uniform invertible `n×n` matrix over `Z_modulus`, returned with its inverse.
pub fn random_invertible_matrix<R: CryptoRng + ?Sized>(
    n: usize,
    modulus: &BigUint,
    rng: &mut R,
) -> Result<(Matrix, Matrix), MifeCryptoError> {
    let ring = Ring::try_with(modulus)?;
    loop {
        let candidate = random_matrix(n, n, modulus, rng);
        match matrix_inverse(&candidate, &ring) {
            Ok(inverse) => return Ok((candidate, inverse)),
            Err(MifeCryptoError::NotInvertible(_)) => continue,
            Err(e) => return Err(e),
        }
    }
}

pub fn is_probable_prime(n: &BigUint) -> bool {
    is_prime(n, None).probably()
}

/// Random prime of exactly `bits` bits.
pub fn random_prime<R: CryptoRng + ?Sized>(
    bits: u64,
    rng: &mut R,
) -> Result<BigUint, MifeCryptoError> {
    if bits < 2 {
        return Err(MifeCryptoError::InvalidParameters(format!(
            "A prime needs at least 2 bits, got {}",
            bits
        )));
    }
    loop {
        let candidate = random_bits(bits, rng) | BigUint::one();
        if candidate.bits() == bits && is_probable_prime(&candidate) {
            return Ok(candidate);
        }
    }
}

/// Random safe prime `p = 2q + 1` of exactly `bits` bits, returned as `(p, q)`.
pub fn random_safe_prime<R: CryptoRng + ?Sized>(
    bits: u64,
    rng: &mut R,
) -> Result<(BigUint, BigUint), MifeCryptoError> {
    if bits < 3 {
        return Err(MifeCryptoError::InvalidParameters(format!(
            "A safe prime needs at least 3 bits, got {}",
            bits
        )));
    }
    let three = BigUint::from(3u32);
    loop {
        let q = random_bits(bits - 1, rng) | BigUint::one();
        // q = 1 mod 3 makes 2q + 1 divisible by 3
        if bits > 4 && (&q % &three).is_one() {
            continue;
        }
        if !is_probable_prime(&q) {
            continue;
        }
        let p: BigUint = (&q << 1u32) + 1u32;
        if is_probable_prime(&p) {
            return Ok((p, q));
        }
    }
}

/// Integer drawn from a rounded normal distribution with mean 0.
pub fn gaussian<R: CryptoRng + ?Sized>(sigma: f64, rng: &mut R) -> Result<BigInt, MifeCryptoError> {
    let normal = Normal::new(0.0, sigma).map_err(|e| {
        MifeCryptoError::InvalidParameters(format!("Invalid standard deviation {}: {}", sigma, e))
    })?;
    let value = normal.sample(rng).round();
    BigInt::from_f64(value).ok_or_else(|| {
        MifeCryptoError::InternalError(format!("Gaussian sample {} is not finite", value))
    })
}

pub fn gaussian_vector<R: CryptoRng + ?Sized>(
    len: usize,
    sigma: f64,
    rng: &mut R,
) -> Result<Vector, MifeCryptoError> {
    let normal = Normal::new(0.0, sigma).map_err(|e| {
        MifeCryptoError::InvalidParameters(format!("Invalid standard deviation {}: {}", sigma, e))
    })?;
    (0..len)
        .map(|_| {
            let value = normal.sample(rng).round();
            BigInt::from_f64(value).ok_or_else(|| {
                MifeCryptoError::InternalError(format!("Gaussian sample {} is not finite", value))
            })
        })
        .collect()
}

/// Vector with independent uniform entries in `{0, 1}`.
pub fn binary_vector<R: CryptoRng + ?Sized>(len: usize, rng: &mut R) -> Vector {
    let two = BigUint::from(2u32);
    (0..len).map(|_| random_scalar(&two, rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::matrix_ops::{identity_matrix, matrix_mul};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_random_below_stays_in_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let bound = BigUint::from(1000u32);
        for _ in 0..500 {
            assert!(random_below(&bound, &mut rng) < bound);
        }
        assert!(random_below(&BigUint::zero(), &mut rng).is_zero());
    }

    #[test]
    fn test_random_bits_has_exact_length() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        for bits in [1u64, 7, 8, 9, 64, 130] {
            assert_eq!(random_bits(bits, &mut rng).bits(), bits);
        }
    }

    #[test]
    fn test_random_prime() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let p = random_prime(64, &mut rng)?;
        assert_eq!(p.bits(), 64);
        assert!(is_probable_prime(&p));
        assert!(random_prime(1, &mut rng).is_err());
        Ok(())
    }

    #[test]
    fn test_random_safe_prime() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let (p, q) = random_safe_prime(48, &mut rng)?;
        assert_eq!(p.bits(), 48);
        assert_eq!(p, (&q << 1u32) + 1u32);
        assert!(is_probable_prime(&p) && is_probable_prime(&q));
        Ok(())
    }

    #[test]
    fn test_gaussian_is_centered() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let samples = gaussian_vector(2000, 3.0, &mut rng)?;
        let sum: BigInt = samples.iter().sum();
        assert!(sum.magnitude() < &BigUint::from(600u32));
        assert!(gaussian(-1.0, &mut rng).is_err());
        Ok(())
    }

    #[test]
    fn test_random_invertible_matrix() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let modulus = BigUint::from(101u32);
        let ring = Ring::try_with(&modulus)?;
        for n in 1..5 {
            let (m, inv) = random_invertible_matrix(n, &modulus, &mut rng)?;
            assert_eq!(matrix_mul(&m, &inv, &ring)?, identity_matrix(n));
        }
        Ok(())
    }

    #[test]
    fn test_binary_vector() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let v = binary_vector(64, &mut rng);
        assert!(v.iter().all(|b| b.is_zero() || b.is_one()));
    }
}
