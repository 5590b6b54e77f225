//! The subgroup of quadratic residues modulo a safe prime `p = 2q + 1`, of prime order `q`.

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::errors::MifeCryptoError;
use crate::group::Group;
use crate::sampling::{is_probable_prime, random_below, random_safe_prime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeGroup {
    modulus: BigUint,
    order: BigUint,
}

impl PrimeGroup {
    /// Builds the group for a safe prime `p`.
    ///
    /// # Errors
    ///
    /// Returns `MifeCryptoError::NotPrime` if `p` or `(p - 1) / 2` is not prime.
    pub fn new(modulus: BigUint) -> Result<Self, MifeCryptoError> {
        if modulus < BigUint::from(5u32) {
            return Err(MifeCryptoError::InvalidParameters(format!(
                "Modulus {} is too small",
                modulus
            )));
        }
        if !is_probable_prime(&modulus) {
            return Err(MifeCryptoError::NotPrime(format!("{} is not prime", modulus)));
        }
        let order: BigUint = (&modulus - 1u32) >> 1u32;
        if !is_probable_prime(&order) {
            return Err(MifeCryptoError::NotPrime(format!(
                "{} is not a safe prime: (p-1)/2 = {} is composite",
                modulus, order
            )));
        }
        Ok(Self { modulus, order })
    }

    /// Builds a group over a freshly sampled safe prime of `bits` bits.
    pub fn generate<R: CryptoRng + ?Sized>(bits: u64, rng: &mut R) -> Result<Self, MifeCryptoError> {
        let (modulus, order) = random_safe_prime(bits, rng)?;
        debug!(bits, "sampled safe prime group");
        Ok(Self { modulus, order })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Lifts an arbitrary residue into the group by squaring it.
    pub fn from_residue(&self, value: &BigUint) -> Result<BigUint, MifeCryptoError> {
        let elem = value.modpow(&BigUint::from(2u32), &self.modulus);
        if elem.is_zero() {
            return Err(MifeCryptoError::InvalidParameters(format!(
                "{} is not a unit mod {}",
                value, self.modulus
            )));
        }
        Ok(elem)
    }
}

impl Group for PrimeGroup {
    type Elem = BigUint;

    fn order(&self) -> &BigUint {
        &self.order
    }

    fn identity(&self) -> BigUint {
        BigUint::one()
    }

    /// `4 = 2²` is a non-trivial quadratic residue, hence of order `q`.
    fn generator(&self) -> BigUint {
        BigUint::from(4u32)
    }

    fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.modulus
    }

    fn neg(&self, a: &BigUint) -> BigUint {
        a.modpow(&(&self.order - 1u32), &self.modulus)
    }

    fn scalar_mul(&self, a: &BigUint, k: &BigInt) -> BigUint {
        a.modpow(&self.reduce(k), &self.modulus)
    }

    fn to_bytes(&self, a: &BigUint) -> Vec<u8> {
        let width = self.modulus.bits().div_ceil(8) as usize;
        let mut bytes = a.to_bytes_be();
        if bytes.len() < width {
            let mut padded = vec![0u8; width - bytes.len()];
            padded.append(&mut bytes);
            return padded;
        }
        bytes
    }

    fn export(&self) -> Value {
        json!({
            "type": "Zmod",
            "modulus": self.modulus.to_string(),
        })
    }

    fn export_elem(&self, a: &BigUint) -> Value {
        json!({
            "type": "ZmodElem",
            "modulus": self.modulus.to_string(),
            "value": a.to_string(),
        })
    }

    /// Squares a random residue, rejecting the identity.
    fn random_generator<R: CryptoRng + ?Sized>(&self, rng: &mut R) -> BigUint {
        loop {
            let residue = random_below(&self.modulus, rng);
            if let Ok(elem) = self.from_residue(&residue) {
                if !elem.is_one() {
                    return elem;
                }
            }
        }
    }
}
