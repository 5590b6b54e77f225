//! Simplified Paillier encryption with `g = n + 1`.
//!
//! Additively homomorphic: multiplying ciphertexts adds plaintexts, raising a ciphertext
//! to `k` multiplies its plaintext by `k`.

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::errors::MifeCryptoError;
use crate::keypair::{Export, MasterKey};
use crate::ring::Ring;
use crate::sampling::{is_probable_prime, random_below, random_prime};

/// Public part of a Paillier key: enough to encrypt and to combine ciphertexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaillierPublic {
    n: BigUint,
    n_squared: BigUint,
    g: BigUint,
}

/// Private part of a Paillier key: the Carmichael exponent and its inverse mod `n`.
#[derive(Debug, Clone)]
pub struct PaillierSecret {
    lambda: BigUint,
    mu: BigUint,
}

pub type PaillierKey = MasterKey<PaillierPublic, PaillierSecret>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaillierCiphertext {
    n: BigUint,
    c: BigUint,
}

pub struct Paillier;

impl Paillier {
    /// Generates a key whose primes `p`, `q` each have `bits` bits.
    pub fn generate<R: CryptoRng + ?Sized>(
        bits: u64,
        rng: &mut R,
    ) -> Result<PaillierKey, MifeCryptoError> {
        loop {
            let p = random_prime(bits, rng)?;
            let q = random_prime(bits, rng)?;
            if p == q {
                continue;
            }
            let key = Self::from_primes(&p, &q)?;
            debug!(bits, "generated paillier key");
            return Ok(key);
        }
    }

    /// # Errors
    ///
    /// Returns `MifeCryptoError::NotPrime` if either factor is composite, and
    /// `MifeCryptoError::InvalidParameters` if `p == q` or `gcd(λ, n) != 1`.
    pub fn from_primes(p: &BigUint, q: &BigUint) -> Result<PaillierKey, MifeCryptoError> {
        for factor in [p, q] {
            if !is_probable_prime(factor) {
                return Err(MifeCryptoError::NotPrime(format!("{} is not prime", factor)));
            }
        }
        if p == q {
            return Err(MifeCryptoError::InvalidParameters(
                "Paillier primes must be distinct".into(),
            ));
        }
        let n = p * q;
        let lambda = (p - 1u32).lcm(&(q - 1u32));
        let ring = Ring::try_with(&n)?;
        let mu = ring
            .inv(&BigInt::from_biguint(Sign::Plus, lambda.clone()))
            .map_err(|_| {
                MifeCryptoError::InvalidParameters(
                    "lambda is not invertible mod n, primes are unsuitable".into(),
                )
            })?;
        let public = PaillierPublic {
            n_squared: &n * &n,
            g: &n + 1u32,
            n,
        };
        let secret = PaillierSecret {
            lambda,
            mu: mu.magnitude().clone(),
        };
        Ok(MasterKey::new(public, secret))
    }

    /// # Errors
    ///
    /// Returns `MifeCryptoError::MissingPrivateKey` for a public-only key.
    pub fn decrypt(key: &PaillierKey, ct: &PaillierCiphertext) -> Result<BigUint, MifeCryptoError> {
        let public = key.public();
        let secret = key.secret()?;
        public.check(ct)?;
        let u = ct.c.modpow(&secret.lambda, &public.n_squared);
        let l = (u - 1u32) / &public.n;
        Ok((l * &secret.mu) % &public.n)
    }
}

impl PaillierPublic {
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Encrypts `m` (taken mod `n`) with a fresh unit `r`.
    pub fn encrypt<R: CryptoRng + ?Sized>(&self, m: &BigInt, rng: &mut R) -> PaillierCiphertext {
        let n_signed = BigInt::from_biguint(Sign::Plus, self.n.clone());
        let m = m.mod_floor(&n_signed).magnitude().clone();
        let r = loop {
            let r = random_below(&self.n, rng);
            if !r.is_zero() && r.gcd(&self.n).is_one() {
                break r;
            }
        };
        let c = (self.g.modpow(&m, &self.n_squared) * r.modpow(&self.n, &self.n_squared))
            % &self.n_squared;
        PaillierCiphertext {
            n: self.n.clone(),
            c,
        }
    }

    /// The ciphertext `1`, an encryption of zero with `r = 1`.
    pub fn zero(&self) -> PaillierCiphertext {
        PaillierCiphertext {
            n: self.n.clone(),
            c: BigUint::one(),
        }
    }

    /// Homomorphic addition: `D(add(a, b)) = D(a) + D(b) mod n`.
    pub fn add(
        &self,
        a: &PaillierCiphertext,
        b: &PaillierCiphertext,
    ) -> Result<PaillierCiphertext, MifeCryptoError> {
        self.check(a)?;
        self.check(b)?;
        Ok(PaillierCiphertext {
            n: self.n.clone(),
            c: (&a.c * &b.c) % &self.n_squared,
        })
    }

    /// Homomorphic scalar multiplication: `D(scalar_mul(a, k)) = k·D(a) mod n`.
    pub fn scalar_mul(
        &self,
        a: &PaillierCiphertext,
        k: &BigInt,
    ) -> Result<PaillierCiphertext, MifeCryptoError> {
        self.check(a)?;
        let n_signed = BigInt::from_biguint(Sign::Plus, self.n.clone());
        let k = k.mod_floor(&n_signed).magnitude().clone();
        Ok(PaillierCiphertext {
            n: self.n.clone(),
            c: a.c.modpow(&k, &self.n_squared),
        })
    }

    fn check(&self, ct: &PaillierCiphertext) -> Result<(), MifeCryptoError> {
        if ct.n != self.n {
            return Err(MifeCryptoError::InvalidParameters(
                "Ciphertext was produced under a different Paillier key".into(),
            ));
        }
        Ok(())
    }
}

impl Export for PaillierPublic {
    fn export(&self) -> Value {
        json!({
            "type": "paillier",
            "n": self.n.to_string(),
            "g": self.g.to_string(),
        })
    }
}

impl Export for PaillierSecret {
    fn export(&self) -> Value {
        json!({
            "lambda": self.lambda.to_string(),
            "mu": self.mu.to_string(),
        })
    }
}

impl Export for PaillierCiphertext {
    fn export(&self) -> Value {
        json!({
            "type": "paillier_ciphertext",
            "n": self.n.to_string(),
            "c": self.c.to_string(),
        })
    }
}
