//! Selectively secure DDH inner-product encryption (Abdalla et al., ePrint 2015/017).
//!
//! `mpk_i = s_i·g`; a ciphertext is `(r·g, x_i·g + r·mpk_i)` and the key for `y` is
//! `⟨s, y⟩`, so `Σ y_i c_i - ⟨s, y⟩·r·g = ⟨x, y⟩·g`.

use num_bigint::BigInt;
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::dlog::discrete_log_bound;
use crate::errors::MifeCryptoError;
use crate::group::{Group, export_elems};
use crate::keypair::helper::{check_dimension, export_int, export_vector, map_vector};
use crate::keypair::{Export, MasterKey};
use crate::ring::{Vector, dot, to_vector};
use crate::sampling::{random_scalar, random_vector};

#[derive(Debug, Clone)]
pub struct DdhPublic<G: Group> {
    pub group: G,
    pub g: G::Elem,
    pub n: usize,
    pub mpk: Vec<G::Elem>,
}

#[derive(Debug, Clone)]
pub struct DdhSecret {
    msk: Vector,
}

pub type DdhMasterKey<G> = MasterKey<DdhPublic<G>, DdhSecret>;

/// Decryption key for one function vector `y`.
#[derive(Debug, Clone)]
pub struct DdhFunctionKey {
    pub y: Vector,
    pub sk: BigInt,
}

#[derive(Debug, Clone)]
pub struct DdhCiphertext<G: Group> {
    pub g_r: G::Elem,
    pub c: Vec<G::Elem>,
}

pub struct FeDdh;

impl FeDdh {
    /// Generates a master key for vectors of length `n` over `group`.
    pub fn generate<G: Group, R: CryptoRng + ?Sized>(
        n: usize,
        group: G,
        rng: &mut R,
    ) -> Result<DdhMasterKey<G>, MifeCryptoError> {
        if n == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Vector dimension must be positive".into(),
            ));
        }
        let g = group.random_generator(rng);
        let msk = random_vector(n, group.order(), rng);
        let mpk = map_vector(&msk, |s| group.scalar_mul(&g, s));
        debug!(n, "generated ddh master key");
        Ok(MasterKey::new(
            DdhPublic { group, g, n, mpk },
            DdhSecret { msk },
        ))
    }

    pub fn encrypt<G: Group, R: CryptoRng + ?Sized>(
        x: &[i64],
        key: &DdhMasterKey<G>,
        rng: &mut R,
    ) -> Result<DdhCiphertext<G>, MifeCryptoError> {
        let public = key.public();
        check_dimension("Encrypt vector", public.n, x.len())?;
        let group = &public.group;
        let r = random_scalar(group.order(), rng);
        let g_r = group.scalar_mul(&public.g, &r);
        let c = x
            .iter()
            .zip(&public.mpk)
            .map(|(&x_i, mpk_i)| {
                group.add(
                    &group.scalar_mul(mpk_i, &r),
                    &group.scalar_mul(&public.g, &BigInt::from(x_i)),
                )
            })
            .collect();
        Ok(DdhCiphertext { g_r, c })
    }

    pub fn keygen<G: Group>(
        y: &[i64],
        key: &DdhMasterKey<G>,
    ) -> Result<DdhFunctionKey, MifeCryptoError> {
        let public = key.public();
        check_dimension("Function vector", public.n, y.len())?;
        let secret = key.secret()?;
        let y = to_vector(y);
        let order = BigInt::from(public.group.order().clone());
        let sk = dot(&secret.msk, &y)? % order;
        Ok(DdhFunctionKey { y, sk })
    }

    /// Recovers `⟨x, y⟩`, which must lie in `bound`.
    pub fn decrypt<G: Group, R: CryptoRng + ?Sized>(
        c: &DdhCiphertext<G>,
        key: &DdhMasterKey<G>,
        sk: &DdhFunctionKey,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        check_dimension("Ciphertext", public.n, c.c.len())?;
        check_dimension("Function vector", public.n, sk.y.len())?;
        let group = &public.group;
        let cul = group.sub(
            &group.inner_product(&c.c, &sk.y)?,
            &group.scalar_mul(&c.g_r, &sk.sk),
        );
        discrete_log_bound(group, &cul, &public.g, bound, rng)
    }
}

impl<G: Group> Export for DdhPublic<G> {
    fn export(&self) -> Value {
        json!({
            "type": "ddh",
            "group": self.group.export(),
            "g": self.group.export_elem(&self.g),
            "n": self.n,
            "mpk": export_elems(&self.group, &self.mpk),
        })
    }
}

impl Export for DdhSecret {
    fn export(&self) -> Value {
        export_vector(&self.msk)
    }
}

impl Export for DdhFunctionKey {
    fn export(&self) -> Value {
        json!({
            "y": export_vector(&self.y),
            "sk": export_int(&self.sk),
        })
    }
}

impl<G: Group> DdhCiphertext<G> {
    pub fn export(&self, group: &G) -> Value {
        json!({
            "g_r": group.export_elem(&self.g_r),
            "c": export_elems(group, &self.c),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{Curve25519, PrimeGroup};
    use num_bigint::BigUint;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn prime_group() -> PrimeGroup {
        PrimeGroup::new(BigUint::from(11881870593822888767u64)).unwrap()
    }

    #[test]
    fn test_inner_product_over_prime_group() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        let x: Vec<i64> = (0..10).collect();
        let y: Vec<i64> = (10..20).collect();
        let key = FeDdh::generate(10, prime_group(), &mut rng)?;
        let c = FeDdh::encrypt(&x, &key, &mut rng)?;
        let sk = FeDdh::keygen(&y, &key)?;
        let public = key.get_public_key();
        assert_eq!(FeDdh::decrypt(&c, &public, &sk, (0, 1000), &mut rng)?, 735);
        Ok(())
    }

    #[test]
    fn test_negative_result_on_curve() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let key = FeDdh::generate(3, Curve25519::new(), &mut rng)?;
        let c = FeDdh::encrypt(&[5, -4, 2], &key, &mut rng)?;
        let sk = FeDdh::keygen(&[-3, 2, 1], &key)?;
        assert_eq!(FeDdh::decrypt(&c, &key, &sk, (-100, 100), &mut rng)?, -21);
        Ok(())
    }

    #[test]
    fn test_keygen_requires_secret_and_dimension() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        let key = FeDdh::generate(2, prime_group(), &mut rng)?;
        assert!(matches!(
            FeDdh::keygen(&[1, 2], &key.get_public_key()),
            Err(MifeCryptoError::MissingPrivateKey)
        ));
        assert!(matches!(
            FeDdh::keygen(&[1, 2, 3], &key),
            Err(MifeCryptoError::DimensionMismatch(_))
        ));
        assert!(FeDdh::encrypt(&[1], &key, &mut rng).is_err());
        assert!(FeDdh::generate(0, prime_group(), &mut rng).is_err());
        Ok(())
    }

    #[test]
    fn test_export() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(13);
        let key = FeDdh::generate(2, prime_group(), &mut rng)?;
        let exported = key.export();
        assert_eq!(exported["mpk"]["n"], 2);
        assert_eq!(exported["msk"].as_array().map(|a| a.len()), Some(2));
        let c = FeDdh::encrypt(&[1, 2], &key, &mut rng)?;
        assert_eq!(c.export(&key.public().group)["c"][1]["type"], "ZmodElem");
        Ok(())
    }
}
