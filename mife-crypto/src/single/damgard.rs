//! Damgård-style DDH inner-product encryption (Agrawal, Libert, Stehlé, ePrint 2015/608).
//!
//! Two generators `g`, `h` and a secret pair `(s_i, t_i)` per slot with
//! `mpk_i = s_i·g + t_i·h`. Ciphertexts are `(r·g, r·h, x_i·g + r·mpk_i)`.

use num_bigint::BigInt;
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::dlog::discrete_log_bound;
use crate::errors::MifeCryptoError;
use crate::group::{Group, export_elems};
use crate::keypair::helper::{check_dimension, export_int, export_vector};
use crate::keypair::{Export, MasterKey};
use crate::ring::{Vector, dot, to_vector};
use crate::sampling::{random_scalar, random_vector};

/// Draws for a second generator distinct from the first.
const GENERATOR_ATTEMPTS: usize = 100;

#[derive(Debug, Clone)]
pub struct DamgardPublic<G: Group> {
    pub group: G,
    pub g: G::Elem,
    pub h: G::Elem,
    pub n: usize,
    pub mpk: Vec<G::Elem>,
}

#[derive(Debug, Clone)]
pub struct DamgardSecret {
    s: Vector,
    t: Vector,
}

pub type DamgardMasterKey<G> = MasterKey<DamgardPublic<G>, DamgardSecret>;

#[derive(Debug, Clone)]
pub struct DamgardFunctionKey {
    pub y: Vector,
    pub sx: BigInt,
    pub tx: BigInt,
}

/// A function key bound to one ciphertext: the blinding terms are precomputed against
/// that ciphertext's randomness and are useless for any other.
#[derive(Debug, Clone)]
pub struct DamgardSafeKey<G: Group> {
    pub y: Vector,
    pub g_r_sx: G::Elem,
    pub h_r_tx: G::Elem,
}

#[derive(Debug, Clone)]
pub struct DamgardCiphertext<G: Group> {
    pub g_r: G::Elem,
    pub h_r: G::Elem,
    pub c: Vec<G::Elem>,
}

pub struct FeDamgard;

impl FeDamgard {
    pub fn generate<G: Group, R: CryptoRng + ?Sized>(
        n: usize,
        group: G,
        rng: &mut R,
    ) -> Result<DamgardMasterKey<G>, MifeCryptoError> {
        if n == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Vector dimension must be positive".into(),
            ));
        }
        let g = group.random_generator(rng);
        let h = (0..GENERATOR_ATTEMPTS)
            .map(|_| group.random_generator(rng))
            .find(|h| *h != g)
            .ok_or_else(|| {
                MifeCryptoError::InvalidParameters(
                    "The group must have at least 2 distinct generators".into(),
                )
            })?;
        let s = random_vector(n, group.order(), rng);
        let t = random_vector(n, group.order(), rng);
        let mpk = s
            .iter()
            .zip(&t)
            .map(|(s_i, t_i)| group.add(&group.scalar_mul(&g, s_i), &group.scalar_mul(&h, t_i)))
            .collect();
        debug!(n, "generated damgard master key");
        Ok(MasterKey::new(
            DamgardPublic { group, g, h, n, mpk },
            DamgardSecret { s, t },
        ))
    }

    pub fn encrypt<G: Group, R: CryptoRng + ?Sized>(
        x: &[i64],
        key: &DamgardMasterKey<G>,
        rng: &mut R,
    ) -> Result<DamgardCiphertext<G>, MifeCryptoError> {
        Self::encrypt_vector(&to_vector(x), key.public(), rng)
    }

    /// Encrypts arbitrary-size integers; values are only meaningful modulo the group order.
    pub(crate) fn encrypt_vector<G: Group, R: CryptoRng + ?Sized>(
        x: &Vector,
        public: &DamgardPublic<G>,
        rng: &mut R,
    ) -> Result<DamgardCiphertext<G>, MifeCryptoError> {
        check_dimension("Encrypt vector", public.n, x.len())?;
        let group = &public.group;
        let r = random_scalar(group.order(), rng);
        let c = x
            .iter()
            .zip(&public.mpk)
            .map(|(x_i, mpk_i)| {
                group.add(&group.scalar_mul(mpk_i, &r), &group.scalar_mul(&public.g, x_i))
            })
            .collect();
        Ok(DamgardCiphertext {
            g_r: group.scalar_mul(&public.g, &r),
            h_r: group.scalar_mul(&public.h, &r),
            c,
        })
    }

    pub fn keygen<G: Group>(
        y: &[i64],
        key: &DamgardMasterKey<G>,
    ) -> Result<DamgardFunctionKey, MifeCryptoError> {
        Self::keygen_vector(to_vector(y), key.public(), key.secret()?)
    }

    pub(crate) fn keygen_vector<G: Group>(
        y: Vector,
        public: &DamgardPublic<G>,
        secret: &DamgardSecret,
    ) -> Result<DamgardFunctionKey, MifeCryptoError> {
        check_dimension("Function vector", public.n, y.len())?;
        let sx = dot(&secret.s, &y)?;
        let tx = dot(&secret.t, &y)?;
        Ok(DamgardFunctionKey { y, sx, tx })
    }

    /// Function key for `y` that only opens `c`.
    pub fn keygen_safe<G: Group>(
        y: &[i64],
        key: &DamgardMasterKey<G>,
        c: &DamgardCiphertext<G>,
    ) -> Result<DamgardSafeKey<G>, MifeCryptoError> {
        Self::keygen_safe_vector(to_vector(y), key.public(), key.secret()?, c)
    }

    pub(crate) fn keygen_safe_vector<G: Group>(
        y: Vector,
        public: &DamgardPublic<G>,
        secret: &DamgardSecret,
        c: &DamgardCiphertext<G>,
    ) -> Result<DamgardSafeKey<G>, MifeCryptoError> {
        let normal = Self::keygen_vector(y, public, secret)?;
        let group = &public.group;
        Ok(DamgardSafeKey {
            g_r_sx: group.scalar_mul(&c.g_r, &normal.sx),
            h_r_tx: group.scalar_mul(&c.h_r, &normal.tx),
            y: normal.y,
        })
    }

    /// `Σ y_i c_i - sx·g_r - tx·h_r`, which is `⟨x, y⟩·g` for a matching key.
    pub(crate) fn combine<G: Group>(
        c: &DamgardCiphertext<G>,
        public: &DamgardPublic<G>,
        sk: &DamgardFunctionKey,
    ) -> Result<G::Elem, MifeCryptoError> {
        check_dimension("Ciphertext", public.n, c.c.len())?;
        let group = &public.group;
        let blinding = group.add(
            &group.scalar_mul(&c.g_r, &sk.sx),
            &group.scalar_mul(&c.h_r, &sk.tx),
        );
        Ok(group.sub(&group.inner_product(&c.c, &sk.y)?, &blinding))
    }

    pub(crate) fn combine_safe<G: Group>(
        c: &DamgardCiphertext<G>,
        public: &DamgardPublic<G>,
        sk: &DamgardSafeKey<G>,
    ) -> Result<G::Elem, MifeCryptoError> {
        check_dimension("Ciphertext", public.n, c.c.len())?;
        let group = &public.group;
        let blinding = group.add(&sk.g_r_sx, &sk.h_r_tx);
        Ok(group.sub(&group.inner_product(&c.c, &sk.y)?, &blinding))
    }

    pub fn decrypt<G: Group, R: CryptoRng + ?Sized>(
        c: &DamgardCiphertext<G>,
        key: &DamgardMasterKey<G>,
        sk: &DamgardFunctionKey,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        let cul = Self::combine(c, public, sk)?;
        discrete_log_bound(&public.group, &cul, &public.g, bound, rng)
    }

    pub fn decrypt_safe<G: Group, R: CryptoRng + ?Sized>(
        c: &DamgardCiphertext<G>,
        key: &DamgardMasterKey<G>,
        sk: &DamgardSafeKey<G>,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        let cul = Self::combine_safe(c, public, sk)?;
        discrete_log_bound(&public.group, &cul, &public.g, bound, rng)
    }
}

impl<G: Group> Export for DamgardPublic<G> {
    fn export(&self) -> Value {
        json!({
            "type": "damgard",
            "group": self.group.export(),
            "g": self.group.export_elem(&self.g),
            "h": self.group.export_elem(&self.h),
            "n": self.n,
            "mpk": export_elems(&self.group, &self.mpk),
        })
    }
}

impl Export for DamgardSecret {
    fn export(&self) -> Value {
        json!({
            "s": export_vector(&self.s),
            "t": export_vector(&self.t),
        })
    }
}

impl Export for DamgardFunctionKey {
    fn export(&self) -> Value {
        json!({
            "y": export_vector(&self.y),
            "sx": export_int(&self.sx),
            "tx": export_int(&self.tx),
        })
    }
}

impl<G: Group> DamgardSafeKey<G> {
    pub fn export(&self, group: &G) -> Value {
        json!({
            "y": export_vector(&self.y),
            "g_r_sx": group.export_elem(&self.g_r_sx),
            "h_r_tx": group.export_elem(&self.h_r_tx),
        })
    }
}

impl<G: Group> DamgardCiphertext<G> {
    pub fn export(&self, group: &G) -> Value {
        json!({
            "g_r": group.export_elem(&self.g_r),
            "h_r": group.export_elem(&self.h_r),
            "c": export_elems(group, &self.c),
        })
    }
}
