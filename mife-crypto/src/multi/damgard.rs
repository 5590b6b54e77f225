//! Multi-input Damgård inner-product encryption (Abdalla et al., ePrint 2017/972).
//!
//! Setup samples `a = (1, a1)`, `W ∈ Z^{m×2}` and one one-time-pad row `u_i` per client.
//! Client `i` encrypts `c = (x + u_i)·g + r·(W a)·g` next to `t = r·(a·g)`. The function
//! key `d_i = y_i W`, `z = Σ⟨y_i, u_i⟩` strips both the `r` terms and the pads.

use num_bigint::BigInt;
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::dlog::discrete_log_bound;
use crate::errors::MifeCryptoError;
use crate::group::{Group, export_elems};
use crate::keypair::helper::{check_dimension, check_matrix, export_int, export_matrix};
use crate::keypair::{Export, MasterKey};
use crate::ring::matrix_ops::vector_matrix_mul;
use crate::ring::{Matrix, Ring, Vector, dot, to_matrix, to_vector};
use crate::sampling::{random_matrix, random_scalar};

#[derive(Debug, Clone)]
pub struct DamgardMultiPublic<G: Group> {
    pub group: G,
    pub g: G::Elem,
    pub n: usize,
    pub m: usize,
    /// `a·g`, two elements.
    pub a_g: Vec<G::Elem>,
    /// `(W aᵀ)·g`, one element per slot.
    pub wa_g: Vec<G::Elem>,
}

#[derive(Debug, Clone)]
pub struct DamgardMultiSecret {
    w: Matrix,
    u: Matrix,
}

pub type DamgardMultiMasterKey<G> = MasterKey<DamgardMultiPublic<G>, DamgardMultiSecret>;

/// Client `index`'s encryption key: the public parameters and its pad row.
#[derive(Debug, Clone)]
pub struct DamgardMultiEncKey<G: Group> {
    pub index: usize,
    pub public: DamgardMultiPublic<G>,
    u: Vector,
}

#[derive(Debug, Clone)]
pub struct DamgardMultiFunctionKey {
    pub y: Matrix,
    pub d: Matrix,
    pub z: BigInt,
}

#[derive(Debug, Clone)]
pub struct DamgardMultiCiphertext<G: Group> {
    pub index: usize,
    pub t: Vec<G::Elem>,
    pub c: Vec<G::Elem>,
}

pub struct FeDamgardMulti;

impl FeDamgardMulti {
    pub fn generate<G: Group, R: CryptoRng + ?Sized>(
        n: usize,
        m: usize,
        group: G,
        rng: &mut R,
    ) -> Result<DamgardMultiMasterKey<G>, MifeCryptoError> {
        if n == 0 || m == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Client count and dimension must be positive".into(),
            ));
        }
        let order = group.order().clone();
        let g = group.random_generator(rng);
        let a = vec![BigInt::from(1), random_scalar(&order, rng)];
        let w = random_matrix(m, 2, &order, rng);
        let u = random_matrix(n, m, &order, rng);

        let a_g = a.iter().map(|a_k| group.scalar_mul(&g, a_k)).collect();
        let wa_g = w
            .iter()
            .map(|w_j| Ok(group.scalar_mul(&g, &dot(w_j, &a)?)))
            .collect::<Result<Vec<_>, MifeCryptoError>>()?;
        debug!(n, m, "generated multi-input damgard master key");
        Ok(MasterKey::new(
            DamgardMultiPublic {
                group,
                g,
                n,
                m,
                a_g,
                wa_g,
            },
            DamgardMultiSecret { w, u },
        ))
    }

    /// # Errors
    ///
    /// Fails without the master secret, or when `index` is not a client slot.
    pub fn get_enc_key<G: Group>(
        key: &DamgardMultiMasterKey<G>,
        index: usize,
    ) -> Result<DamgardMultiEncKey<G>, MifeCryptoError> {
        let secret = key.secret()?;
        let public = key.public();
        if index >= public.n {
            return Err(MifeCryptoError::IndexOutOfRange { index, n: public.n });
        }
        Ok(DamgardMultiEncKey {
            index,
            public: public.clone(),
            u: secret.u[index].clone(),
        })
    }

    pub fn encrypt<G: Group, R: CryptoRng + ?Sized>(
        x: &[i64],
        key: &DamgardMultiEncKey<G>,
        rng: &mut R,
    ) -> Result<DamgardMultiCiphertext<G>, MifeCryptoError> {
        let public = &key.public;
        check_dimension("Encrypt vector", public.m, x.len())?;
        let group = &public.group;
        let r = random_scalar(group.order(), rng);
        let t = public.a_g.iter().map(|a_g| group.scalar_mul(a_g, &r)).collect();
        let c = to_vector(x)
            .iter()
            .zip(&key.u)
            .zip(&public.wa_g)
            .map(|((x_j, u_j), wa_j)| {
                group.add(
                    &group.scalar_mul(&public.g, &(x_j + u_j)),
                    &group.scalar_mul(wa_j, &r),
                )
            })
            .collect();
        Ok(DamgardMultiCiphertext {
            index: key.index,
            t,
            c,
        })
    }

    pub fn keygen<G: Group, Y: AsRef<[i64]>>(
        y: &[Y],
        key: &DamgardMultiMasterKey<G>,
    ) -> Result<DamgardMultiFunctionKey, MifeCryptoError> {
        let public = key.public();
        let secret = key.secret()?;
        check_matrix("Function vector", public.n, public.m, y)?;
        let ring = Ring::try_with(public.group.order())?;
        let y = to_matrix(y);
        let d = y
            .iter()
            .map(|y_i| vector_matrix_mul(y_i, &secret.w, &ring))
            .collect::<Result<Vec<_>, _>>()?;
        let z = y
            .iter()
            .zip(&secret.u)
            .map(|(y_i, u_i)| dot(y_i, u_i))
            .sum::<Result<BigInt, _>>()?;
        Ok(DamgardMultiFunctionKey { y, d, z })
    }

    /// Decrypts one ciphertext per client, given in slot order.
    pub fn decrypt<G: Group, R: CryptoRng + ?Sized>(
        cs: &[DamgardMultiCiphertext<G>],
        key: &DamgardMultiMasterKey<G>,
        sk: &DamgardMultiFunctionKey,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        check_dimension("Ciphertext list", public.n, cs.len())?;
        check_dimension("Function key rows", public.n, sk.y.len())?;
        check_dimension("Function key blinding rows", public.n, sk.d.len())?;
        let group = &public.group;
        let mut cul = group.identity();
        for (i, ((c, y_i), d_i)) in cs.iter().zip(&sk.y).zip(&sk.d).enumerate() {
            if c.index != i {
                return Err(MifeCryptoError::IndexMismatch {
                    expected: i,
                    found: c.index,
                });
            }
            let yc = group.inner_product(&c.c, y_i)?;
            let dt = group.inner_product(&c.t, d_i)?;
            cul = group.add(&cul, &group.sub(&yc, &dt));
        }
        let cul = group.sub(&cul, &group.scalar_mul(&public.g, &sk.z));
        discrete_log_bound(group, &cul, &public.g, bound, rng)
    }
}

impl<G: Group> Export for DamgardMultiPublic<G> {
    fn export(&self) -> Value {
        json!({
            "type": "damgard_multi",
            "group": self.group.export(),
            "g": self.group.export_elem(&self.g),
            "n": self.n,
            "m": self.m,
            "a": export_elems(&self.group, &self.a_g),
            "wa": export_elems(&self.group, &self.wa_g),
        })
    }
}

impl Export for DamgardMultiSecret {
    fn export(&self) -> Value {
        json!({
            "w": export_matrix(&self.w),
            "u": export_matrix(&self.u),
        })
    }
}

impl Export for DamgardMultiFunctionKey {
    fn export(&self) -> Value {
        json!({
            "y": export_matrix(&self.y),
            "d": export_matrix(&self.d),
            "z": export_int(&self.z),
        })
    }
}

impl<G: Group> DamgardMultiCiphertext<G> {
    pub fn export(&self, group: &G) -> Value {
        json!({
            "index": self.index,
            "t": export_elems(group, &self.t),
            "c": export_elems(group, &self.c),
        })
    }
}
