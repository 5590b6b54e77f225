//! Selectively secure LWE inner-product encryption (Abdalla et al., ePrint 2015/017).
//!
//! Public `A` (`m×n`) and, per slot, `mpk_i = A·s_i + e_i`. A ciphertext under binary `r`
//! is `(r·A, ⟨mpk_i, r⟩ + Δ·x_i)` with `Δ = round(q/p)`; decryption rounds by `Δ`.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::ToPrimitive;
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::errors::MifeCryptoError;
use crate::keypair::helper::{check_dimension, export_int, export_matrix, export_vector};
use crate::keypair::{Export, MasterKey};
use crate::ring::matrix_ops::{
    inner_product, matrix_vector_mul, scalar_vector_mul, vector_add, vector_matrix_mul,
};
use crate::ring::{Matrix, Ring, Vector, dot, to_vector};
use crate::sampling::{binary_vector, gaussian_vector, random_matrix, random_prime, random_vector};

pub const DEFAULT_SECRET_DIMENSION: usize = 5;

#[derive(Debug, Clone)]
pub struct SelectiveLwePublic {
    pub p: BigUint,
    pub q: BigUint,
    pub l: usize,
    pub n: usize,
    pub m: usize,
    pub delta: BigInt,
    pub a: Matrix,
    pub mpk: Vec<Vector>,
}

#[derive(Debug, Clone)]
pub struct SelectiveLweSecret {
    s: Vec<Vector>,
}

pub type SelectiveLweMasterKey = MasterKey<SelectiveLwePublic, SelectiveLweSecret>;

#[derive(Debug, Clone)]
pub struct SelectiveLweFunctionKey {
    pub y: Vector,
    pub sk: Vector,
}

#[derive(Debug, Clone)]
pub struct SelectiveLweCiphertext {
    pub a_r: Vector,
    pub c: Vector,
}

fn bit_length(v: usize) -> u64 {
    (usize::BITS - v.leading_zeros()) as u64
}

/// `round(a / b)` for `b > 0`, halves rounded up.
fn round_div(a: &BigInt, b: &BigInt) -> BigInt {
    let (quot, rem) = a.div_mod_floor(b);
    if rem * 2u32 >= *b { quot + 1u32 } else { quot }
}

pub struct FeSelectiveLwe;

impl FeSelectiveLwe {
    /// Generates a key for vectors of length `l`, messages of `msg_bit` bits and functions
    /// of `func_bit` bits, with secret dimension `n` ([`DEFAULT_SECRET_DIMENSION`] if unset).
    pub fn generate<R: CryptoRng + ?Sized>(
        l: usize,
        msg_bit: u32,
        func_bit: u32,
        n: Option<usize>,
        rng: &mut R,
    ) -> Result<SelectiveLweMasterKey, MifeCryptoError> {
        if l == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Vector dimension must be positive".into(),
            ));
        }
        let n = n.unwrap_or(DEFAULT_SECRET_DIMENSION);
        let bits = (msg_bit + func_bit) as u64;
        let p = random_prime(bits * 2 + bit_length(l) + 1, rng)?;
        let q = random_prime(p.bits() + bit_length(n) * 2 + bits + bit_length(l) / 2, rng)?;
        let m = 2 * (l + n + 1) * q.bits() as usize + 1;

        let q_int = BigInt::from(q.clone());
        let p_int = BigInt::from(p.clone());
        let delta = round_div(&q_int, &p_int);
        let q_f = q_int.to_f64().unwrap_or(f64::INFINITY);
        let p_f = p_int.to_f64().unwrap_or(f64::INFINITY);
        let sigma =
            q_f / (2f64.powi(func_bit as i32) * p_f * ((2 * l * m * n) as f64).sqrt());

        let ring = Ring::try_with(&q)?;
        let a = random_matrix(m, n, &q, rng);
        let s: Vec<Vector> = (0..l).map(|_| random_vector(n, &q, rng)).collect();
        let mpk = s
            .iter()
            .map(|s_i| {
                let e_i = gaussian_vector(m, sigma, rng)?;
                vector_add(&matrix_vector_mul(&a, s_i, &ring)?, &e_i, &ring)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(l, n, m, q_bits = q.bits(), "generated selective lwe master key");

        Ok(MasterKey::new(
            SelectiveLwePublic {
                p,
                q,
                l,
                n,
                m,
                delta,
                a,
                mpk,
            },
            SelectiveLweSecret { s },
        ))
    }

    pub fn encrypt<R: CryptoRng + ?Sized>(
        x: &[i64],
        key: &SelectiveLweMasterKey,
        rng: &mut R,
    ) -> Result<SelectiveLweCiphertext, MifeCryptoError> {
        let public = key.public();
        check_dimension("Encrypt vector", public.l, x.len())?;
        let ring = Ring::try_with(&public.q)?;
        let r = binary_vector(public.m, rng);
        let a_r = vector_matrix_mul(&r, &public.a, &ring)?;
        let masks = public
            .mpk
            .iter()
            .map(|mpk_i| inner_product(mpk_i, &r, &ring))
            .collect::<Result<Vector, _>>()?;
        let c = vector_add(
            &masks,
            &scalar_vector_mul(&public.delta, &to_vector(x), &ring),
            &ring,
        )?;
        Ok(SelectiveLweCiphertext { a_r, c })
    }

    pub fn keygen(
        y: &[i64],
        key: &SelectiveLweMasterKey,
    ) -> Result<SelectiveLweFunctionKey, MifeCryptoError> {
        let public = key.public();
        check_dimension("Function vector", public.l, y.len())?;
        let secret = key.secret()?;
        let ring = Ring::try_with(&public.q)?;
        let y = to_vector(y);
        let sk = vector_matrix_mul(&y, &secret.s, &ring)?;
        Ok(SelectiveLweFunctionKey { y, sk })
    }

    pub fn decrypt(
        c: &SelectiveLweCiphertext,
        key: &SelectiveLweMasterKey,
        sk: &SelectiveLweFunctionKey,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        check_dimension("Ciphertext", public.l, c.c.len())?;
        check_dimension("Function vector", public.l, sk.y.len())?;
        let ring = Ring::try_with(&public.q)?;
        let t = ring.to_signed(&(dot(&sk.y, &c.c)? - dot(&sk.sk, &c.a_r)?));
        let answer = round_div(&t, &public.delta);
        answer
            .to_i64()
            .ok_or_else(|| MifeCryptoError::InternalError(format!("{} does not fit in i64", answer)))
    }
}

impl Export for SelectiveLwePublic {
    fn export(&self) -> Value {
        json!({
            "type": "selective_lwe",
            "p": self.p.to_string(),
            "q": self.q.to_string(),
            "l": self.l,
            "n": self.n,
            "m": self.m,
            "delta": export_int(&self.delta),
            "A": export_matrix(&self.a),
            "mpk": export_matrix(&self.mpk),
        })
    }
}

impl Export for SelectiveLweSecret {
    fn export(&self) -> Value {
        export_matrix(&self.s)
    }
}

impl Export for SelectiveLweFunctionKey {
    fn export(&self) -> Value {
        json!({
            "y": export_vector(&self.y),
            "sk": export_vector(&self.sk),
        })
    }
}

impl Export for SelectiveLweCiphertext {
    fn export(&self) -> Value {
        json!({
            "a_r": export_vector(&self.a_r),
            "c": export_vector(&self.c),
        })
    }
}
