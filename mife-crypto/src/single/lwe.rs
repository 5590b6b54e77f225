//! Adaptively secure LWE inner-product encryption (Agrawal, Libert, Stehlé, ePrint 2015/608).
//!
//! Works over `Z_q` with a uniform public matrix `A` (`m×n`) and a Gaussian secret `Z`
//! (`l×m`), publishing `U = Z·A`. Decryption rounds to the nearest multiple of `⌊q/k⌋`,
//! so no discrete log is needed.

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
    inner_product, matrix_mul, matrix_vector_mul, scalar_vector_mul, vector_add,
    vector_matrix_mul,
};
use crate::ring::{Matrix, Ring, Vector, to_vector};
use crate::sampling::{gaussian_vector, random_matrix, random_prime, random_vector};

/// Smallest secret dimension used when none is given.
const MIN_SECRET_DIMENSION: usize = 64;

#[derive(Debug, Clone)]
pub struct LwePublic {
    pub l: usize,
    pub msg_bit: u32,
    pub func_bit: u32,
    /// Plaintext space `l·2^(msg_bit + func_bit)`.
    pub k: BigInt,
    pub n: usize,
    pub m: usize,
    pub q: BigUint,
    pub a: Matrix,
    pub u: Matrix,
    pub alpha: f64,
}

#[derive(Debug, Clone)]
pub struct LweSecret {
    z: Matrix,
}

pub type LweMasterKey = MasterKey<LwePublic, LweSecret>;

#[derive(Debug, Clone)]
pub struct LweFunctionKey {
    pub y: Vector,
    pub zy: Vector,
}

#[derive(Debug, Clone)]
pub struct LweCiphertext {
    pub c0: Vector,
    pub c1: Vector,
}

fn bit_length(v: usize) -> u64 {
    (usize::BITS - v.leading_zeros()) as u64
}

fn to_f64(v: &BigInt) -> Result<f64, MifeCryptoError> {
    v.to_f64()
        .ok_or_else(|| MifeCryptoError::InternalError(format!("{} does not fit in a f64", v)))
}

impl LwePublic {
    fn ring(&self) -> Result<Ring, MifeCryptoError> {
        Ring::try_with(&self.q)
    }

    fn noise_sigma(&self) -> Result<f64, MifeCryptoError> {
        Ok(self.alpha * to_f64(&BigInt::from(self.q.clone()))?)
    }
}

pub struct FeLwe;

impl FeLwe {
    /// Secret `Z`: row `i` holds `⌊m/2⌋` samples of width `sigma1`, then the rest of width
    /// `sigma2` with `1` added at the `i`-th entry of that second half.
    fn sample_secret<R: CryptoRng + ?Sized>(
        sigma1: f64,
        sigma2: f64,
        l: usize,
        m: usize,
        rng: &mut R,
    ) -> Result<Matrix, MifeCryptoError> {
        let half1 = m / 2;
        let half2 = m - half1;
        if l > half2 {
            return Err(MifeCryptoError::InvalidParameters(format!(
                "Vector length {} exceeds half the lattice dimension {}",
                l, m
            )));
        }
        (0..l)
            .map(|i| {
                let mut row = gaussian_vector(half1, sigma1, rng)?;
                let mut tail = gaussian_vector(half2, sigma2, rng)?;
                tail[i] += BigInt::from(1);
                row.append(&mut tail);
                Ok(row)
            })
            .collect()
    }

    /// Generates a key for vectors of length `l` with entries of at most `msg_bit` bits
    /// (messages) and `func_bit` bits (functions). `n` defaults to `max(l, 64)`.
    pub fn generate<R: CryptoRng + ?Sized>(
        l: usize,
        msg_bit: u32,
        func_bit: u32,
        n: Option<usize>,
        rng: &mut R,
    ) -> Result<LweMasterKey, MifeCryptoError> {
        if l == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Vector dimension must be positive".into(),
            ));
        }
        let k = BigInt::from(l) << (msg_bit + func_bit);
        let n = n.unwrap_or_else(|| l.max(MIN_SECRET_DIMENSION));
        let q = random_prime(k.bits() * 2 + bit_length(n) * 15 + 10, rng)?;
        let q_bits = q.bits();

        let k_f = to_f64(&k)?;
        let alpha = 1.0 / (k_f * k_f * ((n as u64 * q_bits) as f64).powi(7));
        let q_f = to_f64(&BigInt::from(q.clone()))?;
        if q_f < (n as f64).sqrt() / alpha {
            return Err(MifeCryptoError::InvalidParameters(format!(
                "Modulus of {} bits is too small for alpha {}",
                q_bits, alpha
            )));
        }

        let m = n * q_bits as usize;
        let m_f = m as f64;
        let m_bits = bit_length(m) as f64;
        let n_f = n as f64;
        let sigma1 = (n_f * m_bits).sqrt() * m_f.sqrt().max(k_f);
        let sigma2 = (n_f.powi(7) * m_f * m_bits.powi(5)).sqrt() * m_f.max(k_f * k_f);

        let ring = Ring::try_with(&q)?;
        let a = random_matrix(m, n, &q, rng);
        let z = Self::sample_secret(sigma1, sigma2, l, m, rng)?;
        let u = matrix_mul(&z, &a, &ring)?;
        debug!(l, n, m, q_bits, "generated lwe master key");

        Ok(MasterKey::new(
            LwePublic {
                l,
                msg_bit,
                func_bit,
                k,
                n,
                m,
                q,
                a,
                u,
                alpha,
            },
            LweSecret { z },
        ))
    }

    pub fn encrypt<R: CryptoRng + ?Sized>(
        x: &[i64],
        key: &LweMasterKey,
        rng: &mut R,
    ) -> Result<LweCiphertext, MifeCryptoError> {
        let public = key.public();
        check_dimension("Encrypt vector", public.l, x.len())?;
        let ring = public.ring()?;
        let sigma = public.noise_sigma()?;

        let s = random_vector(public.n, &public.q, rng);
        let e0 = gaussian_vector(public.m, sigma, rng)?;
        let e1 = gaussian_vector(public.l, sigma, rng)?;
        let factor = BigInt::from(&public.q / public.k.magnitude());

        let c0 = vector_add(&matrix_vector_mul(&public.a, &s, &ring)?, &e0, &ring)?;
        let c1 = vector_add(
            &vector_add(&matrix_vector_mul(&public.u, &s, &ring)?, &e1, &ring)?,
            &scalar_vector_mul(&factor, &to_vector(x), &ring),
            &ring,
        )?;
        Ok(LweCiphertext { c0, c1 })
    }

    pub fn keygen(y: &[i64], key: &LweMasterKey) -> Result<LweFunctionKey, MifeCryptoError> {
        let public = key.public();
        check_dimension("Function vector", public.l, y.len())?;
        let secret = key.secret()?;
        let y = to_vector(y);
        let zy = vector_matrix_mul(&y, &secret.z, &public.ring()?)?;
        Ok(LweFunctionKey { y, zy })
    }

    /// Recovers `⟨x, y⟩` in `(-k/2, k/2]`.
    pub fn decrypt(
        c: &LweCiphertext,
        key: &LweMasterKey,
        sk: &LweFunctionKey,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        check_dimension("Ciphertext", public.l, c.c1.len())?;
        check_dimension("Ciphertext", public.m, c.c0.len())?;
        let ring = public.ring()?;

        let u = ring.sub(
            &inner_product(&sk.y, &c.c1, &ring)?,
            &inner_product(&sk.zy, &c.c0, &ring)?,
        );
        let factor = BigInt::from(&public.q / public.k.magnitude());
        let (mut answer, rem) = u.div_mod_floor(&factor);
        if rem * 2u32 >= factor {
            answer += 1;
        }
        if answer > &public.k / 2u32 {
            answer -= &public.k;
        }
        answer
            .to_i64()
            .ok_or_else(|| MifeCryptoError::InternalError(format!("{} does not fit in i64", answer)))
    }
}

impl Export for LwePublic {
    fn export(&self) -> Value {
        json!({
            "type": "lwe",
            "l": self.l,
            "msg_bit": self.msg_bit,
            "func_bit": self.func_bit,
            "k": export_int(&self.k),
            "n": self.n,
            "m": self.m,
            "q": self.q.to_string(),
            "alpha": self.alpha,
            "A": export_matrix(&self.a),
            "U": export_matrix(&self.u),
        })
    }
}

impl Export for LweSecret {
    fn export(&self) -> Value {
        export_matrix(&self.z)
    }
}

impl Export for LweFunctionKey {
    fn export(&self) -> Value {
        json!({
            "y": export_vector(&self.y),
            "Zy": export_vector(&self.zy),
        })
    }
}

impl Export for LweCiphertext {
    fn export(&self) -> Value {
        json!({
            "c0": export_vector(&self.c0),
            "c1": export_vector(&self.c1),
        })
    }
}
