//! Function-hiding inner-product encryption over a pairing: neither ciphertexts nor keys
//! reveal their vectors in the exponent.
//!
//! The secret is an invertible matrix `B` with `B* = det(B)·(B⁻¹)ᵀ`. Ciphertexts live in
//! G2 as `β·(x B*)`, keys in G1 as `α·(y B)`, and `⟨y B, x B*⟩ = det(B)·⟨x, y⟩`.

use num_bigint::BigInt;
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::dlog::discrete_log_bound;
use crate::errors::MifeCryptoError;
use crate::group::{G1Elem, G2Elem, Group, Pairing, export_elems};
use crate::keypair::helper::{check_dimension, export_int, export_matrix, map_vector};
use crate::keypair::{Export, MasterKey};
use crate::ring::matrix_ops::{determinant, scalar_vector_mul, transpose, vector_matrix_mul};
use crate::ring::{Matrix, Ring, to_vector};
use crate::sampling::{random_invertible_matrix, random_nonzero_below};

#[derive(Debug, Clone)]
pub struct FhPublic<P: Pairing> {
    pub pairing: P,
    pub n: usize,
}

#[derive(Debug, Clone)]
pub struct FhSecret {
    b: Matrix,
    b_star: Matrix,
    det: BigInt,
}

pub type FhMasterKey<P> = MasterKey<FhPublic<P>, FhSecret>;

#[derive(Debug, Clone)]
pub struct FhFunctionKey<P: Pairing> {
    pub k1: G1Elem<P>,
    pub k2: Vec<G1Elem<P>>,
}

#[derive(Debug, Clone)]
pub struct FhCiphertext<P: Pairing> {
    pub c1: G2Elem<P>,
    pub c2: Vec<G2Elem<P>>,
}

pub struct FeFunctionHiding;

impl FeFunctionHiding {
    pub fn generate<P: Pairing, R: CryptoRng + ?Sized>(
        n: usize,
        pairing: P,
        rng: &mut R,
    ) -> Result<FhMasterKey<P>, MifeCryptoError> {
        if n == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Vector dimension must be positive".into(),
            ));
        }
        let order = pairing.order();
        let ring = Ring::try_with(order)?;
        let (b, b_inv) = random_invertible_matrix(n, order, rng)?;
        let det = determinant(&b, &ring)?;
        let b_star: Matrix = transpose(&b_inv)?
            .iter()
            .map(|row| scalar_vector_mul(&det, row, &ring))
            .collect();
        debug!(n, "generated function-hiding master key");
        Ok(MasterKey::new(
            FhPublic { pairing, n },
            FhSecret { b, b_star, det },
        ))
    }

    /// Needs the master secret.
    pub fn encrypt<P: Pairing, R: CryptoRng + ?Sized>(
        x: &[i64],
        key: &FhMasterKey<P>,
        rng: &mut R,
    ) -> Result<FhCiphertext<P>, MifeCryptoError> {
        let public = key.public();
        check_dimension("Encrypt vector", public.n, x.len())?;
        let secret = key.secret()?;
        let pairing = &public.pairing;
        let ring = Ring::try_with(pairing.order())?;

        let beta = BigInt::from(random_nonzero_below(pairing.order(), rng));
        let x_b = vector_matrix_mul(&to_vector(x), &secret.b_star, &ring)?;
        let g2 = pairing.g2();
        Ok(FhCiphertext {
            c1: g2.mul_generator(&beta),
            c2: map_vector(&x_b, |v| g2.mul_generator(&(&beta * v))),
        })
    }

    pub fn keygen<P: Pairing, R: CryptoRng + ?Sized>(
        y: &[i64],
        key: &FhMasterKey<P>,
        rng: &mut R,
    ) -> Result<FhFunctionKey<P>, MifeCryptoError> {
        let public = key.public();
        check_dimension("Function vector", public.n, y.len())?;
        let secret = key.secret()?;
        let pairing = &public.pairing;
        let ring = Ring::try_with(pairing.order())?;

        let alpha = BigInt::from(random_nonzero_below(pairing.order(), rng));
        let y_b = vector_matrix_mul(&to_vector(y), &secret.b, &ring)?;
        let g1 = pairing.g1();
        Ok(FhFunctionKey {
            k1: g1.mul_generator(&(&alpha * &secret.det)),
            k2: map_vector(&y_b, |v| g1.mul_generator(&(&alpha * v))),
        })
    }

    pub fn decrypt<P: Pairing, R: CryptoRng + ?Sized>(
        c: &FhCiphertext<P>,
        key: &FhMasterKey<P>,
        sk: &FhFunctionKey<P>,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        check_dimension("Ciphertext", public.n, c.c2.len())?;
        check_dimension("Function key", public.n, sk.k2.len())?;
        let pairing = &public.pairing;
        let gt = pairing.gt();

        let products: Vec<_> = sk
            .k2
            .iter()
            .zip(&c.c2)
            .map(|(k, c)| pairing.pairing(k, c))
            .collect();
        let cul = gt.sum(&products);
        let base = pairing.pairing(&sk.k1, &c.c1);
        discrete_log_bound(gt, &cul, &base, bound, rng)
    }
}

impl<P: Pairing> Export for FhPublic<P> {
    fn export(&self) -> Value {
        json!({
            "type": "function_hiding",
            "pairing": self.pairing.export(),
            "n": self.n,
        })
    }
}

impl Export for FhSecret {
    fn export(&self) -> Value {
        json!({
            "B": export_matrix(&self.b),
            "B_star": export_matrix(&self.b_star),
            "det": export_int(&self.det),
        })
    }
}

impl<P: Pairing> FhFunctionKey<P> {
    pub fn export(&self, pairing: &P) -> Value {
        json!({
            "k1": pairing.g1().export_elem(&self.k1),
            "k2": export_elems(pairing.g1(), &self.k2),
        })
    }
}

impl<P: Pairing> FhCiphertext<P> {
    pub fn export(&self, pairing: &P) -> Value {
        json!({
            "c1": pairing.g2().export_elem(&self.c1),
            "c2": export_elems(pairing.g2(), &self.c2),
        })
    }
}
