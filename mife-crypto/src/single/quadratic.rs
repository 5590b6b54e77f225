//! Quadratic functional encryption over a pairing: a key for `f` opens
//! `Σ_ij f_ij x_i y_j` from an encryption of `(x, y)`.
//!
//! Each slot blinds `(x_i, γ s_i)` and `(y_j, -t_j)` with a fresh invertible 2×2 matrix
//! `W`, so the pairing of slot `i` from G1 with slot `j` from G2 gives
//! `(x_i y_j - γ s_i t_j)·e(g1, g2)`. The key `(Σ f_ij s_i t_j)·g2` paired with `γ·g1`
//! removes the blinding.

use itertools::iproduct;
use num_bigint::BigInt;
use num_traits::Zero;
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::dlog::discrete_log_bound;
use crate::errors::MifeCryptoError;
use crate::group::{G1Elem, G2Elem, Group, Pairing, export_elems};
use crate::keypair::helper::{
    check_dimension, check_matrix, export_matrix, export_vector, map_vector,
};
use crate::keypair::{Export, MasterKey};
use crate::ring::matrix_ops::{matrix_vector_mul, transpose};
use crate::ring::{Matrix, Ring, Vector, to_matrix};
use crate::sampling::{random_invertible_matrix, random_scalar, random_vector};

#[derive(Debug, Clone)]
pub struct QuadraticPublic<P: Pairing> {
    pub pairing: P,
    pub n: usize,
    /// `s_i·g1`
    pub g1_s: Vec<G1Elem<P>>,
    /// `t_i·g2`
    pub g2_t: Vec<G2Elem<P>>,
}

#[derive(Debug, Clone)]
pub struct QuadraticSecret {
    s: Vector,
    t: Vector,
}

pub type QuadraticMasterKey<P> = MasterKey<QuadraticPublic<P>, QuadraticSecret>;

#[derive(Debug, Clone)]
pub struct QuadraticFunctionKey<P: Pairing> {
    pub f: Matrix,
    pub g2_f: G2Elem<P>,
}

/// One blinded slot: `a·g1` and `b·g2` for the 2-vectors `a`, `b`.
#[derive(Debug, Clone)]
pub struct QuadraticSlot<P: Pairing> {
    pub a: [G1Elem<P>; 2],
    pub b: [G2Elem<P>; 2],
}

#[derive(Debug, Clone)]
pub struct QuadraticCiphertext<P: Pairing> {
    pub g1_gamma: G1Elem<P>,
    pub c: Vec<QuadraticSlot<P>>,
}

pub struct FeQuadratic;

impl FeQuadratic {
    pub fn generate<P: Pairing, R: CryptoRng + ?Sized>(
        n: usize,
        pairing: P,
        rng: &mut R,
    ) -> Result<QuadraticMasterKey<P>, MifeCryptoError> {
        if n == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Vector dimension must be positive".into(),
            ));
        }
        let s = random_vector(n, pairing.order(), rng);
        let t = random_vector(n, pairing.order(), rng);
        let g1_s = map_vector(&s, |s_i| pairing.g1().mul_generator(s_i));
        let g2_t = map_vector(&t, |t_i| pairing.g2().mul_generator(t_i));
        debug!(n, "generated quadratic master key");
        Ok(MasterKey::new(
            QuadraticPublic {
                pairing,
                n,
                g1_s,
                g2_t,
            },
            QuadraticSecret { s, t },
        ))
    }

    /// Encrypts the pair `(x, y)`. Needs the master secret.
    pub fn encrypt<P: Pairing, R: CryptoRng + ?Sized>(
        x: &[i64],
        y: &[i64],
        key: &QuadraticMasterKey<P>,
        rng: &mut R,
    ) -> Result<QuadraticCiphertext<P>, MifeCryptoError> {
        let public = key.public();
        check_dimension("Vector x", public.n, x.len())?;
        check_dimension("Vector y", public.n, y.len())?;
        let secret = key.secret()?;
        let pairing = &public.pairing;
        let order = pairing.order();
        let ring = Ring::try_with(order)?;

        let gamma = random_scalar(order, rng);
        let (w, w_inv) = random_invertible_matrix(2, order, rng)?;
        let w_inv_t = transpose(&w_inv)?;

        let c = (0..public.n)
            .map(|i| {
                let a = matrix_vector_mul(
                    &w_inv_t,
                    &vec![BigInt::from(x[i]), &gamma * &secret.s[i]],
                    &ring,
                )?;
                let b = matrix_vector_mul(&w, &vec![BigInt::from(y[i]), -&secret.t[i]], &ring)?;
                Ok::<_, MifeCryptoError>(QuadraticSlot {
                    a: [pairing.g1().mul_generator(&a[0]), pairing.g1().mul_generator(&a[1])],
                    b: [pairing.g2().mul_generator(&b[0]), pairing.g2().mul_generator(&b[1])],
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuadraticCiphertext {
            g1_gamma: pairing.g1().mul_generator(&gamma),
            c,
        })
    }

    /// Decryption key for the `n×n` coefficient matrix `f`.
    pub fn keygen<P: Pairing, F: AsRef<[i64]>>(
        f: &[F],
        key: &QuadraticMasterKey<P>,
    ) -> Result<QuadraticFunctionKey<P>, MifeCryptoError> {
        let public = key.public();
        check_matrix("Function matrix", public.n, public.n, f)?;
        let secret = key.secret()?;
        let f = to_matrix(f);
        let exponent: BigInt = iproduct!(0..public.n, 0..public.n)
            .map(|(i, j)| &f[i][j] * &secret.s[i] * &secret.t[j])
            .sum();
        Ok(QuadraticFunctionKey {
            g2_f: public.pairing.g2().mul_generator(&exponent),
            f,
        })
    }

    pub fn decrypt<P: Pairing, R: CryptoRng + ?Sized>(
        c: &QuadraticCiphertext<P>,
        key: &QuadraticMasterKey<P>,
        sk: &QuadraticFunctionKey<P>,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        let n = public.n;
        check_dimension("Ciphertext", n, c.c.len())?;
        check_matrix("Function matrix", n, n, &sk.f)?;
        let pairing = &public.pairing;
        let gt = pairing.gt();

        let mut cul = pairing.pairing(&c.g1_gamma, &sk.g2_f);
        for (i, j) in iproduct!(0..n, 0..n) {
            let f_ij = &sk.f[i][j];
            if f_ij.is_zero() {
                continue;
            }
            let term = gt.add(
                &pairing.pairing(&c.c[i].a[0], &c.c[j].b[0]),
                &pairing.pairing(&c.c[i].a[1], &c.c[j].b[1]),
            );
            cul = gt.add(&cul, &gt.scalar_mul(&term, f_ij));
        }
        discrete_log_bound(gt, &cul, &pairing.generator_t(), bound, rng)
    }
}

impl<P: Pairing> Export for QuadraticPublic<P> {
    fn export(&self) -> Value {
        json!({
            "type": "quadratic",
            "pairing": self.pairing.export(),
            "n": self.n,
            "g1_s": export_elems(self.pairing.g1(), &self.g1_s),
            "g2_t": export_elems(self.pairing.g2(), &self.g2_t),
        })
    }
}

impl Export for QuadraticSecret {
    fn export(&self) -> Value {
        json!({
            "s": export_vector(&self.s),
            "t": export_vector(&self.t),
        })
    }
}

impl<P: Pairing> QuadraticFunctionKey<P> {
    pub fn export(&self, pairing: &P) -> Value {
        json!({
            "f": export_matrix(&self.f),
            "g2_f": pairing.g2().export_elem(&self.g2_f),
        })
    }
}

impl<P: Pairing> QuadraticCiphertext<P> {
    pub fn export(&self, pairing: &P) -> Value {
        let slots: Vec<Value> = self
            .c
            .iter()
            .map(|slot| {
                json!({
                    "a": export_elems(pairing.g1(), &slot.a),
                    "b": export_elems(pairing.g2(), &slot.b),
                })
            })
            .collect();
        json!({
            "g1_gamma": pairing.g1().export_elem(&self.g1_gamma),
            "c": slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Bls12Pairing;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_quadratic_form() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(30);
        let n = 2;
        let x = [3, -1];
        let y = [2, 5];
        let f = [[1i64, 2], [0, -4]];
        let key = FeQuadratic::generate(n, Bls12Pairing::new(), &mut rng)?;
        let c = FeQuadratic::encrypt(&x, &y, &key, &mut rng)?;
        let sk = FeQuadratic::keygen(&f, &key)?;
        let expected: i64 = iproduct!(0..n, 0..n)
            .map(|(i, j)| f[i][j] * x[i] * y[j])
            .sum();
        assert_eq!(
            FeQuadratic::decrypt(&c, &key.get_public_key(), &sk, (-100, 100), &mut rng)?,
            expected
        );
        Ok(())
    }

    #[test]
    fn test_encrypt_needs_secret() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(31);
        let key = FeQuadratic::generate(2, Bls12Pairing::new(), &mut rng)?;
        assert!(matches!(
            FeQuadratic::encrypt(&[1, 2], &[3, 4], &key.get_public_key(), &mut rng),
            Err(MifeCryptoError::MissingPrivateKey)
        ));
        assert!(matches!(
            FeQuadratic::keygen(&[[1i64, 2]], &key),
            Err(MifeCryptoError::DimensionMismatch(_))
        ));
        Ok(())
    }

    #[test]
    fn test_ragged_function_key_is_rejected() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(32);
        let key = FeQuadratic::generate(2, Bls12Pairing::new(), &mut rng)?;
        let c = FeQuadratic::encrypt(&[1, 2], &[3, 4], &key, &mut rng)?;
        let mut sk = FeQuadratic::keygen(&[[1i64, 2], [3, 4]], &key)?;
        sk.f[1] = vec![BigInt::from(2)];
        assert!(matches!(
            FeQuadratic::decrypt(&c, &key, &sk, (-100, 100), &mut rng),
            Err(MifeCryptoError::DimensionMismatch(_))
        ));
        Ok(())
    }
}
