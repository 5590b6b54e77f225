//! # Group Module
//!
//! Additive-notation abstractions over the prime-order groups every scheme is generic over,
//! plus the concrete instances: [`PrimeGroup`] (quadratic residues mod a safe prime),
//! [`Curve25519`] and the BLS12-381 pairing wrapper.

pub mod bls12_381;
pub mod curve25519;
pub mod prime;

use std::fmt::Debug;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::Zero;
use rand::CryptoRng;
use serde_json::Value;

use crate::errors::MifeCryptoError;
use crate::sampling::random_nonzero_below;

pub use bls12_381::{Bls12G1, Bls12G2, Bls12Gt, Bls12Pairing};
pub use curve25519::{Curve25519, CurvePoint};
pub use prime::PrimeGroup;

/// A cyclic group of public prime order, written additively.
///
/// The group object carries the public context (modulus, curve constants); elements are
/// plain values of [`Group::Elem`].
pub trait Group: Clone + Debug {
    type Elem: Clone + Debug + PartialEq;

    fn order(&self) -> &BigUint;

    fn identity(&self) -> Self::Elem;

    /// Canonical generator.
    fn generator(&self) -> Self::Elem;

    fn add(&self, a: &Self::Elem, b: &Self::Elem) -> Self::Elem;

    fn neg(&self, a: &Self::Elem) -> Self::Elem;

    /// `k·a`, with `k` reduced modulo the group order first. Negative scalars are allowed.
    fn scalar_mul(&self, a: &Self::Elem, k: &BigInt) -> Self::Elem;

    /// Canonical byte encoding, used for hashing.
    fn to_bytes(&self, a: &Self::Elem) -> Vec<u8>;

    fn export(&self) -> Value;

    fn export_elem(&self, a: &Self::Elem) -> Value;

    /// A uniformly random generator. Every non-identity element generates a prime-order group.
    fn random_generator<R: CryptoRng + ?Sized>(&self, rng: &mut R) -> Self::Elem {
        let k = random_nonzero_below(self.order(), rng);
        self.scalar_mul(&self.generator(), &BigInt::from_biguint(Sign::Plus, k))
    }

    fn sub(&self, a: &Self::Elem, b: &Self::Elem) -> Self::Elem {
        self.add(a, &self.neg(b))
    }

    fn mul_generator(&self, k: &BigInt) -> Self::Elem {
        self.scalar_mul(&self.generator(), k)
    }

    /// Reduces a scalar into `[0, order)`.
    fn reduce(&self, k: &BigInt) -> BigUint {
        let order = BigInt::from_biguint(Sign::Plus, self.order().clone());
        k.mod_floor(&order).magnitude().clone()
    }

    fn is_identity(&self, a: &Self::Elem) -> bool {
        *a == self.identity()
    }

    /// `Σ k_i·a_i`.
    fn inner_product(
        &self,
        elems: &[Self::Elem],
        scalars: &[BigInt],
    ) -> Result<Self::Elem, MifeCryptoError> {
        if elems.len() != scalars.len() {
            return Err(MifeCryptoError::DimensionMismatch(format!(
                "Cannot pair {} group elements with {} scalars",
                elems.len(),
                scalars.len()
            )));
        }
        Ok(elems
            .iter()
            .zip(scalars)
            .filter(|(_, k)| !k.is_zero())
            .fold(self.identity(), |acc, (e, k)| {
                self.add(&acc, &self.scalar_mul(e, k))
            }))
    }

    fn sum<'a, I>(&self, elems: I) -> Self::Elem
    where
        I: IntoIterator<Item = &'a Self::Elem>,
        Self::Elem: 'a,
    {
        elems
            .into_iter()
            .fold(self.identity(), |acc, e| self.add(&acc, e))
    }
}

/// A bilinear map `e: G1 × G2 → GT` between groups of the same prime order.
pub trait Pairing: Clone + Debug {
    type G1: Group;
    type G2: Group;
    type Gt: Group;

    fn g1(&self) -> &Self::G1;
    fn g2(&self) -> &Self::G2;
    fn gt(&self) -> &Self::Gt;

    fn order(&self) -> &BigUint {
        self.g1().order()
    }

    fn pairing(
        &self,
        a: &<Self::G1 as Group>::Elem,
        b: &<Self::G2 as Group>::Elem,
    ) -> <Self::Gt as Group>::Elem;

    fn export(&self) -> Value;

    fn identity1(&self) -> <Self::G1 as Group>::Elem {
        self.g1().identity()
    }

    fn identity2(&self) -> <Self::G2 as Group>::Elem {
        self.g2().identity()
    }

    fn identity_t(&self) -> <Self::Gt as Group>::Elem {
        self.gt().identity()
    }

    fn generator1(&self) -> <Self::G1 as Group>::Elem {
        self.g1().generator()
    }

    fn generator2(&self) -> <Self::G2 as Group>::Elem {
        self.g2().generator()
    }

    /// `e(generator1, generator2)`.
    fn generator_t(&self) -> <Self::Gt as Group>::Elem {
        self.pairing(&self.generator1(), &self.generator2())
    }
}

pub type G1Elem<P> = <<P as Pairing>::G1 as Group>::Elem;
pub type G2Elem<P> = <<P as Pairing>::G2 as Group>::Elem;
pub type GtElem<P> = <<P as Pairing>::Gt as Group>::Elem;

/// Exports a list of elements of `group`.
pub fn export_elems<G: Group>(group: &G, elems: &[G::Elem]) -> Value {
    Value::Array(elems.iter().map(|e| group.export_elem(e)).collect())
}
