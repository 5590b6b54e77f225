//! BLS12-381 from arkworks, exposed through [`Group`] and [`Pairing`].

use ark_bls12_381::{Bls12_381, Fr, G1Projective, G2Projective};
use ark_ec::pairing::{Pairing as ArkPairing, PairingOutput};
use ark_ec::{CurveGroup, PrimeGroup};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_serialize::CanonicalSerialize;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use num_bigint::{BigInt, BigUint};
use serde_json::{Value, json};

use crate::group::{Group, Pairing};

pub type Bls12GtElem = PairingOutput<Bls12_381>;

fn scalar_order() -> BigUint {
    BigUint::from_bytes_le(&Fr::MODULUS.to_bytes_le())
}

fn to_scalar(k: &BigUint) -> Fr {
    Fr::from_le_bytes_mod_order(&k.to_bytes_le())
}

fn compressed<T: CanonicalSerialize>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    // Writing into a Vec cannot fail.
    let _ = value.serialize_compressed(&mut bytes);
    bytes
}

macro_rules! bls12_group {
    ($name:ident, $elem:ty, $label:literal) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            order: BigUint,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    order: scalar_order(),
                }
            }
        }

        impl Group for $name {
            type Elem = $elem;

            fn order(&self) -> &BigUint {
                &self.order
            }

            fn identity(&self) -> $elem {
                <$elem>::zero()
            }

            fn generator(&self) -> $elem {
                <$elem>::generator()
            }

            fn add(&self, a: &$elem, b: &$elem) -> $elem {
                *a + *b
            }

            fn neg(&self, a: &$elem) -> $elem {
                -*a
            }

            fn scalar_mul(&self, a: &$elem, k: &BigInt) -> $elem {
                *a * to_scalar(&self.reduce(k))
            }

            fn to_bytes(&self, a: &$elem) -> Vec<u8> {
                compressed(a)
            }

            fn export(&self) -> Value {
                json!({ "type": $label })
            }

            fn export_elem(&self, a: &$elem) -> Value {
                json!({
                    "type": $label,
                    "compressed": STANDARD.encode(compressed(a)),
                })
            }
        }
    };
}

bls12_group!(Bls12G1, G1Projective, "bls12_381.G1");
bls12_group!(Bls12G2, G2Projective, "bls12_381.G2");
bls12_group!(Bls12Gt, Bls12GtElem, "bls12_381.GT");

/// The optimal ate pairing on BLS12-381.
#[derive(Debug, Clone, Default)]
pub struct Bls12Pairing {
    g1: Bls12G1,
    g2: Bls12G2,
    gt: Bls12Gt,
}

impl Bls12Pairing {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pairing for Bls12Pairing {
    type G1 = Bls12G1;
    type G2 = Bls12G2;
    type Gt = Bls12Gt;

    fn g1(&self) -> &Bls12G1 {
        &self.g1
    }

    fn g2(&self) -> &Bls12G2 {
        &self.g2
    }

    fn gt(&self) -> &Bls12Gt {
        &self.gt
    }

    fn pairing(&self, a: &G1Projective, b: &G2Projective) -> Bls12GtElem {
        Bls12_381::pairing(a.into_affine(), b.into_affine())
    }

    fn export(&self) -> Value {
        json!({ "type": "bls12_381" })
    }
}
