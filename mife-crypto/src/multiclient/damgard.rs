//! Multi-client inner-product encryption from single-input Damgård IPFE and a correlated
//! PRF (Abdalla et al., ePrint 2019/487).
//!
//! One Damgård instance covers all `n·m` slots. Client `i` writes its vector into block
//! `i` of an otherwise zero vector and adds CPRF masks evaluated on the tag; the masks of
//! all clients sum to zero, so only the aggregate inner product survives decryption.

use num_bigint::BigInt;
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::cprf::{Cprf, CprfPartyKey};
use crate::dlog::discrete_log_bound;
use crate::errors::MifeCryptoError;
use crate::group::Group;
use crate::keypair::helper::{check_dimension, check_matrix};
use crate::keypair::{Export, MasterKey};
use crate::ring::Vector;
use crate::ring::matrix_ops::flatten;
use crate::ring::to_matrix;
use crate::single::damgard::{
    DamgardCiphertext, DamgardFunctionKey, DamgardPublic, DamgardSafeKey, DamgardSecret,
    FeDamgard,
};

#[derive(Debug, Clone)]
pub struct DamgardMultiClientPublic<G: Group> {
    pub n: usize,
    pub m: usize,
    pub ipfe: DamgardPublic<G>,
}

#[derive(Debug, Clone)]
pub struct DamgardMultiClientSecret {
    ipfe: DamgardSecret,
    cprf: Cprf,
}

pub type DamgardMultiClientMasterKey<G> =
    MasterKey<DamgardMultiClientPublic<G>, DamgardMultiClientSecret>;

/// Client `index`'s CPRF keys.
#[derive(Debug, Clone)]
pub struct DamgardMultiClientEncKey {
    pub index: usize,
    enc_key: CprfPartyKey,
}

#[derive(Debug, Clone)]
pub struct DamgardMultiClientFunctionKey {
    pub k: DamgardFunctionKey,
}

/// One safe Damgård key per client ciphertext.
#[derive(Debug, Clone)]
pub struct DamgardMultiClientSafeKey<G: Group> {
    pub k: Vec<DamgardSafeKey<G>>,
}

#[derive(Debug, Clone)]
pub struct DamgardMultiClientCiphertext<G: Group> {
    pub tag: Vec<u8>,
    pub index: usize,
    pub c: DamgardCiphertext<G>,
}

/// CPRF input for mask position `i`: the tag followed by `-i`.
fn mask_input(tag: &[u8], i: usize) -> Vec<u8> {
    let mut input = tag.to_vec();
    input.extend_from_slice(format!("-{}", i).as_bytes());
    input
}

fn check_ciphertexts<G: Group>(
    cs: &[DamgardMultiClientCiphertext<G>],
    n: usize,
) -> Result<(), MifeCryptoError> {
    check_dimension("Ciphertext list", n, cs.len())?;
    if let Some(first) = cs.first() {
        if cs.iter().any(|c| c.tag != first.tag) {
            return Err(MifeCryptoError::TagMismatch);
        }
    }
    for (expected, c) in cs.iter().enumerate() {
        if c.index != expected {
            return Err(MifeCryptoError::IndexMismatch {
                expected,
                found: c.index,
            });
        }
    }
    Ok(())
}

pub struct FeDamgardMultiClient;

impl FeDamgardMultiClient {
    pub fn generate<G: Group, R: CryptoRng + ?Sized>(
        n: usize,
        m: usize,
        group: G,
        rng: &mut R,
    ) -> Result<DamgardMultiClientMasterKey<G>, MifeCryptoError> {
        if n == 0 || m == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Client count and dimension must be positive".into(),
            ));
        }
        let cprf = Cprf::setup(n, rng);
        let MasterKey::KeyPair { public, secret } = FeDamgard::generate(n * m, group, rng)? else {
            return Err(MifeCryptoError::InternalError(
                "Freshly generated key has no secret".into(),
            ));
        };
        debug!(n, m, "generated damgard multi-client master key");
        Ok(MasterKey::new(
            DamgardMultiClientPublic {
                n,
                m,
                ipfe: public,
            },
            DamgardMultiClientSecret {
                ipfe: secret,
                cprf,
            },
        ))
    }

    pub fn get_enc_key<G: Group>(
        key: &DamgardMultiClientMasterKey<G>,
        index: usize,
    ) -> Result<DamgardMultiClientEncKey, MifeCryptoError> {
        let secret = key.secret()?;
        Ok(DamgardMultiClientEncKey {
            index,
            enc_key: secret.cprf.keygen(index)?,
        })
    }

    pub fn encrypt<G: Group, R: CryptoRng + ?Sized>(
        x: &[i64],
        tag: &[u8],
        key: &DamgardMultiClientEncKey,
        public: &DamgardMultiClientMasterKey<G>,
        rng: &mut R,
    ) -> Result<DamgardMultiClientCiphertext<G>, MifeCryptoError> {
        let public = public.public();
        check_dimension("Encrypt vector", public.m, x.len())?;
        let (n, m) = (public.n, public.m);
        if key.index >= n {
            return Err(MifeCryptoError::IndexOutOfRange { index: key.index, n });
        }
        let length = (public.ipfe.group.order().bits() / 8) as usize;

        let mut padded: Vector = vec![BigInt::from(0); n * m];
        for (slot, &x_j) in padded[key.index * m..(key.index + 1) * m].iter_mut().zip(x) {
            *slot = BigInt::from(x_j);
        }
        for (i, slot) in padded.iter_mut().enumerate() {
            *slot += key.enc_key.eval(&mask_input(tag, i), length)?;
        }

        Ok(DamgardMultiClientCiphertext {
            tag: tag.to_vec(),
            index: key.index,
            c: FeDamgard::encrypt_vector(&padded, &public.ipfe, rng)?,
        })
    }

    pub fn keygen<G: Group, Y: AsRef<[i64]>>(
        y: &[Y],
        key: &DamgardMultiClientMasterKey<G>,
    ) -> Result<DamgardMultiClientFunctionKey, MifeCryptoError> {
        let public = key.public();
        check_matrix("Function vector", public.n, public.m, y)?;
        let secret = key.secret()?;
        let k = FeDamgard::keygen_vector(flatten(&to_matrix(y)), &public.ipfe, &secret.ipfe)?;
        Ok(DamgardMultiClientFunctionKey { k })
    }

    /// Function key whose per-client parts are bound to the ciphertexts `cs`.
    pub fn keygen_safe<G: Group, Y: AsRef<[i64]>>(
        y: &[Y],
        key: &DamgardMultiClientMasterKey<G>,
        cs: &[DamgardMultiClientCiphertext<G>],
    ) -> Result<DamgardMultiClientSafeKey<G>, MifeCryptoError> {
        let public = key.public();
        check_matrix("Function vector", public.n, public.m, y)?;
        check_ciphertexts(cs, public.n)?;
        let secret = key.secret()?;
        let flat = flatten(&to_matrix(y));
        let k = cs
            .iter()
            .map(|c| FeDamgard::keygen_safe_vector(flat.clone(), &public.ipfe, &secret.ipfe, &c.c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DamgardMultiClientSafeKey { k })
    }

    pub fn decrypt<G: Group, R: CryptoRng + ?Sized>(
        cs: &[DamgardMultiClientCiphertext<G>],
        key: &DamgardMultiClientMasterKey<G>,
        sk: &DamgardMultiClientFunctionKey,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        check_ciphertexts(cs, public.n)?;
        let group = &public.ipfe.group;
        let parts = cs
            .iter()
            .map(|c| FeDamgard::combine(&c.c, &public.ipfe, &sk.k))
            .collect::<Result<Vec<_>, _>>()?;
        discrete_log_bound(group, &group.sum(&parts), &public.ipfe.g, bound, rng)
    }

    pub fn decrypt_safe<G: Group, R: CryptoRng + ?Sized>(
        cs: &[DamgardMultiClientCiphertext<G>],
        key: &DamgardMultiClientMasterKey<G>,
        sk: &DamgardMultiClientSafeKey<G>,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        check_ciphertexts(cs, public.n)?;
        check_dimension("Safe key", public.n, sk.k.len())?;
        let group = &public.ipfe.group;
        let parts = cs
            .iter()
            .zip(&sk.k)
            .map(|(c, k)| FeDamgard::combine_safe(&c.c, &public.ipfe, k))
            .collect::<Result<Vec<_>, _>>()?;
        discrete_log_bound(group, &group.sum(&parts), &public.ipfe.g, bound, rng)
    }
}

impl<G: Group> Export for DamgardMultiClientPublic<G> {
    fn export(&self) -> Value {
        json!({
            "type": "damgard_multi_client",
            "n": self.n,
            "m": self.m,
            "ipfe": self.ipfe.export(),
        })
    }
}

impl Export for DamgardMultiClientSecret {
    fn export(&self) -> Value {
        // CPRF keys stay with the key holder.
        json!({
            "ipfe": self.ipfe.export(),
            "parties": self.cprf.parties(),
        })
    }
}

impl Export for DamgardMultiClientEncKey {
    fn export(&self) -> Value {
        json!({
            "index": self.index,
            "enc_key": self.enc_key.export(),
        })
    }
}

impl Export for DamgardMultiClientFunctionKey {
    fn export(&self) -> Value {
        json!({ "k": self.k.export() })
    }
}

impl<G: Group> DamgardMultiClientCiphertext<G> {
    pub fn export(&self, group: &G) -> Value {
        json!({
            "tag": String::from_utf8_lossy(&self.tag),
            "index": self.index,
            "c": self.c.export(group),
        })
    }
}
