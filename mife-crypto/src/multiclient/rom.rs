//! Multi-client DDH inner-product encryption in the random-oracle model
//! (Chotard et al., ePrint 2017/989).
//!
//! Client `i` holds pairs `(s1, s2)` for each of its `m` slots and encrypts under a
//! label `tag` hashed to `(u1, u2)`: `c_j = (u1·s1_j + u2·s2_j + x_j)·g`. Ciphertexts are
//! only combinable when they share a tag.

use std::fmt::Debug;

use num_bigint::{BigInt, Sign};
use rand::CryptoRng;
use serde_json::{Value, json};
use sha3::Shake256;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use tracing::debug;

use crate::dlog::discrete_log_bound;
use crate::errors::MifeCryptoError;
use crate::group::{Group, export_elems};
use crate::keypair::helper::{check_dimension, check_matrix, export_int, export_matrix};
use crate::keypair::{Export, MasterKey};
use crate::ring::{Matrix, to_matrix};
use crate::sampling::random_scalar;

/// Maps a tag to the pair `(u1, u2)` of exponents shared by all clients.
pub trait TagHash: Clone + Debug {
    fn hash(&self, tag: &[u8]) -> (BigInt, BigInt);

    fn export(&self) -> Value;
}

/// SHAKE-256 of the tag, `2·maximum_bit` bytes split into two big-endian halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShakeTagHash {
    maximum_bit: u64,
}

impl ShakeTagHash {
    pub fn new(maximum_bit: u64) -> Self {
        Self { maximum_bit }
    }

    /// The default hash for `group`, sized by its order.
    pub fn for_group<G: Group>(group: &G) -> Self {
        Self::new(group.order().bits())
    }
}

impl TagHash for ShakeTagHash {
    fn hash(&self, tag: &[u8]) -> (BigInt, BigInt) {
        let mut hasher = Shake256::default();
        hasher.update(tag);
        let mut reader = hasher.finalize_xof();
        let mut out = vec![0u8; (self.maximum_bit * 2) as usize];
        reader.read(&mut out);
        let (u1, u2) = out.split_at(out.len() / 2);
        (
            BigInt::from_bytes_be(Sign::Plus, u1),
            BigInt::from_bytes_be(Sign::Plus, u2),
        )
    }

    fn export(&self) -> Value {
        json!({
            "type": "default",
            "maximum_bit": self.maximum_bit,
        })
    }
}

/// A pair of per-slot secrets `(s1, s2)`.
pub type SlotSecret = (BigInt, BigInt);

/// `(d1·u1 + d2·u2)·g` for the tag's hash.
pub(crate) fn tag_blinding<G: Group, H: TagHash>(
    group: &G,
    g: &G::Elem,
    hash: &H,
    tag: &[u8],
    d: &(BigInt, BigInt),
) -> G::Elem {
    let (u1, u2) = hash.hash(tag);
    group.add(
        &group.scalar_mul(&group.scalar_mul(g, &u1), &d.0),
        &group.scalar_mul(&group.scalar_mul(g, &u2), &d.1),
    )
}

/// `(u1·s1_j + u2·s2_j + x_j)·g` for every slot.
pub(crate) fn encrypt_slots<G: Group, H: TagHash>(
    x: &[i64],
    tag: &[u8],
    group: &G,
    g: &G::Elem,
    hash: &H,
    secrets: &[SlotSecret],
) -> Vec<G::Elem> {
    let (u1, u2) = hash.hash(tag);
    x.iter()
        .zip(secrets)
        .map(|(&x_j, (s1, s2))| group.scalar_mul(g, &(&u1 * s1 + &u2 * s2 + x_j)))
        .collect()
}

/// `Σ_i ⟨c_i, y_i⟩` after checking every ciphertext carries `tag` and matches `y`.
pub(crate) fn sum_inner_products<G: Group>(
    group: &G,
    cs: &[MultiClientCiphertext<G>],
    y: &Matrix,
    tag: &[u8],
    n: usize,
) -> Result<G::Elem, MifeCryptoError> {
    if cs.len() != n || y.len() != n {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Expected {} ciphertexts and function rows, got {} and {}",
            n,
            cs.len(),
            y.len()
        )));
    }
    if cs.iter().any(|c| c.tag != tag) {
        return Err(MifeCryptoError::TagMismatch);
    }
    let terms = cs
        .iter()
        .zip(y)
        .map(|(c, y_i)| group.inner_product(&c.c, y_i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(group.sum(&terms))
}

#[derive(Debug, Clone)]
pub struct RomPublic<G: Group, H: TagHash = ShakeTagHash> {
    pub group: G,
    pub g: G::Elem,
    pub n: usize,
    pub m: usize,
    pub hash: H,
}

#[derive(Debug, Clone)]
pub struct RomSecret {
    s: Vec<Vec<SlotSecret>>,
}

pub type RomMasterKey<G, H = ShakeTagHash> = MasterKey<RomPublic<G, H>, RomSecret>;

/// Everything client `index` needs to encrypt.
#[derive(Debug, Clone)]
pub struct RomEncKey<G: Group, H: TagHash = ShakeTagHash> {
    pub index: usize,
    pub group: G,
    pub g: G::Elem,
    pub hash: H,
    enc_key: Vec<SlotSecret>,
}

#[derive(Debug, Clone)]
pub struct RomFunctionKey {
    pub y: Matrix,
    pub d: (BigInt, BigInt),
}

/// A function key usable only for ciphertexts labelled with `tag`.
#[derive(Debug, Clone)]
pub struct RomSafeKey<G: Group> {
    pub y: Matrix,
    pub tag: Vec<u8>,
    pub td: (G::Elem, G::Elem),
}

#[derive(Debug, Clone)]
pub struct MultiClientCiphertext<G: Group> {
    pub tag: Vec<u8>,
    pub c: Vec<G::Elem>,
}

pub struct FeDdhMultiClient;

impl FeDdhMultiClient {
    /// Generates a key for `n` clients with `m` slots each, hashing tags with `hash`.
    pub fn generate_with_hash<G: Group, H: TagHash, R: CryptoRng + ?Sized>(
        n: usize,
        m: usize,
        group: G,
        hash: H,
        rng: &mut R,
    ) -> Result<RomMasterKey<G, H>, MifeCryptoError> {
        if n == 0 || m == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Client count and dimension must be positive".into(),
            ));
        }
        let g = group.random_generator(rng);
        let s = (0..n)
            .map(|_| {
                (0..m)
                    .map(|_| {
                        (
                            random_scalar(group.order(), rng),
                            random_scalar(group.order(), rng),
                        )
                    })
                    .collect()
            })
            .collect();
        debug!(n, m, "generated multi-client master key");
        Ok(MasterKey::new(
            RomPublic {
                group,
                g,
                n,
                m,
                hash,
            },
            RomSecret { s },
        ))
    }

    /// [`Self::generate_with_hash`] with the SHAKE-256 tag hash.
    pub fn generate<G: Group, R: CryptoRng + ?Sized>(
        n: usize,
        m: usize,
        group: G,
        rng: &mut R,
    ) -> Result<RomMasterKey<G>, MifeCryptoError> {
        let hash = ShakeTagHash::for_group(&group);
        Self::generate_with_hash(n, m, group, hash, rng)
    }

    pub fn get_enc_key<G: Group, H: TagHash>(
        key: &RomMasterKey<G, H>,
        index: usize,
    ) -> Result<RomEncKey<G, H>, MifeCryptoError> {
        let secret = key.secret()?;
        let public = key.public();
        if index >= public.n {
            return Err(MifeCryptoError::IndexOutOfRange { index, n: public.n });
        }
        Ok(RomEncKey {
            index,
            group: public.group.clone(),
            g: public.g.clone(),
            hash: public.hash.clone(),
            enc_key: secret.s[index].clone(),
        })
    }

    pub fn encrypt<G: Group, H: TagHash>(
        x: &[i64],
        tag: &[u8],
        key: &RomEncKey<G, H>,
    ) -> Result<MultiClientCiphertext<G>, MifeCryptoError> {
        check_dimension("Encrypt vector", key.enc_key.len(), x.len())?;
        Ok(MultiClientCiphertext {
            tag: tag.to_vec(),
            c: encrypt_slots(x, tag, &key.group, &key.g, &key.hash, &key.enc_key),
        })
    }

    pub fn keygen<G: Group, H: TagHash, Y: AsRef<[i64]>>(
        y: &[Y],
        key: &RomMasterKey<G, H>,
    ) -> Result<RomFunctionKey, MifeCryptoError> {
        let public = key.public();
        check_matrix("Function vector", public.n, public.m, y)?;
        let secret = key.secret()?;
        let y = to_matrix(y);
        let order = BigInt::from(public.group.order().clone());
        let (mut d1, mut d2) = (BigInt::from(0), BigInt::from(0));
        for (y_i, s_i) in y.iter().zip(&secret.s) {
            for (y_ij, (s1, s2)) in y_i.iter().zip(s_i) {
                d1 = (d1 + s1 * y_ij) % &order;
                d2 = (d2 + s2 * y_ij) % &order;
            }
        }
        Ok(RomFunctionKey { y, d: (d1, d2) })
    }

    /// Function key bound to `tag`.
    pub fn keygen_safe<G: Group, H: TagHash, Y: AsRef<[i64]>>(
        y: &[Y],
        key: &RomMasterKey<G, H>,
        tag: &[u8],
    ) -> Result<RomSafeKey<G>, MifeCryptoError> {
        let normal = Self::keygen(y, key)?;
        let public = key.public();
        let group = &public.group;
        let (u1, u2) = public.hash.hash(tag);
        let td = (
            group.scalar_mul(&group.scalar_mul(&public.g, &u1), &normal.d.0),
            group.scalar_mul(&group.scalar_mul(&public.g, &u2), &normal.d.1),
        );
        Ok(RomSafeKey {
            y: normal.y,
            tag: tag.to_vec(),
            td,
        })
    }

    pub fn decrypt<G: Group, H: TagHash, R: CryptoRng + ?Sized>(
        cs: &[MultiClientCiphertext<G>],
        tag: &[u8],
        key: &RomMasterKey<G, H>,
        sk: &RomFunctionKey,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        let group = &public.group;
        let cul = sum_inner_products(group, cs, &sk.y, tag, public.n)?;
        let cul = group.sub(&cul, &tag_blinding(group, &public.g, &public.hash, tag, &sk.d));
        discrete_log_bound(group, &cul, &public.g, bound, rng)
    }

    /// Decrypts with a tag-bound key; ciphertexts under any other tag are refused.
    pub fn decrypt_safe<G: Group, H: TagHash, R: CryptoRng + ?Sized>(
        cs: &[MultiClientCiphertext<G>],
        key: &RomMasterKey<G, H>,
        sk: &RomSafeKey<G>,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        let public = key.public();
        let group = &public.group;
        let cul = sum_inner_products(group, cs, &sk.y, &sk.tag, public.n)?;
        let cul = group.sub(&cul, &group.add(&sk.td.0, &sk.td.1));
        discrete_log_bound(group, &cul, &public.g, bound, rng)
    }
}

impl<G: Group, H: TagHash> Export for RomPublic<G, H> {
    fn export(&self) -> Value {
        json!({
            "type": "ddh_multi_client",
            "group": self.group.export(),
            "g": self.group.export_elem(&self.g),
            "n": self.n,
            "m": self.m,
            "hash": self.hash.export(),
        })
    }
}

fn export_slot_secrets(secrets: &[SlotSecret]) -> Value {
    Value::Array(
        secrets
            .iter()
            .map(|(s1, s2)| json!([export_int(s1), export_int(s2)]))
            .collect(),
    )
}

impl Export for RomSecret {
    fn export(&self) -> Value {
        Value::Array(self.s.iter().map(|s_i| export_slot_secrets(s_i)).collect())
    }
}

impl<G: Group, H: TagHash> Export for RomEncKey<G, H> {
    fn export(&self) -> Value {
        json!({
            "index": self.index,
            "g": self.group.export_elem(&self.g),
            "hash": self.hash.export(),
            "enc_key": export_slot_secrets(&self.enc_key),
        })
    }
}

impl Export for RomFunctionKey {
    fn export(&self) -> Value {
        json!({
            "y": export_matrix(&self.y),
            "d": [export_int(&self.d.0), export_int(&self.d.1)],
        })
    }
}

impl<G: Group> RomSafeKey<G> {
    pub fn export(&self, group: &G) -> Value {
        json!({
            "y": export_matrix(&self.y),
            "tag": hex_tag(&self.tag),
            "td": [group.export_elem(&self.td.0), group.export_elem(&self.td.1)],
        })
    }
}

impl<G: Group> MultiClientCiphertext<G> {
    pub fn export(&self, group: &G) -> Value {
        json!({
            "tag": hex_tag(&self.tag),
            "c": export_elems(group, &self.c),
        })
    }
}

fn hex_tag(tag: &[u8]) -> String {
    tag.iter().map(|b| format!("{:02x}", b)).collect()
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

    fn inputs(n: usize, m: usize) -> (Vec<Vec<i64>>, Vec<Vec<i64>>, i64) {
        let x: Vec<Vec<i64>> = (0..n)
            .map(|i| (0..m).map(|j| (i + j) as i64).collect())
            .collect();
        let y: Vec<Vec<i64>> = (0..n)
            .map(|i| (0..m).map(|j| i as i64 - j as i64 + 10).collect())
            .collect();
        let expected = x
            .iter()
            .flatten()
            .zip(y.iter().flatten())
            .map(|(a, b)| a * b)
            .sum();
        (x, y, expected)
    }

    #[test]
    fn test_shake_hash_is_deterministic() {
        let hash = ShakeTagHash::new(64);
        let (u1, u2) = hash.hash(b"tag");
        assert_eq!(hash.hash(b"tag"), (u1.clone(), u2.clone()));
        assert_ne!(u1, u2);
        assert!(u1.bits() <= 512);
        assert_ne!(hash.hash(b"other").0, u1);
        assert_eq!(hash.export()["maximum_bit"], 64);
    }

    #[test]
    fn test_multi_client_decrypt() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(70);
        let (n, m) = (3, 5);
        let (x, y, expected) = inputs(n, m);
        let key = FeDdhMultiClient::generate(n, m, prime_group(), &mut rng)?;
        let tag = b"2024-01";
        let cs = (0..n)
            .map(|i| FeDdhMultiClient::encrypt(&x[i], tag, &FeDdhMultiClient::get_enc_key(&key, i)?))
            .collect::<Result<Vec<_>, _>>()?;
        let sk = FeDdhMultiClient::keygen(&y, &key)?;
        let public = key.get_public_key();
        assert_eq!(
            FeDdhMultiClient::decrypt(&cs, tag, &public, &sk, (0, 2000), &mut rng)?,
            expected
        );
        Ok(())
    }

    #[test]
    fn test_mixed_tags_are_rejected() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(71);
        let key = FeDdhMultiClient::generate(2, 2, Curve25519::new(), &mut rng)?;
        let c0 = FeDdhMultiClient::encrypt(&[1, 2], b"a", &FeDdhMultiClient::get_enc_key(&key, 0)?)?;
        let c1 = FeDdhMultiClient::encrypt(&[3, 4], b"b", &FeDdhMultiClient::get_enc_key(&key, 1)?)?;
        let sk = FeDdhMultiClient::keygen(&[[1i64, 1], [1, 1]], &key)?;
        assert!(matches!(
            FeDdhMultiClient::decrypt(&[c0, c1], b"a", &key, &sk, (0, 100), &mut rng),
            Err(MifeCryptoError::TagMismatch)
        ));
        Ok(())
    }

    #[test]
    fn test_safe_key_is_bound_to_tag() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(72);
        let (n, m) = (2, 3);
        let (x, y, expected) = inputs(n, m);
        let key = FeDdhMultiClient::generate(n, m, prime_group(), &mut rng)?;
        let encrypt_all = |tag: &[u8]| {
            (0..n)
                .map(|i| FeDdhMultiClient::encrypt(&x[i], tag, &FeDdhMultiClient::get_enc_key(&key, i)?))
                .collect::<Result<Vec<_>, MifeCryptoError>>()
        };
        let safe = FeDdhMultiClient::keygen_safe(&y, &key, b"day-1")?;
        let today = encrypt_all(b"day-1")?;
        let tomorrow = encrypt_all(b"day-2")?;
        assert_eq!(
            FeDdhMultiClient::decrypt_safe(&today, &key, &safe, (0, 1000), &mut rng)?,
            expected
        );
        assert!(matches!(
            FeDdhMultiClient::decrypt_safe(&tomorrow, &key, &safe, (0, 1000), &mut rng),
            Err(MifeCryptoError::TagMismatch)
        ));
        Ok(())
    }

    #[test]
    fn test_enc_key_checks() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(73);
        let key = FeDdhMultiClient::generate(2, 2, prime_group(), &mut rng)?;
        assert!(matches!(
            FeDdhMultiClient::get_enc_key(&key, 2),
            Err(MifeCryptoError::IndexOutOfRange { index: 2, n: 2 })
        ));
        assert!(matches!(
            FeDdhMultiClient::get_enc_key(&key.get_public_key(), 0),
            Err(MifeCryptoError::MissingPrivateKey)
        ));
        let enc = FeDdhMultiClient::get_enc_key(&key, 0)?;
        assert!(FeDdhMultiClient::encrypt(&[1], b"t", &enc).is_err());
        assert!(matches!(
            FeDdhMultiClient::keygen(&[[1i64, 1, 1], [1, 1, 1]], &key),
            Err(MifeCryptoError::DimensionMismatch(_))
        ));
        Ok(())
    }
}
