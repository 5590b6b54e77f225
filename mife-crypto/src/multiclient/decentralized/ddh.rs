//! Decentralized multi-client DDH inner-product encryption (Chotard et al., ePrint 2019/020).
//!
//! Parties agree on pairwise keys by P-256 Diffie-Hellman, then derive CPRF shares of zero
//! for an epoch. Each party's partial function key adds its own secrets to its shares;
//! summing all partial keys cancels the shares and yields the usual multi-client key.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use p256::{PublicKey, SecretKey};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha3::Shake256;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use tracing::{debug, trace};

use crate::cprf::{CprfKey, CprfPartyKey, KEY_LEN};
use crate::dlog::discrete_log_bound;
use crate::errors::MifeCryptoError;
use crate::group::Group;
use crate::keypair::Export;
use crate::keypair::helper::{check_dimension, check_matrix, export_int, export_matrix};
use crate::multiclient::rom::{
    MultiClientCiphertext, ShakeTagHash, SlotSecret, TagHash, encrypt_slots, sum_inner_products,
    tag_blinding,
};
use crate::ring::{Matrix, to_matrix};
use crate::sampling::random_scalar;

/// Where a party stands in the setup protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyState {
    /// Some pairwise keys are still missing.
    Uninitialized,
    /// Every pairwise key is known; no shares yet.
    KeyExchanged,
    /// Shares for `epoch` are ready and partial keys can be issued.
    ShareGenerated { epoch: u64 },
}

/// Public parameters every party agrees on.
#[derive(Debug, Clone)]
pub struct DecentralizedPublic<G: Group, H: TagHash = ShakeTagHash> {
    pub group: G,
    pub g: G::Elem,
    pub n: usize,
    pub m: usize,
    pub hash: H,
}

/// One party's private state.
#[derive(Debug, Clone)]
pub struct DecentralizedParty<G: Group, H: TagHash = ShakeTagHash> {
    pub public: DecentralizedPublic<G, H>,
    pub index: usize,
    sk: Vec<SlotSecret>,
    exchange_secret: SecretKey,
    exchange_keys: CprfPartyKey,
    share: Vec<Vec<SlotSecret>>,
    state: PartyState,
}

/// One party's contribution to the function key for `y`.
#[derive(Debug, Clone)]
pub struct DecentralizedPartialKey {
    pub index: usize,
    pub y: Matrix,
    pub d: (BigInt, BigInt),
    pub epoch: u64,
}

/// SHAKE-256 of the Diffie-Hellman secret, truncated to a CPRF key.
fn kdf(shared: &[u8]) -> CprfKey {
    let mut hasher = Shake256::default();
    hasher.update(shared);
    let mut reader = hasher.finalize_xof();
    let mut key = [0u8; KEY_LEN];
    reader.read(&mut key);
    key
}

/// Minimal big-endian encoding, with zero encoded as a single zero byte.
fn int_bytes(v: u64) -> Vec<u8> {
    BigUint::from(v).to_bytes_be()
}

fn random_exchange_secret<R: CryptoRng + ?Sized>(rng: &mut R) -> SecretKey {
    let mut bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut bytes);
        // Rejects zero and values above the curve order.
        if let Ok(secret) = SecretKey::from_slice(&bytes) {
            return secret;
        }
    }
}

fn random_slot_secrets<G: Group, R: CryptoRng + ?Sized>(
    group: &G,
    m: usize,
    rng: &mut R,
) -> Vec<SlotSecret> {
    (0..m)
        .map(|_| {
            (
                random_scalar(group.order(), rng),
                random_scalar(group.order(), rng),
            )
        })
        .collect()
}

impl<G: Group, H: TagHash> DecentralizedPublic<G, H> {
    /// Creates party `index` with fresh slot secrets and a fresh exchange key pair.
    pub fn generate_party<R: CryptoRng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
    ) -> Result<DecentralizedParty<G, H>, MifeCryptoError> {
        if index >= self.n {
            return Err(MifeCryptoError::IndexOutOfRange { index, n: self.n });
        }
        let exchange_keys = CprfPartyKey::empty(index, self.n)?;
        let state = if exchange_keys.is_complete() {
            PartyState::KeyExchanged
        } else {
            PartyState::Uninitialized
        };
        Ok(DecentralizedParty {
            public: self.clone(),
            index,
            sk: random_slot_secrets(&self.group, self.m, rng),
            exchange_secret: random_exchange_secret(rng),
            exchange_keys,
            share: Vec::new(),
            state,
        })
    }
}

impl<G: Group, H: TagHash> DecentralizedParty<G, H> {
    pub fn state(&self) -> PartyState {
        self.state
    }

    pub fn get_exc_public_key(&self) -> PublicKey {
        self.exchange_secret.public_key()
    }

    /// Re-samples this party's slot secrets. Earlier ciphertexts and partial keys become
    /// unusable together with new ones.
    pub fn regenerate_secret<R: CryptoRng + ?Sized>(&mut self, rng: &mut R) {
        self.sk = random_slot_secrets(&self.public.group, self.public.m, rng);
    }

    /// Derives the key shared with party `index` from its exchange public key.
    pub fn exchange(&mut self, index: usize, peer: &PublicKey) -> Result<(), MifeCryptoError> {
        let n = self.public.n;
        if index >= n {
            return Err(MifeCryptoError::IndexOutOfRange { index, n });
        }
        if index == self.index {
            return Err(MifeCryptoError::InvalidParameters(
                "A party cannot exchange keys with itself".into(),
            ));
        }
        let shared =
            p256::ecdh::diffie_hellman(self.exchange_secret.to_nonzero_scalar(), peer.as_affine());
        self.exchange_keys
            .set(index, kdf(shared.raw_secret_bytes().as_slice()))?;

        // Any change of pairwise keys invalidates shares derived from the old ones.
        self.share.clear();
        self.state = if self.exchange_keys.is_complete() {
            PartyState::KeyExchanged
        } else {
            PartyState::Uninitialized
        };
        trace!(party = self.index, peer = index, state = ?self.state, "exchanged key");
        Ok(())
    }

    /// Replaces the share table with CPRF shares of zero for `epoch`, reduced into
    /// `[0, order)`.
    pub fn generate_share(&mut self, epoch: u64) -> Result<(), MifeCryptoError> {
        if self.state == PartyState::Uninitialized {
            return Err(MifeCryptoError::InvalidState(format!(
                "party {} must exchange keys with every peer before generating shares",
                self.index
            )));
        }
        let (n, m) = (self.public.n, self.public.m);
        let order = BigInt::from(self.public.group.order().clone());
        let length = (self.public.group.order().bits() / 8) as usize;
        let epoch_bytes = int_bytes(epoch);

        let eval = |label: u8, position: u64| -> Result<BigInt, MifeCryptoError> {
            let mut input = vec![label];
            input.extend_from_slice(&epoch_bytes);
            input.extend_from_slice(&int_bytes(position));
            Ok(self.exchange_keys.eval(&input, length)?.mod_floor(&order))
        };
        let share = (0..n)
            .map(|i| {
                (0..m)
                    .map(|j| {
                        let position = (i * m + j) as u64;
                        Ok((eval(b'a', position)?, eval(b'b', position)?))
                    })
                    .collect::<Result<Vec<_>, MifeCryptoError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.share = share;
        self.state = PartyState::ShareGenerated { epoch };
        debug!(party = self.index, epoch, "generated shares");
        Ok(())
    }

    /// The current epoch, if shares are ready.
    pub fn epoch(&self) -> Result<u64, MifeCryptoError> {
        match self.state {
            PartyState::ShareGenerated { epoch } => Ok(epoch),
            _ => Err(MifeCryptoError::InvalidState(format!(
                "party {} has no shares, call generate_share first",
                self.index
            ))),
        }
    }

    /// `(Σ_j s_j·y[index][j] + Σ_ij share_ij·y_ij)` computed over any additive domain:
    /// plain integers or Paillier ciphertexts of `y`.
    pub(crate) fn partial_sums<T, E>(
        &self,
        y: &[Vec<T>],
        mut scale: impl FnMut(&T, &BigInt) -> Result<E, MifeCryptoError>,
        mut add: impl FnMut(E, E) -> Result<E, MifeCryptoError>,
        zero: impl Fn() -> E,
    ) -> Result<(E, E), MifeCryptoError> {
        let mut d0 = zero();
        let mut d1 = zero();
        for (y_j, (s1, s2)) in y[self.index].iter().zip(&self.sk) {
            d0 = add(d0, scale(y_j, s1)?)?;
            d1 = add(d1, scale(y_j, s2)?)?;
        }
        for (y_i, share_i) in y.iter().zip(&self.share) {
            for (y_ij, (v1, v2)) in y_i.iter().zip(share_i) {
                d0 = add(d0, scale(y_ij, v1)?)?;
                d1 = add(d1, scale(y_ij, v2)?)?;
            }
        }
        Ok((d0, d1))
    }
}

pub struct FeDecentralizedDdh;

impl FeDecentralizedDdh {
    pub fn generate_with_hash<G: Group, H: TagHash, R: CryptoRng + ?Sized>(
        n: usize,
        m: usize,
        group: G,
        hash: H,
        rng: &mut R,
    ) -> Result<DecentralizedPublic<G, H>, MifeCryptoError> {
        if n == 0 || m == 0 {
            return Err(MifeCryptoError::InvalidParameters(
                "Client count and dimension must be positive".into(),
            ));
        }
        let g = group.random_generator(rng);
        Ok(DecentralizedPublic {
            group,
            g,
            n,
            m,
            hash,
        })
    }

    pub fn generate<G: Group, R: CryptoRng + ?Sized>(
        n: usize,
        m: usize,
        group: G,
        rng: &mut R,
    ) -> Result<DecentralizedPublic<G>, MifeCryptoError> {
        let hash = ShakeTagHash::for_group(&group);
        Self::generate_with_hash(n, m, group, hash, rng)
    }

    /// Encrypts with the party's own slot secrets; no shares are needed.
    pub fn encrypt<G: Group, H: TagHash>(
        x: &[i64],
        tag: &[u8],
        party: &DecentralizedParty<G, H>,
    ) -> Result<MultiClientCiphertext<G>, MifeCryptoError> {
        check_dimension("Encrypt vector", party.sk.len(), x.len())?;
        let public = &party.public;
        Ok(MultiClientCiphertext {
            tag: tag.to_vec(),
            c: encrypt_slots(x, tag, &public.group, &public.g, &public.hash, &party.sk),
        })
    }

    /// The party's partial function key for the `n×m` matrix `y`.
    pub fn keygen<G: Group, H: TagHash, Y: AsRef<[i64]>>(
        y: &[Y],
        party: &DecentralizedParty<G, H>,
    ) -> Result<DecentralizedPartialKey, MifeCryptoError> {
        let public = &party.public;
        check_matrix("Function vector", public.n, public.m, y)?;
        let epoch = party.epoch()?;
        let y = to_matrix(y);
        let d = party.partial_sums(
            &y,
            |y_ij, s| Ok(y_ij * s),
            |a, b| Ok(a + b),
            || BigInt::from(0),
        )?;
        Ok(DecentralizedPartialKey {
            index: party.index,
            y,
            d,
            epoch,
        })
    }

    /// Decrypts with exactly one partial key from every party, all for the same epoch and `y`.
    pub fn decrypt<G: Group, H: TagHash, R: CryptoRng + ?Sized>(
        cs: &[MultiClientCiphertext<G>],
        tag: &[u8],
        public: &DecentralizedPublic<G, H>,
        sk: &[DecentralizedPartialKey],
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        check_dimension("Partial key list", public.n, sk.len())?;
        let Some(first) = sk.first() else {
            return Err(MifeCryptoError::InvalidParameters("No partial keys".into()));
        };
        let mut seen = vec![false; public.n];
        for k in sk {
            let slot = seen.get_mut(k.index).ok_or(MifeCryptoError::IndexOutOfRange {
                index: k.index,
                n: public.n,
            })?;
            if std::mem::replace(slot, true) {
                return Err(MifeCryptoError::InvalidParameters(format!(
                    "Duplicate partial key from party {}",
                    k.index
                )));
            }
        }
        if sk.iter().any(|k| k.epoch != first.epoch) {
            return Err(MifeCryptoError::EpochMismatch);
        }
        if sk.iter().any(|k| k.y != first.y) {
            return Err(MifeCryptoError::InvalidParameters(
                "Partial keys were issued for different function vectors".into(),
            ));
        }
        let d = sk.iter().fold((BigInt::from(0), BigInt::from(0)), |acc, k| {
            (acc.0 + &k.d.0, acc.1 + &k.d.1)
        });

        let group = &public.group;
        let cul = sum_inner_products(group, cs, &first.y, tag, public.n)?;
        let cul = group.sub(&cul, &tag_blinding(group, &public.g, &public.hash, tag, &d));
        discrete_log_bound(group, &cul, &public.g, bound, rng)
    }
}

impl<G: Group, H: TagHash> Export for DecentralizedPublic<G, H> {
    fn export(&self) -> Value {
        json!({
            "type": "ddh_multi_client_decentralized",
            "group": self.group.export(),
            "g": self.group.export_elem(&self.g),
            "n": self.n,
            "m": self.m,
            "hash": self.hash.export(),
        })
    }
}

/// Only the party's position and progress; secrets and pairwise keys stay private.
impl<G: Group, H: TagHash> Export for DecentralizedParty<G, H> {
    fn export(&self) -> Value {
        json!({
            "index": self.index,
            "state": self.state,
            "exchanged": self.exchange_keys.export(),
        })
    }
}

impl Export for DecentralizedPartialKey {
    fn export(&self) -> Value {
        json!({
            "index": self.index,
            "y": export_matrix(&self.y),
            "d": [export_int(&self.d.0), export_int(&self.d.1)],
            "epoch": self.epoch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::PrimeGroup;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn prime_group() -> PrimeGroup {
        PrimeGroup::new(BigUint::from(11881870593822888767u64)).unwrap()
    }

    fn setup(
        n: usize,
        m: usize,
        rng: &mut ChaCha20Rng,
    ) -> Result<(DecentralizedPublic<PrimeGroup>, Vec<DecentralizedParty<PrimeGroup>>), MifeCryptoError>
    {
        let public = FeDecentralizedDdh::generate(n, m, prime_group(), rng)?;
        let mut parties = (0..n)
            .map(|i| public.generate_party(i, rng))
            .collect::<Result<Vec<_>, _>>()?;
        let keys: Vec<PublicKey> = parties.iter().map(|p| p.get_exc_public_key()).collect();
        for party in parties.iter_mut() {
            for (j, key) in keys.iter().enumerate() {
                if j != party.index {
                    party.exchange(j, key)?;
                }
            }
        }
        Ok((public, parties))
    }

    #[test]
    fn test_int_bytes() {
        assert_eq!(int_bytes(0), vec![0u8]);
        assert_eq!(int_bytes(256), vec![1u8, 0]);
    }

    #[test]
    fn test_exchanged_keys_agree() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(90);
        let (_, parties) = setup(3, 1, &mut rng)?;
        let total = parties
            .iter()
            .map(|p| p.exchange_keys.eval(b"x", 16))
            .sum::<Result<BigInt, _>>()?;
        assert_eq!(total, BigInt::from(0));
        assert!(parties.iter().all(|p| p.state() == PartyState::KeyExchanged));
        Ok(())
    }

    #[test]
    fn test_decentralized_flow() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(91);
        let (n, m) = (3, 2);
        let (public, mut parties) = setup(n, m, &mut rng)?;
        for party in parties.iter_mut() {
            party.generate_share(7)?;
        }
        let x = [[1i64, 2], [3, 4], [5, 6]];
        let y = [[1i64, -1], [2, 0], [0, 3]];
        let tag = b"epoch-7";
        let cs = parties
            .iter()
            .zip(&x)
            .map(|(p, x_i)| FeDecentralizedDdh::encrypt(x_i, tag, p))
            .collect::<Result<Vec<_>, _>>()?;
        let sk = parties
            .iter()
            .map(|p| FeDecentralizedDdh::keygen(&y, p))
            .collect::<Result<Vec<_>, _>>()?;
        // -1 + 6 + 18
        assert_eq!(
            FeDecentralizedDdh::decrypt(&cs, tag, &public, &sk, (-100, 100), &mut rng)?,
            23
        );
        Ok(())
    }

    #[test]
    fn test_state_machine() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(92);
        let public = FeDecentralizedDdh::generate(2, 1, prime_group(), &mut rng)?;
        let mut p0 = public.generate_party(0, &mut rng)?;
        let p1 = public.generate_party(1, &mut rng)?;
        assert!(public.generate_party(2, &mut rng).is_err());

        assert_eq!(p0.state(), PartyState::Uninitialized);
        assert!(matches!(p0.generate_share(0), Err(MifeCryptoError::InvalidState(_))));
        assert!(matches!(
            FeDecentralizedDdh::keygen(&[[1i64], [1]], &p0),
            Err(MifeCryptoError::InvalidState(_))
        ));
        assert!(p0.exchange(0, &p1.get_exc_public_key()).is_err());
        assert!(p0.exchange(5, &p1.get_exc_public_key()).is_err());

        p0.exchange(1, &p1.get_exc_public_key())?;
        assert_eq!(p0.state(), PartyState::KeyExchanged);
        p0.generate_share(0)?;
        assert_eq!(p0.state(), PartyState::ShareGenerated { epoch: 0 });
        p0.generate_share(1)?;
        assert_eq!(p0.epoch()?, 1);

        let exported = p0.export();
        assert_eq!(
            serde_json::from_value::<PartyState>(exported["state"].clone())?,
            PartyState::ShareGenerated { epoch: 1 }
        );
        assert!(exported.get("sk").is_none());
        Ok(())
    }

    #[test]
    fn test_epoch_mismatch_and_regeneration() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(93);
        let (public, mut parties) = setup(2, 1, &mut rng)?;
        parties[0].generate_share(1)?;
        parties[1].generate_share(2)?;
        let y = [[1i64], [1]];
        let sk = vec![
            FeDecentralizedDdh::keygen(&y, &parties[0])?,
            FeDecentralizedDdh::keygen(&y, &parties[1])?,
        ];
        let cs = parties
            .iter()
            .map(|p| FeDecentralizedDdh::encrypt(&[4], b"t", p))
            .collect::<Result<Vec<_>, _>>()?;
        assert!(matches!(
            FeDecentralizedDdh::decrypt(&cs, b"t", &public, &sk, (0, 100), &mut rng),
            Err(MifeCryptoError::EpochMismatch)
        ));

        parties[1].generate_share(1)?;
        parties[1].regenerate_secret(&mut rng);
        let cs = parties
            .iter()
            .map(|p| FeDecentralizedDdh::encrypt(&[4], b"t", p))
            .collect::<Result<Vec<_>, _>>()?;
        let sk = parties
            .iter()
            .map(|p| FeDecentralizedDdh::keygen(&y, p))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            FeDecentralizedDdh::decrypt(&cs, b"t", &public, &sk, (0, 100), &mut rng)?,
            8
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_partial_key_is_rejected() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(94);
        let (public, mut parties) = setup(2, 1, &mut rng)?;
        for party in parties.iter_mut() {
            party.generate_share(3)?;
        }
        let y = [[1i64], [1]];
        let cs = parties
            .iter()
            .map(|p| FeDecentralizedDdh::encrypt(&[4], b"t", p))
            .collect::<Result<Vec<_>, _>>()?;
        let k0 = FeDecentralizedDdh::keygen(&y, &parties[0])?;
        assert_eq!(k0.index, 0);
        let sk = vec![k0.clone(), k0.clone()];
        assert!(matches!(
            FeDecentralizedDdh::decrypt(&cs, b"t", &public, &sk, (0, 100), &mut rng),
            Err(MifeCryptoError::InvalidParameters(_))
        ));

        let mut forged = k0.clone();
        forged.index = 5;
        assert!(matches!(
            FeDecentralizedDdh::decrypt(&cs, b"t", &public, &[k0, forged], (0, 100), &mut rng),
            Err(MifeCryptoError::IndexOutOfRange { index: 5, n: 2 })
        ));
        Ok(())
    }
}
