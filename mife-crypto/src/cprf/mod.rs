//! Distributed correlated PRF.
//!
//! Parties `i < j` share a 128-bit key `k_ij`. Party `i` evaluates
//! `Σ_{j≠i} ±PRF(k_ij, x)` with `-` when `j < i`, so the evaluations of all parties on
//! the same input sum to zero over the integers.

use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit};
use num_bigint::{BigInt, Sign};
use rand::{CryptoRng, RngCore};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::errors::MifeCryptoError;

pub const KEY_LEN: usize = 16;
pub type CprfKey = [u8; KEY_LEN];

const BLOCK_LEN: usize = 16;

/// Keystream of AES-128 in counter mode: blocks `AES(k, nonce || ctr)` with a 64-bit
/// big-endian counter starting at zero.
fn keystream(key: &CprfKey, nonce: &[u8; 8], length: usize) -> Vec<u8> {
    let cipher = Aes128::new(key.into());
    let mut out = Vec::with_capacity(length.next_multiple_of(BLOCK_LEN));
    let mut counter = 0u64;
    while out.len() < length {
        let mut block = [0u8; BLOCK_LEN];
        block[..8].copy_from_slice(nonce);
        block[8..].copy_from_slice(&counter.to_be_bytes());
        let mut block = aes::Block::from(block);
        cipher.encrypt_block(&mut block);
        out.extend_from_slice(block.as_slice());
        counter += 1;
    }
    out.truncate(length);
    out
}

/// `PRF(k, x)`: `length` bytes of keystream under a nonce derived from `x`, read as a
/// big-endian integer.
pub fn prf(key: &CprfKey, x: &[u8], length: usize) -> BigInt {
    let digest = Sha256::digest(x);
    let mut nonce = [0u8; 8];
    nonce.copy_from_slice(&digest[..8]);
    BigInt::from_bytes_be(Sign::Plus, &keystream(key, &nonce, length))
}

/// The trusted-setup key matrix for `n` parties.
#[derive(Debug, Clone)]
pub struct Cprf {
    n: usize,
    /// `keys[i][j]` is shared by parties `j < i`.
    keys: Vec<Vec<CprfKey>>,
}

/// One party's view of the pairwise keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CprfPartyKey {
    index: usize,
    keys: Vec<Option<CprfKey>>,
}

impl Cprf {
    pub fn setup<R: CryptoRng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let keys = (0..n)
            .map(|i| {
                (0..i)
                    .map(|_| {
                        let mut key = [0u8; KEY_LEN];
                        rng.fill_bytes(&mut key);
                        key
                    })
                    .collect()
            })
            .collect();
        Self { n, keys }
    }

    pub fn parties(&self) -> usize {
        self.n
    }

    /// Keys of party `i`: the key shared with every other party, none for itself.
    pub fn keygen(&self, i: usize) -> Result<CprfPartyKey, MifeCryptoError> {
        if i >= self.n {
            return Err(MifeCryptoError::IndexOutOfRange { index: i, n: self.n });
        }
        let keys = (0..self.n)
            .map(|j| match j.cmp(&i) {
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Less => Some(self.keys[i][j]),
                std::cmp::Ordering::Greater => Some(self.keys[j][i]),
            })
            .collect();
        Ok(CprfPartyKey { index: i, keys })
    }
}

impl CprfPartyKey {
    /// A party key with no peers filled in yet.
    pub fn empty(index: usize, n: usize) -> Result<Self, MifeCryptoError> {
        if index >= n {
            return Err(MifeCryptoError::IndexOutOfRange { index, n });
        }
        Ok(Self {
            index,
            keys: vec![None; n],
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parties(&self) -> usize {
        self.keys.len()
    }

    /// Installs the key shared with party `j`.
    pub fn set(&mut self, j: usize, key: CprfKey) -> Result<(), MifeCryptoError> {
        let n = self.keys.len();
        if j >= n {
            return Err(MifeCryptoError::IndexOutOfRange { index: j, n });
        }
        if j == self.index {
            return Err(MifeCryptoError::InvalidParameters(
                "A party does not share a key with itself".into(),
            ));
        }
        self.keys[j] = Some(key);
        Ok(())
    }

    /// True once a key is known for every other party.
    pub fn is_complete(&self) -> bool {
        self.keys
            .iter()
            .enumerate()
            .all(|(j, k)| j == self.index || k.is_some())
    }

    /// Evaluates this party's share on `x` with `length`-byte PRF outputs.
    ///
    /// # Errors
    ///
    /// Returns `MifeCryptoError::InvalidState` if a peer key is still missing.
    pub fn eval(&self, x: &[u8], length: usize) -> Result<BigInt, MifeCryptoError> {
        let mut acc = BigInt::from(0);
        for (j, key) in self.keys.iter().enumerate() {
            if j == self.index {
                continue;
            }
            let key = key.as_ref().ok_or_else(|| {
                MifeCryptoError::InvalidState(format!(
                    "party {} has no key shared with party {}",
                    self.index, j
                ))
            })?;
            let value = prf(key, x, length);
            if j < self.index {
                acc -= value;
            } else {
                acc += value;
            }
        }
        Ok(acc)
    }

    /// Exports the party index only; key material never leaves the party.
    pub fn export(&self) -> Value {
        json!({
            "type": "cprf_party_key",
            "index": self.index,
            "parties": self.keys.len(),
        })
    }
}
