//! Decentralized multi-client DDH with a private query.
//!
//! The querier encrypts its function matrix under its own Paillier key. Parties evaluate
//! their partial function keys homomorphically on the encrypted matrix, so no party sees
//! `y`, and only the querier can open the partial keys.

use num_bigint::BigInt;
use num_integer::Integer;
use rand::CryptoRng;
use serde_json::{Value, json};
use tracing::debug;

use crate::errors::MifeCryptoError;
use crate::group::Group;
use crate::keypair::Export;
use crate::keypair::helper::{check_dimension, check_matrix, map_matrix};
use crate::multiclient::decentralized::ddh::{
    DecentralizedParty, DecentralizedPartialKey, DecentralizedPublic, FeDecentralizedDdh,
};
use crate::multiclient::rom::{MultiClientCiphertext, TagHash};
use crate::paillier::{Paillier, PaillierCiphertext, PaillierKey, PaillierPublic};
use crate::ring::to_matrix;

/// Smallest Paillier prime size accepted for a query key.
pub const MIN_QUERY_PRIME_BITS: u64 = 512;

/// A function matrix encrypted entrywise under the querier's Paillier key.
#[derive(Debug, Clone)]
pub struct EncryptedQuery {
    pub pk: PaillierPublic,
    pub ey: Vec<Vec<PaillierCiphertext>>,
}

/// A partial function key whose sums are still under Paillier encryption.
#[derive(Debug, Clone)]
pub struct PaliaPartialKey {
    pub index: usize,
    pub d: (PaillierCiphertext, PaillierCiphertext),
    pub epoch: u64,
}

pub struct FePalia;

impl FePalia {
    pub fn generate<G: Group, R: CryptoRng + ?Sized>(
        n: usize,
        m: usize,
        group: G,
        rng: &mut R,
    ) -> Result<DecentralizedPublic<G>, MifeCryptoError> {
        FeDecentralizedDdh::generate(n, m, group, rng)
    }

    /// A Paillier key with primes large enough that the unreduced partial-key sums never
    /// wrap around its modulus.
    pub fn generate_query_key<G: Group, H: TagHash, R: CryptoRng + ?Sized>(
        public: &DecentralizedPublic<G, H>,
        rng: &mut R,
    ) -> Result<PaillierKey, MifeCryptoError> {
        let slots = (public.n * public.m) as u64;
        let bits = (public.group.order().bits() + (u64::BITS - slots.leading_zeros()) as u64)
            .next_multiple_of(128)
            .max(MIN_QUERY_PRIME_BITS);
        debug!(bits, "generating query key");
        Paillier::generate(bits, rng)
    }

    /// Encrypts `y mod order` entrywise.
    pub fn encrypt_query<G: Group, H: TagHash, Y: AsRef<[i64]>, R: CryptoRng + ?Sized>(
        y: &[Y],
        pk: &PaillierPublic,
        public: &DecentralizedPublic<G, H>,
        rng: &mut R,
    ) -> Result<EncryptedQuery, MifeCryptoError> {
        check_matrix("Function vector", public.n, public.m, y)?;
        let order = BigInt::from(public.group.order().clone());
        let ey: Vec<Vec<PaillierCiphertext>> = to_matrix(y)
            .iter()
            .map(|row| {
                row.iter()
                    .map(|y_ij| pk.encrypt(&y_ij.mod_floor(&order), rng))
                    .collect()
            })
            .collect();
        Ok(EncryptedQuery {
            pk: pk.clone(),
            ey,
        })
    }

    pub fn encrypt<G: Group, H: TagHash>(
        x: &[i64],
        tag: &[u8],
        party: &DecentralizedParty<G, H>,
    ) -> Result<MultiClientCiphertext<G>, MifeCryptoError> {
        FeDecentralizedDdh::encrypt(x, tag, party)
    }

    /// The party's partial key, computed without learning `y`.
    pub fn keygen<G: Group, H: TagHash>(
        query: &EncryptedQuery,
        party: &DecentralizedParty<G, H>,
    ) -> Result<PaliaPartialKey, MifeCryptoError> {
        let public = &party.public;
        check_dimension("Encrypted query rows", public.n, query.ey.len())?;
        for row in &query.ey {
            check_dimension("Encrypted query columns", public.m, row.len())?;
        }
        let epoch = party.epoch()?;
        let pk = &query.pk;
        let d = party.partial_sums(
            &query.ey,
            |ey_ij, s| pk.scalar_mul(ey_ij, s),
            |a, b| pk.add(&a, &b),
            || pk.zero(),
        )?;
        Ok(PaliaPartialKey {
            index: party.index,
            d,
            epoch,
        })
    }

    /// Opens every partial key with the querier's private key, then decrypts as usual.
    #[allow(clippy::too_many_arguments)]
    pub fn decrypt<G: Group, H: TagHash, Y: AsRef<[i64]>, R: CryptoRng + ?Sized>(
        cs: &[MultiClientCiphertext<G>],
        tag: &[u8],
        public: &DecentralizedPublic<G, H>,
        sk: &[PaliaPartialKey],
        y: &[Y],
        query_key: &PaillierKey,
        bound: (i64, i64),
        rng: &mut R,
    ) -> Result<i64, MifeCryptoError> {
        check_matrix("Function vector", public.n, public.m, y)?;
        let y = to_matrix(y);
        let opened = sk
            .iter()
            .map(|k| {
                Ok(DecentralizedPartialKey {
                    index: k.index,
                    y: y.clone(),
                    d: (
                        BigInt::from(Paillier::decrypt(query_key, &k.d.0)?),
                        BigInt::from(Paillier::decrypt(query_key, &k.d.1)?),
                    ),
                    epoch: k.epoch,
                })
            })
            .collect::<Result<Vec<_>, MifeCryptoError>>()?;
        FeDecentralizedDdh::decrypt(cs, tag, public, &opened, bound, rng)
    }
}

impl Export for EncryptedQuery {
    fn export(&self) -> Value {
        json!({
            "pk": self.pk.export(),
            "ey": map_matrix(&self.ey, |c| c.export()),
        })
    }
}

impl Export for PaliaPartialKey {
    fn export(&self) -> Value {
        json!({
            "index": self.index,
            "d": [self.d.0.export(), self.d.1.export()],
            "epoch": self.epoch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::PrimeGroup;
    use num_bigint::BigUint;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_private_query_flow() -> Result<(), MifeCryptoError> {
        let mut rng = ChaCha20Rng::seed_from_u64(100);
        let (n, m) = (3, 5);
        let group = PrimeGroup::new(BigUint::from(11881870593822888767u64))?;
        let public = FePalia::generate(n, m, group, &mut rng)?;
        let mut parties = (0..n)
            .map(|i| public.generate_party(i, &mut rng))
            .collect::<Result<Vec<_>, _>>()?;
        let exchange: Vec<_> = parties.iter().map(|p| p.get_exc_public_key()).collect();
        for party in parties.iter_mut() {
            for (j, key) in exchange.iter().enumerate() {
                if j != party.index {
                    party.exchange(j, key)?;
                }
            }
            party.generate_share(0)?;
        }

        let x: Vec<Vec<i64>> = (0..n)
            .map(|i| (0..m).map(|j| (i + j) as i64).collect())
            .collect();
        let y: Vec<Vec<i64>> = (0..n)
            .map(|i| (0..m).map(|j| i as i64 - j as i64 + 10).collect())
            .collect();
        let expected: i64 = x.iter().flatten().zip(y.iter().flatten()).map(|(a, b)| a * b).sum();

        let query_key = FePalia::generate_query_key(&public, &mut rng)?;
        assert!(query_key.public().modulus().bits() >= 2 * MIN_QUERY_PRIME_BITS - 1);
        let query = FePalia::encrypt_query(&y, query_key.public(), &public, &mut rng)?;
        assert!(query.export()["pk"]["lambda"].is_null());

        let tag = b"testingtag123";
        let cs = parties
            .iter()
            .zip(&x)
            .map(|(p, x_i)| FePalia::encrypt(x_i, tag, p))
            .collect::<Result<Vec<_>, _>>()?;
        let sk = parties
            .iter()
            .map(|p| FePalia::keygen(&query, p))
            .collect::<Result<Vec<_>, _>>()?;
        let result =
            FePalia::decrypt(&cs, tag, &public, &sk, &y, &query_key, (0, 2000), &mut rng)?;
        assert_eq!(result, expected);

        // Only the querier can open partial keys.
        assert!(matches!(
            FePalia::decrypt(
                &cs,
                tag,
                &public,
                &sk,
                &y,
                &query_key.get_public_key(),
                (0, 2000),
                &mut rng
            ),
            Err(MifeCryptoError::MissingPrivateKey)
        ));
        Ok(())
    }
}
