use mife_crypto::errors::MifeCryptoError;
use mife_crypto::group::{Curve25519, PrimeGroup};
use mife_crypto::keypair::Export;
use mife_crypto::multiclient::decentralized::ddh::{FeDecentralizedDdh, PartyState};
use mife_crypto::multiclient::decentralized::palia::FePalia;
use mife_crypto::ring::matrix_ops::{determinant, identity_matrix, matrix_inverse, matrix_mul};
use mife_crypto::ring::{Ring, to_matrix};
use num_bigint::{BigInt, BigUint};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .unwrap();
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_line_number(false)
            .with_file(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    });
}

#[test]
fn showcase_decentralized_voting_tally() -> Result<(), MifeCryptoError> {
    init_tracing();

    // Four polling stations each encrypt their counts for three candidates.
    let mut rng = ChaCha20Rng::seed_from_u64(2024);
    let (n, m) = (4, 3);
    let public = FeDecentralizedDdh::generate(n, m, Curve25519::new(), &mut rng)?;
    let mut stations = (0..n)
        .map(|i| public.generate_party(i, &mut rng))
        .collect::<Result<Vec<_>, _>>()?;

    let exchange: Vec<_> = stations.iter().map(|s| s.get_exc_public_key()).collect();
    for station in stations.iter_mut() {
        for (j, key) in exchange.iter().enumerate() {
            if j != station.index {
                station.exchange(j, key)?;
            }
        }
        assert_eq!(station.state(), PartyState::KeyExchanged);
        station.generate_share(1)?;
    }

    let counts = [[120i64, 80, 5], [64, 99, 12], [210, 33, 7], [18, 44, 90]];
    let tag = b"round-1";
    let cs = stations
        .iter()
        .zip(&counts)
        .map(|(s, x)| FeDecentralizedDdh::encrypt(x, tag, s))
        .collect::<Result<Vec<_>, _>>()?;

    // Tally for candidate 1 only.
    let y = [[0i64, 1, 0]; 4];
    let sk = stations
        .iter()
        .map(|s| FeDecentralizedDdh::keygen(&y, s))
        .collect::<Result<Vec<_>, _>>()?;
    dbg!(sk[0].to_json()?);

    let tally = FeDecentralizedDdh::decrypt(&cs, tag, &public, &sk, (0, 10_000), &mut rng)?;
    dbg!(tally);
    assert_eq!(tally, 80 + 99 + 33 + 44);

    Ok(())
}

#[test]
fn showcase_private_query() -> Result<(), MifeCryptoError> {
    init_tracing();

    let mut rng = ChaCha20Rng::seed_from_u64(2025);
    let group = PrimeGroup::new(BigUint::from(11881870593822888767u64))?;
    let public = FePalia::generate(2, 2, group, &mut rng)?;
    let mut parties = (0..2)
        .map(|i| public.generate_party(i, &mut rng))
        .collect::<Result<Vec<_>, _>>()?;
    let p1 = parties[1].get_exc_public_key();
    let p0 = parties[0].get_exc_public_key();
    parties[0].exchange(1, &p1)?;
    parties[1].exchange(0, &p0)?;
    for party in parties.iter_mut() {
        party.generate_share(0)?;
    }

    let y = [[-3i64, 1], [2, -1]];
    let query_key = FePalia::generate_query_key(&public, &mut rng)?;
    let query = FePalia::encrypt_query(&y, query_key.public(), &public, &mut rng)?;

    let tag = b"q";
    let cs = vec![
        FePalia::encrypt(&[10, 20], tag, &parties[0])?,
        FePalia::encrypt(&[30, 40], tag, &parties[1])?,
    ];
    let sk = parties
        .iter()
        .map(|p| FePalia::keygen(&query, p))
        .collect::<Result<Vec<_>, _>>()?;
    let result = FePalia::decrypt(&cs, tag, &public, &sk, &y, &query_key, (-500, 500), &mut rng)?;
    dbg!(result);
    // -30 + 20 + 60 - 40
    assert_eq!(result, 10);

    Ok(())
}

#[test]
fn showcase_matrix_inverse_mod_prime() -> Result<(), MifeCryptoError> {
    init_tracing();

    let ring = Ring::try_with(&BigUint::from(101u32))?;
    let a = to_matrix(&[[2i64, 3, 1], [4, 1, -2], [0, 5, 7]]);
    let det = determinant(&a, &ring)?;
    // 2(7 + 10) - 3(28) + 1(20)
    assert_eq!(det, ring.normalize(&BigInt::from(-30)));

    let a_inv = matrix_inverse(&a, &ring)?;
    assert_eq!(matrix_mul(&a, &a_inv, &ring)?, identity_matrix(3));

    let singular = to_matrix(&[[1i64, 2], [2, 4]]);
    assert!(matches!(
        matrix_inverse(&singular, &ring),
        Err(MifeCryptoError::NotInvertible(_))
    ));

    Ok(())
}
