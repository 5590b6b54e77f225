use mife_crypto::errors::MifeCryptoError;
use mife_crypto::group::{Bls12G1, Bls12Pairing, Curve25519, Group, PrimeGroup};
use mife_crypto::keypair::Export;
use mife_crypto::multi::damgard::FeDamgardMulti;
use mife_crypto::multiclient::damgard::FeDamgardMultiClient;
use mife_crypto::multiclient::rom::FeDdhMultiClient;
use mife_crypto::single::damgard::FeDamgard;
use mife_crypto::single::ddh::FeDdh;
use mife_crypto::single::fhiding::FeFunctionHiding;
use mife_crypto::single::lwe::FeLwe;
use mife_crypto::single::quadratic::FeQuadratic;
use mife_crypto::single::selective::lwe::FeSelectiveLwe;
use num_bigint::BigUint;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn prime_group() -> Result<PrimeGroup, MifeCryptoError> {
    PrimeGroup::new(BigUint::from(11881870593822888767u64))
}

fn ddh_happy_flow<G: Group>(group: G, seed: u64) -> Result<i64, MifeCryptoError> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let x: Vec<i64> = (0..10).collect();
    let y: Vec<i64> = (10..20).collect();
    let key = FeDdh::generate(10, group, &mut rng)?;
    let c = FeDdh::encrypt(&x, &key.get_public_key(), &mut rng)?;
    let sk = FeDdh::keygen(&y, &key)?;
    FeDdh::decrypt(&c, &key.get_public_key(), &sk, (0, 1000), &mut rng)
}

#[test]
fn happy_flow_ddh() -> Result<(), MifeCryptoError> {
    assert_eq!(ddh_happy_flow(prime_group()?, 1)?, 735);
    assert_eq!(ddh_happy_flow(Curve25519::new(), 2)?, 735);
    assert_eq!(ddh_happy_flow(Bls12G1::default(), 3)?, 735);
    Ok(())
}

#[test]
fn happy_flow_damgard() -> Result<(), MifeCryptoError> {
    let mut rng = ChaCha20Rng::seed_from_u64(4);
    let x: Vec<i64> = (0..10).collect();
    let y: Vec<i64> = (10..20).collect();
    let key = FeDamgard::generate(10, prime_group()?, &mut rng)?;
    let c = FeDamgard::encrypt(&x, &key, &mut rng)?;
    let sk = FeDamgard::keygen(&y, &key)?;
    assert_eq!(FeDamgard::decrypt(&c, &key, &sk, (0, 1000), &mut rng)?, 735);

    let safe = FeDamgard::keygen_safe(&y, &key, &c)?;
    assert_eq!(FeDamgard::decrypt_safe(&c, &key, &safe, (0, 1000), &mut rng)?, 735);
    Ok(())
}

#[test]
fn inner_product_outside_bound_is_not_found() -> Result<(), MifeCryptoError> {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let key = FeDdh::generate(3, prime_group()?, &mut rng)?;
    let c = FeDdh::encrypt(&[100, 200, 300], &key, &mut rng)?;
    let sk = FeDdh::keygen(&[1, 1, 1], &key)?;
    assert!(matches!(
        FeDdh::decrypt(&c, &key, &sk, (0, 500), &mut rng),
        Err(MifeCryptoError::DiscreteLogNotFound { lo: 0, hi: 500 })
    ));
    assert_eq!(FeDdh::decrypt(&c, &key, &sk, (0, 600), &mut rng)?, 600);
    Ok(())
}

#[test]
fn happy_flow_multi_input() -> Result<(), MifeCryptoError> {
    let mut rng = ChaCha20Rng::seed_from_u64(6);
    let (n, m) = (3, 5);
    let x: Vec<Vec<i64>> = (0..n)
        .map(|i| (0..m).map(|j| (i + j) as i64).collect())
        .collect();
    let y: Vec<Vec<i64>> = (0..n)
        .map(|i| (0..m).map(|j| i as i64 - j as i64 + 10).collect())
        .collect();
    let expected: i64 = x.iter().flatten().zip(y.iter().flatten()).map(|(a, b)| a * b).sum();

    let key = FeDamgardMulti::generate(n, m, prime_group()?, &mut rng)?;
    let mut cs = Vec::new();
    for (i, x_i) in x.iter().enumerate() {
        let enc_key = FeDamgardMulti::get_enc_key(&key, i)?;
        cs.push(FeDamgardMulti::encrypt(x_i, &enc_key, &mut rng)?);
    }
    let sk = FeDamgardMulti::keygen(&y, &key)?;
    assert_eq!(
        FeDamgardMulti::decrypt(&cs, &key.get_public_key(), &sk, (0, 2000), &mut rng)?,
        expected
    );
    Ok(())
}

#[test]
fn happy_flow_multi_client() -> Result<(), MifeCryptoError> {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let x = [[1i64, 2], [3, 4]];
    let y = [[5i64, 6], [7, 8]];
    let tag = b"2024-01-01";

    let key = FeDdhMultiClient::generate(2, 2, prime_group()?, &mut rng)?;
    let cs = (0..2)
        .map(|i| FeDdhMultiClient::encrypt(&x[i], tag, &FeDdhMultiClient::get_enc_key(&key, i)?))
        .collect::<Result<Vec<_>, _>>()?;
    let sk = FeDdhMultiClient::keygen(&y, &key)?;
    assert_eq!(
        FeDdhMultiClient::decrypt(&cs, tag, &key.get_public_key(), &sk, (0, 200), &mut rng)?,
        70
    );
    assert!(matches!(
        FeDdhMultiClient::decrypt(&cs, b"2024-01-02", &key, &sk, (0, 200), &mut rng),
        Err(MifeCryptoError::TagMismatch)
    ));

    let key = FeDamgardMultiClient::generate(2, 2, prime_group()?, &mut rng)?;
    let public = key.get_public_key();
    let cs = (0..2)
        .map(|i| {
            let enc_key = FeDamgardMultiClient::get_enc_key(&key, i)?;
            FeDamgardMultiClient::encrypt(&x[i], tag, &enc_key, &public, &mut rng)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let sk = FeDamgardMultiClient::keygen(&y, &key)?;
    assert_eq!(FeDamgardMultiClient::decrypt(&cs, &public, &sk, (0, 200), &mut rng)?, 70);
    Ok(())
}

#[test]
fn happy_flow_lwe() -> Result<(), MifeCryptoError> {
    let mut rng = ChaCha20Rng::seed_from_u64(8);
    let x: Vec<i64> = (0..10).map(|i| i - 10).collect();
    let y: Vec<i64> = (0..10).collect();
    let expected: i64 = x.iter().zip(&y).map(|(a, b)| a * b).sum();

    let key = FeSelectiveLwe::generate(10, 4, 4, None, &mut rng)?;
    let c = FeSelectiveLwe::encrypt(&x, &key, &mut rng)?;
    let sk = FeSelectiveLwe::keygen(&y, &key)?;
    assert_eq!(FeSelectiveLwe::decrypt(&c, &key, &sk)?, expected);

    let key = FeLwe::generate(10, 4, 4, None, &mut rng)?;
    let c = FeLwe::encrypt(&x, &key, &mut rng)?;
    let sk = FeLwe::keygen(&y, &key)?;
    assert_eq!(FeLwe::decrypt(&c, &key, &sk)?, expected);
    Ok(())
}

#[test]
fn happy_flow_pairing_schemes() -> Result<(), MifeCryptoError> {
    let mut rng = ChaCha20Rng::seed_from_u64(9);
    let pairing = Bls12Pairing::new();

    let key = FeQuadratic::generate(2, pairing.clone(), &mut rng)?;
    let c = FeQuadratic::encrypt(&[1, 2], &[3, 4], &key, &mut rng)?;
    let sk = FeQuadratic::keygen(&[[1i64, 0], [2, 1]], &key)?;
    // x0·y0 + 2·x1·y0 + x1·y1
    assert_eq!(FeQuadratic::decrypt(&c, &key, &sk, (0, 100), &mut rng)?, 23);

    let key = FeFunctionHiding::generate(3, pairing, &mut rng)?;
    let c = FeFunctionHiding::encrypt(&[1, 2, 3], &key, &mut rng)?;
    let sk = FeFunctionHiding::keygen(&[4, -5, 6], &key, &mut rng)?;
    assert_eq!(FeFunctionHiding::decrypt(&c, &key, &sk, (-100, 100), &mut rng)?, 12);
    Ok(())
}

#[test]
fn exports_never_leak_the_master_secret() -> Result<(), MifeCryptoError> {
    let mut rng = ChaCha20Rng::seed_from_u64(10);
    let key = FeDamgard::generate(4, prime_group()?, &mut rng)?;
    assert!(!key.export()["msk"].is_null());
    let public = key.get_public_key();
    assert!(public.export()["msk"].is_null());
    assert!(!public.to_json()?.contains("\"s\""));
    Ok(())
}
