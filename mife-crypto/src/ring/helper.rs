use num_bigint::BigInt;

use crate::errors::MifeCryptoError;
use crate::ring::{Matrix, Vector};

/// Plain integer dot product, without modular reduction.
pub fn dot(a: &[BigInt], b: &[BigInt]) -> Result<BigInt, MifeCryptoError> {
    if a.len() != b.len() {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Dot product of vectors with lengths {} and {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}

/// Lifts a slice of machine integers into a [`Vector`].
pub fn to_vector(values: &[i64]) -> Vector {
    values.iter().map(|&v| BigInt::from(v)).collect()
}

/// Lifts rows of machine integers into a [`Matrix`].
pub fn to_matrix<R: AsRef<[i64]>>(rows: &[R]) -> Matrix {
    rows.iter().map(|row| to_vector(row.as_ref())).collect()
}
