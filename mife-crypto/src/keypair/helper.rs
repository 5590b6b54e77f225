use num_bigint::BigInt;
use serde_json::Value;

use crate::errors::MifeCryptoError;
use crate::ring::{Matrix, Vector};

/// Maps each element of a matrix using the provided mapping function.
pub fn map_matrix<T, U>(matrix: &[Vec<T>], mapper: impl Fn(&T) -> U) -> Vec<Vec<U>> {
    matrix
        .iter()
        .map(|row| row.iter().map(&mapper).collect())
        .collect()
}

/// Maps each element of a vector using the provided mapping function.
pub fn map_vector<T, U>(vector: &[T], mapper: impl Fn(&T) -> U) -> Vec<U> {
    vector.iter().map(mapper).collect()
}

/// Fails with `DimensionMismatch` unless `found == expected`.
pub fn check_dimension(what: &str, expected: usize, found: usize) -> Result<(), MifeCryptoError> {
    if expected != found {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "{} must be of length {}, got {}",
            what, expected, found
        )));
    }
    Ok(())
}

/// Fails with `DimensionMismatch` unless `matrix` is `rows × cols`.
pub fn check_matrix<T, R: AsRef<[T]>>(
    what: &str,
    rows: usize,
    cols: usize,
    matrix: &[R],
) -> Result<(), MifeCryptoError> {
    if matrix.len() != rows || matrix.iter().any(|row| row.as_ref().len() != cols) {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "{} must be a {} x {} matrix",
            what, rows, cols
        )));
    }
    Ok(())
}

/// Big integers are exported as decimal strings.
pub fn export_int(value: &BigInt) -> Value {
    Value::String(value.to_string())
}

pub fn export_vector(vector: &Vector) -> Value {
    Value::Array(vector.iter().map(export_int).collect())
}

pub fn export_matrix(matrix: &Matrix) -> Value {
    Value::Array(matrix.iter().map(export_vector).collect())
}
