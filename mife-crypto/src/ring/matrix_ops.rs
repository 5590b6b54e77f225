use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::errors::MifeCryptoError;
use crate::ring::{Matrix, Ring, Vector};

fn check_rectangular(a: &Matrix, name: &str) -> Result<usize, MifeCryptoError> {
    let n = a.first().map_or(0, |row| row.len());
    for (i, row) in a.iter().enumerate() {
        if row.len() != n {
            return Err(MifeCryptoError::DimensionMismatch(format!(
                "{} row {} has length {} but expected {}",
                name,
                i,
                row.len(),
                n
            )));
        }
    }
    Ok(n)
}

/// A·x where A is an m×n matrix and x is a length–n vector.
/// Returns an m‐vector.
pub fn matrix_vector_mul(a: &Matrix, x: &Vector, ring: &Ring) -> Result<Vector, MifeCryptoError> {
    if a.is_empty() {
        return Ok(Vec::new());
    }
    let n = check_rectangular(a, "Matrix")?;
    if x.len() != n {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Matrix columns ({}) must match vector length ({})",
            n,
            x.len()
        )));
    }

    Ok(a.iter()
        .map(|row| {
            let sum: BigInt = row.iter().zip(x).map(|(r, v)| r * v).sum();
            ring.normalize(&sum)
        })
        .collect())
}

/// x·A where x is a length–m row‐vector and A is m×n.
/// Returns a length–n row‐vector.
pub fn vector_matrix_mul(x: &Vector, a: &Matrix, ring: &Ring) -> Result<Vector, MifeCryptoError> {
    if x.is_empty() {
        return Ok(Vec::new());
    }
    if a.len() != x.len() {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Vector length ({}) must match matrix rows ({})",
            x.len(),
            a.len()
        )));
    }
    let n = check_rectangular(a, "Matrix")?;

    let mut y = vec![BigInt::zero(); n];
    for (xi, row) in x.iter().zip(a) {
        if xi.is_zero() {
            continue;
        }
        for (acc, v) in y.iter_mut().zip(row) {
            *acc += xi * v;
        }
    }
    Ok(y.iter().map(|v| ring.normalize(v)).collect())
}

/// Computes `⟨a, b⟩` modulo the ring modulus.
pub fn inner_product(a: &Vector, b: &Vector, ring: &Ring) -> Result<BigInt, MifeCryptoError> {
    if a.len() != b.len() {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Vector lengths must match for inner product ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    let sum: BigInt = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Ok(ring.normalize(&sum))
}

/// Computes the vector sum `c = a + b` in the ring.
///
/// # Errors
///
/// Returns `MifeCryptoError::DimensionMismatch` if the vectors have different lengths.
pub fn vector_add(a: &Vector, b: &Vector, ring: &Ring) -> Result<Vector, MifeCryptoError> {
    if a.len() != b.len() {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Vector lengths must match for addition ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(x, y)| ring.add(x, y)).collect())
}

/// Computes the vector difference `c = a - b` in the ring.
///
/// # Errors
///
/// Returns `MifeCryptoError::DimensionMismatch` if the vectors have different lengths.
pub fn vector_sub(a: &Vector, b: &Vector, ring: &Ring) -> Result<Vector, MifeCryptoError> {
    if a.len() != b.len() {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Vector lengths must match for subtraction ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(x, y)| ring.sub(x, y)).collect())
}

pub fn scalar_vector_mul(k: &BigInt, a: &Vector, ring: &Ring) -> Vector {
    a.iter().map(|v| ring.mul(k, v)).collect()
}

/// Computes the matrix sum `C = A + B` in the ring.
pub fn matrix_add(a: &Matrix, b: &Matrix, ring: &Ring) -> Result<Matrix, MifeCryptoError> {
    if a.len() != b.len() {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Matrix row counts must match for addition ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    a.iter()
        .zip(b)
        .map(|(ra, rb)| vector_add(ra, rb, ring))
        .collect()
}

/// Computes the matrix product `C = AB` in the ring.
///
/// # Errors
///
/// Returns `MifeCryptoError::DimensionMismatch` if the inner dimensions of the matrices do not match
/// or if rows within the matrices have inconsistent lengths.
pub fn matrix_mul(a: &Matrix, b: &Matrix, ring: &Ring) -> Result<Matrix, MifeCryptoError> {
    if a.is_empty() {
        return Ok(Matrix::new());
    }
    let m_common = check_rectangular(a, "Matrix A")?;
    check_rectangular(b, "Matrix B")?;

    if b.len() != m_common {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Inner dimensions must match for matrix multiplication ({} vs {})",
            m_common,
            b.len()
        )));
    }

    a.iter().map(|row| vector_matrix_mul(row, b, ring)).collect()
}

/// Returns the transpose of a rectangular matrix.
pub fn transpose(a: &Matrix) -> Result<Matrix, MifeCryptoError> {
    let n = check_rectangular(a, "Matrix")?;
    Ok((0..n)
        .map(|j| a.iter().map(|row| row[j].clone()).collect())
        .collect())
}

/// Creates an identity matrix of size `n`.
pub fn identity_matrix(n: usize) -> Matrix {
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| if i == j { BigInt::one() } else { BigInt::zero() })
                .collect()
        })
        .collect()
}

pub fn row(a: &Matrix, i: usize) -> Result<Vector, MifeCryptoError> {
    a.get(i)
        .cloned()
        .ok_or(MifeCryptoError::IndexOutOfRange { index: i, n: a.len() })
}

pub fn column(a: &Matrix, j: usize) -> Result<Vector, MifeCryptoError> {
    let n = check_rectangular(a, "Matrix")?;
    if j >= n {
        return Err(MifeCryptoError::IndexOutOfRange { index: j, n });
    }
    Ok(a.iter().map(|row| row[j].clone()).collect())
}

/// Concatenates the rows of a matrix.
pub fn flatten(a: &Matrix) -> Vector {
    a.iter().flatten().cloned().collect()
}

/// Splits a vector into `rows` rows of `cols` entries each.
pub fn unflatten(v: &Vector, rows: usize, cols: usize) -> Result<Matrix, MifeCryptoError> {
    if v.len() != rows * cols {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "Cannot reshape a vector of length {} into {}x{}",
            v.len(),
            rows,
            cols
        )));
    }
    if cols == 0 {
        return Ok(vec![Vec::new(); rows]);
    }
    Ok(v.chunks(cols).map(|chunk| chunk.to_vec()).collect())
}

/// Result of Gauss-Jordan elimination on `[A | B]`.
struct Reduction {
    det: BigInt,
    full_rank: bool,
    augmented: Matrix,
}

/// Runs Gauss-Jordan elimination on `a` augmented with `b`.
///
/// Pivots are chosen as the first unit in each column, so over a prime modulus every
/// non-zero entry qualifies. Row swaps flip the sign of the determinant.
fn gauss_jordan(a: &Matrix, b: &Matrix, ring: &Ring) -> Result<Reduction, MifeCryptoError> {
    let n = a.len();
    let mut mat: Matrix = a
        .iter()
        .zip(b)
        .map(|(ra, rb)| ra.iter().chain(rb).map(|v| ring.normalize(v)).collect())
        .collect();
    let width = mat.first().map_or(0, |r| r.len());
    let mut det = BigInt::one();

    for col in 0..n {
        let Some(pivot_idx) = (col..n).find(|&r| ring.is_unit(&mat[r][col])) else {
            if (col..n).any(|r| !mat[r][col].is_zero()) {
                return Err(MifeCryptoError::NotInvertible(format!(
                    "column {} has no unit pivot mod {}",
                    col,
                    ring.modulus()
                )));
            }
            return Ok(Reduction {
                det: BigInt::zero(),
                full_rank: false,
                augmented: mat,
            });
        };

        if pivot_idx != col {
            mat.swap(pivot_idx, col);
            det = ring.neg(&det);
        }
        let pivot = mat[col][col].clone();
        det = ring.mul(&det, &pivot);

        let pivot_inv = ring.inv(&pivot)?;
        for j in 0..width {
            mat[col][j] = ring.mul(&mat[col][j], &pivot_inv);
        }

        let pivot_row = mat[col].clone();
        for (r, current) in mat.iter_mut().enumerate() {
            if r == col || current[col].is_zero() {
                continue;
            }
            let factor = current[col].clone();
            for j in 0..width {
                current[j] = ring.sub(&current[j], &(&factor * &pivot_row[j]));
            }
        }
    }

    Ok(Reduction {
        det,
        full_rank: true,
        augmented: mat,
    })
}

fn check_square(matrix: &Matrix, op: &str) -> Result<usize, MifeCryptoError> {
    let n = matrix.len();
    if matrix.iter().any(|row| row.len() != n) {
        return Err(MifeCryptoError::DimensionMismatch(format!(
            "{}: matrix must be square",
            op
        )));
    }
    Ok(n)
}

/// Determinant of a square matrix over the ring.
pub fn determinant(matrix: &Matrix, ring: &Ring) -> Result<BigInt, MifeCryptoError> {
    let n = check_square(matrix, "determinant")?;
    if n == 0 {
        return Ok(BigInt::one());
    }
    let empty = vec![Vec::new(); n];
    Ok(gauss_jordan(matrix, &empty, ring)?.det)
}

/// Inverse of a square matrix over the ring.
///
/// # Errors
///
/// Returns `MifeCryptoError::NotInvertible` if some column has no invertible pivot.
pub fn matrix_inverse(matrix: &Matrix, ring: &Ring) -> Result<Matrix, MifeCryptoError> {
    let n = check_square(matrix, "matrix_inverse")?;
    if n == 0 {
        return Ok(Vec::new());
    }

    let reduction = gauss_jordan(matrix, &identity_matrix(n), ring)?;
    if !reduction.full_rank {
        return Err(MifeCryptoError::NotInvertible(format!(
            "matrix_inverse: matrix is singular mod {}",
            ring.modulus()
        )));
    }

    Ok(reduction
        .augmented
        .into_iter()
        .map(|row| row[n..].to_vec())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::{to_matrix, to_vector};
    use num_bigint::BigUint;

    fn test_ring() -> Ring {
        Ring::try_with(&BigUint::from(13u32)).unwrap()
    }

    #[test]
    fn test_vector_add_ok() {
        let ring = test_ring();
        let a = to_vector(&[1, 2, 3]);
        let b = to_vector(&[10, 11, 12]);
        assert_eq!(vector_add(&a, &b, &ring).unwrap(), to_vector(&[11, 0, 2]));
    }

    #[test]
    fn test_vector_add_dimension_mismatch() {
        let ring = test_ring();
        let a = to_vector(&[1, 2, 3]);
        let b = to_vector(&[10, 11]);
        assert!(matches!(
            vector_add(&a, &b, &ring),
            Err(MifeCryptoError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_vector_sub_ok() {
        let ring = test_ring();
        let a = to_vector(&[1, 2, 3]);
        let b = to_vector(&[10, 1, 5]);
        assert_eq!(vector_sub(&a, &b, &ring).unwrap(), to_vector(&[4, 1, 11]));
    }

    #[test]
    fn test_matrix_vector_mul_ok() {
        let ring = test_ring();
        let a = to_matrix(&[[1i64, 2], [3, 4]]);
        let x = to_vector(&[5, 6]);
        assert_eq!(matrix_vector_mul(&a, &x, &ring).unwrap(), to_vector(&[4, 0]));
        assert_eq!(vector_matrix_mul(&x, &a, &ring).unwrap(), to_vector(&[10, 8]));
    }

    #[test]
    fn test_matrix_vector_mul_dimension_mismatch() {
        let ring = test_ring();
        let a = to_matrix(&[[1i64, 2], [3, 4]]);
        let x = to_vector(&[5, 6, 7]);
        assert!(matrix_vector_mul(&a, &x, &ring).is_err());
        assert!(vector_matrix_mul(&x, &a, &ring).is_err());
    }

    #[test]
    fn test_matrix_mul_ok() {
        let ring = test_ring();
        let a = to_matrix(&[[1i64, 2], [3, 4]]);
        let b = to_matrix(&[[5i64, 6], [7, 8]]);
        assert_eq!(
            matrix_mul(&a, &b, &ring).unwrap(),
            to_matrix(&[[6i64, 9], [4, 11]])
        );
    }

    #[test]
    fn test_matrix_mul_dimension_mismatch() {
        let ring = test_ring();
        let a = to_matrix(&[[1i64, 2], [3, 4]]);
        let b = to_matrix(&[[5i64, 6, 7], [8, 9, 10]]);
        assert_eq!(matrix_mul(&a, &b, &ring).unwrap().len(), 2);

        let f = to_matrix(&[[1i64], [2], [3]]);
        assert!(matrix_mul(&a, &f, &ring).is_err());
    }

    #[test]
    fn test_transpose_and_reshape() {
        let a = to_matrix(&[[1i64, 2, 3], [4, 5, 6]]);
        let t = transpose(&a).unwrap();
        assert_eq!(t, to_matrix(&[[1i64, 4], [2, 5], [3, 6]]));
        assert_eq!(column(&a, 1).unwrap(), to_vector(&[2, 5]));
        assert_eq!(row(&a, 1).unwrap(), to_vector(&[4, 5, 6]));
        assert!(column(&a, 3).is_err());

        let flat = flatten(&a);
        assert_eq!(flat, to_vector(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(unflatten(&flat, 2, 3).unwrap(), a);
        assert!(unflatten(&flat, 4, 2).is_err());
    }

    #[test]
    fn test_identity_matrix() {
        assert_eq!(
            identity_matrix(3),
            to_matrix(&[[1i64, 0, 0], [0, 1, 0], [0, 0, 1]])
        );
        assert_eq!(identity_matrix(0), Matrix::new());
    }

    #[test]
    fn test_matrix_inverse_ok() {
        let ring = Ring::try_with(&BigUint::from(26u32)).unwrap();
        let matrix = to_matrix(&[[3i64, 3], [2, 5]]);
        // det = 9, 9^-1 = 3 mod 26, adj = [[5, -3], [-2, 3]]
        let expected_inv = to_matrix(&[[15i64, 17], [20, 9]]);
        assert_eq!(matrix_inverse(&matrix, &ring).unwrap(), expected_inv);

        let product = matrix_mul(&matrix, &expected_inv, &ring).unwrap();
        assert_eq!(product, identity_matrix(2));
        assert_eq!(determinant(&matrix, &ring).unwrap(), BigInt::from(9));
    }

    #[test]
    fn test_matrix_inverse_singular() {
        let ring = test_ring();
        let matrix = to_matrix(&[[1i64, 2], [2, 4]]);
        assert!(matches!(
            matrix_inverse(&matrix, &ring),
            Err(MifeCryptoError::NotInvertible(_))
        ));
        assert!(determinant(&matrix, &ring).unwrap().is_zero());
    }

    #[test]
    fn test_determinant_with_row_swap() {
        let ring = test_ring();
        // det = 0*1 - 2*3 = -6 = 7 mod 13
        let matrix = to_matrix(&[[0i64, 2], [3, 1]]);
        assert_eq!(determinant(&matrix, &ring).unwrap(), BigInt::from(7));

        let inv = matrix_inverse(&matrix, &ring).unwrap();
        let det_inv = determinant(&inv, &ring).unwrap();
        assert!(ring.mul(&BigInt::from(7), &det_inv).is_one());
    }

    #[test]
    fn test_non_square_rejected() {
        let ring = test_ring();
        let matrix = to_matrix(&[[1i64, 2, 3], [4, 5, 6]]);
        assert!(matches!(
            determinant(&matrix, &ring),
            Err(MifeCryptoError::DimensionMismatch(_))
        ));
    }
}
