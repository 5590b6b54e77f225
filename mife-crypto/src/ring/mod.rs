//! # Ring Module
//!
//! Provides the [`Ring`] struct for arithmetic in Z_q over arbitrary precision integers,
//! and matrix/vector operations over it.

pub mod helper;
pub mod math;
pub mod matrix_ops;

use num_bigint::BigInt;

/// Represents a mathematical vector of ring coefficients.
pub type Vector = Vec<BigInt>;
/// Represents a mathematical matrix of ring coefficients, stored row by row.
pub type Matrix = Vec<Vec<BigInt>>;

pub use helper::{dot, to_matrix, to_vector};
pub use math::Ring;
