//! Selectively secure variants.

pub mod lwe;
