//! Single-input schemes: one encryptor, one vector per ciphertext.

pub mod damgard;
pub mod ddh;
pub mod fhiding;
pub mod lwe;
pub mod quadratic;
pub mod selective;
