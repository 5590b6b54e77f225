//! Multi-input schemes: `n` clients each encrypt one slot of an `n×m` input, and one
//! function key decrypts the inner product across all slots.

pub mod damgard;
