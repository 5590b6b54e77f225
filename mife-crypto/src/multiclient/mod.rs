//! Multi-client schemes: each client encrypts its own slot under a shared label, and a
//! function key only decrypts ciphertexts that carry the same label.

pub mod damgard;
pub mod decentralized;
pub mod rom;
