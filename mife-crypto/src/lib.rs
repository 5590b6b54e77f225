//! Functional encryption for inner products and quadratic forms.
//!
//! Every scheme is generic over a [`group::Group`] (or [`group::Pairing`]) and follows the
//! same shape: `generate`, `encrypt`, `keygen`, `decrypt`. Decryption ends in a bounded
//! discrete logarithm ([`dlog`]) except for the lattice schemes, which round.

#![allow(non_snake_case)]

pub mod cprf;
pub mod dlog;
pub mod errors;
pub mod group;
pub mod keypair;
pub mod multi;
pub mod multiclient;
pub mod paillier;
pub mod ring;
pub mod sampling;
pub mod single;
