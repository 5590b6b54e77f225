//! Decentralized multi-client schemes: no trusted authority, the parties agree on pairwise
//! keys themselves and jointly issue function keys.

pub mod ddh;
pub mod palia;
