//! # Keypair Module
//!
//! Containers shared by every scheme: the [`MasterKey`] sum type that either carries the
//! master secret or only the public parameters, and the [`Export`] trait used to turn keys
//! and ciphertexts into JSON.

pub mod helper;

use serde_json::{Value, json};

use crate::errors::MifeCryptoError;

/// Conversion into a JSON tree of plain integers, strings and nested exports.
pub trait Export {
    fn export(&self) -> Value;

    fn to_json(&self) -> Result<String, MifeCryptoError> {
        Ok(serde_json::to_string(&self.export())?)
    }
}

/// A master key: public parameters, optionally paired with the master secret.
///
/// The public variant is obtained with [`MasterKey::get_public_key`] and never exposes the
/// secret type.
#[derive(Debug, Clone)]
pub enum MasterKey<P, S> {
    Public(P),
    KeyPair { public: P, secret: S },
}

impl<P: Clone, S> MasterKey<P, S> {
    pub fn new(public: P, secret: S) -> Self {
        MasterKey::KeyPair { public, secret }
    }

    pub fn public(&self) -> &P {
        match self {
            MasterKey::Public(public) => public,
            MasterKey::KeyPair { public, .. } => public,
        }
    }

    /// # Errors
    ///
    /// Returns `MifeCryptoError::MissingPrivateKey` for a public-only key.
    pub fn secret(&self) -> Result<&S, MifeCryptoError> {
        match self {
            MasterKey::Public(_) => Err(MifeCryptoError::MissingPrivateKey),
            MasterKey::KeyPair { secret, .. } => Ok(secret),
        }
    }

    pub fn has_private_key(&self) -> bool {
        matches!(self, MasterKey::KeyPair { .. })
    }

    /// Drops the secret, keeping only what encryptors and decryptors need.
    pub fn get_public_key(&self) -> Self {
        MasterKey::Public(self.public().clone())
    }
}

impl<P: Clone + Export, S: Export> Export for MasterKey<P, S> {
    fn export(&self) -> Value {
        let msk = match self {
            MasterKey::Public(_) => Value::Null,
            MasterKey::KeyPair { secret, .. } => secret.export(),
        };
        json!({
            "type": "master_key",
            "mpk": self.public().export(),
            "msk": msk,
        })
    }
}
