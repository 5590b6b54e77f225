#[derive(thiserror::Error, Debug)]
pub enum MifeCryptoError {
    /// Vector or matrix lengths disagree with each other or with the scheme parameters.
    #[error("DimensionMismatch: {0}")]
    DimensionMismatch(String),
    /// An operation that needs the master secret was given a public-only key.
    #[error("The master key has no private key")]
    MissingPrivateKey,
    #[error("Index {index} must be within [0,{n})")]
    IndexOutOfRange { index: usize, n: usize },
    #[error("All ciphertexts must carry the same tag")]
    TagMismatch,
    #[error("Ciphertext belongs to slot {found}, expected slot {expected}")]
    IndexMismatch { expected: usize, found: usize },
    /// Modular inverse of a non-unit, or inversion of a singular matrix.
    #[error("NotInvertible: {0}")]
    NotInvertible(String),
    #[error("NotPrime: {0}")]
    NotPrime(String),
    /// The search bound did not contain the exponent, or ciphertext and key do not belong together.
    #[error("Discrete log not found within [{lo}, {hi}]")]
    DiscreteLogNotFound { lo: i64, hi: i64 },
    #[error("InvalidParameters: {0}")]
    InvalidParameters(String),
    /// A decentralized party was driven out of order.
    #[error("InvalidState: {0}")]
    InvalidState(String),
    #[error("Decryption keys were generated for different epochs")]
    EpochMismatch,
    #[error("InternalError: {0}")]
    InternalError(String),

    #[error("Data serialization: {0}")]
    SerializationError(#[from] serde_json::Error),
}
