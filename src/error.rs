//! Error types for linkledger

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ChainError {
    InvalidAmount(String),
    AuthenticationFailure(String),
    InsufficientFunds {
        address: String,
        balance: String,
        requested: String,
    },
    ChainIntegrityViolation {
        height: usize,
    },
    MiningCancelled,
    NonceSpaceExhausted,
    InvalidDifficulty(u32),
    CryptoError(String),
    ConfigError(String),
    IoError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            ChainError::AuthenticationFailure(msg) => write!(f, "Authentication failure: {}", msg),
            ChainError::InsufficientFunds {
                address,
                balance,
                requested,
            } => write!(
                f,
                "Insufficient funds: {} has {} but requested {}",
                address, balance, requested
            ),
            ChainError::ChainIntegrityViolation { height } => write!(
                f,
                "Chain integrity violation: block {} does not link to its predecessor",
                height
            ),
            ChainError::MiningCancelled => write!(f, "Mining cancelled"),
            ChainError::NonceSpaceExhausted => write!(f, "Nonce space exhausted"),
            ChainError::InvalidDifficulty(d) => write!(
                f,
                "Invalid difficulty: {} (must be at most {} hex digits)",
                d,
                crate::miner::Difficulty::MAX
            ),
            ChainError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            ChainError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

impl From<secp256k1::Error> for ChainError {
    fn from(err: secp256k1::Error) -> Self {
        ChainError::CryptoError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
