//! Cryptographic primitives for linkledger

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// The signing capability the ledger depends on.
///
/// Implementations must be deterministic and free of side effects: the same
/// `(message, signature, public_key)` triple always yields the same answer.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// ECDSA over secp256k1 with SHA-256 message digests and compact signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl Secp256k1Verifier {
    /// Like [`SignatureVerifier::verify`], but names the first thing wrong with
    /// the attached material.
    pub fn check(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> Result<(), ChainError> {
        let key = match public_key.len() {
            PUBLIC_KEY_SIZE => PublicKey::from_slice(public_key)?,
            len => {
                return Err(ChainError::CryptoError(format!(
                    "public key has {} bytes, want {} (compressed)",
                    len, PUBLIC_KEY_SIZE
                )))
            }
        };
        let signature = match signature.len() {
            COMPACT_SIGNATURE_SIZE => Signature::from_compact(signature)?,
            len => {
                return Err(ChainError::CryptoError(format!(
                    "signature has {} bytes, want {} (compact)",
                    len, COMPACT_SIGNATURE_SIZE
                )))
            }
        };

        SECP256K1_CONTEXT
            .verify_ecdsa(&digest_message(message), &signature, &key)
            .map_err(|_| ChainError::CryptoError("signature does not match public key".to_string()))
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        self.check(message, signature, public_key).is_ok()
    }
}

fn digest_message(message: &[u8]) -> Message {
    Message::from_digest(Sha256::digest(message).into())
}

/// Derives a blockchain address from compressed public key bytes:
/// lowercase hex of the SHA-256 digest.
pub fn address_from_public_key(public_key_bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(public_key_bytes))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, ChainError> {
        let secret_key = SecretKey::new(&mut OsRng);
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(ChainError::CryptoError(format!(
                "Secret key must be {} bytes, got {}",
                SECRET_KEY_SIZE,
                bytes.len()
            )));
        }
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|e| ChainError::CryptoError(format!("Invalid secret key bytes: {}", e)))?;

        Ok(Self::from_secret_key(secret_key))
    }

    pub fn address(&self) -> String {
        address_from_public_key(&self.public_key_bytes())
    }

    /// Returns the KeyPair's public key as a compressed byte array.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Signs the SHA-256 digest of `message` and returns the compact signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE], ChainError> {
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&digest_message(message), &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_generation() {
        let keypair = KeyPair::generate().unwrap();
        let address = keypair.address();
        assert_eq!(address.len(), 64);
        assert!(address.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(address, address_from_public_key(&keypair.public_key_bytes()));
    }

    #[test]
    fn test_signing_and_verification() {
        let keypair = KeyPair::generate().unwrap();
        let message = b"Hello, ledger!";

        let signature = keypair.sign(message).unwrap();
        let pubkey_bytes = keypair.public_key_bytes();

        assert!(Secp256k1Verifier.check(message, &signature, &pubkey_bytes).is_ok());
        assert!(Secp256k1Verifier.verify(message, &signature, &pubkey_bytes));
    }

    #[test]
    fn test_signature_from_other_key_is_rejected() {
        let signer = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();

        let message = b"Test message";
        let signature = signer.sign(message).unwrap();

        let result = Secp256k1Verifier.check(message, &signature, &other.public_key_bytes());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Cryptographic error: signature does not match public key"
        );
        assert!(!Secp256k1Verifier.verify(message, &signature, &other.public_key_bytes()));
    }

    #[test]
    fn test_tampered_message() {
        let keypair = KeyPair::generate().unwrap();
        let signature = keypair.sign(b"Original message").unwrap();
        let pubkey_bytes = keypair.public_key_bytes();

        assert!(Secp256k1Verifier
            .check(b"Tampered message", &signature, &pubkey_bytes)
            .is_err());
    }

    #[test]
    fn test_wrong_lengths_are_named() {
        let keypair = KeyPair::generate().unwrap();
        let message = b"Test";
        let signature = keypair.sign(message).unwrap();
        let pubkey_bytes = keypair.public_key_bytes();

        let err = Secp256k1Verifier
            .check(message, &signature, &pubkey_bytes[1..])
            .unwrap_err();
        assert!(err.to_string().contains("public key has 32 bytes"));

        let err = Secp256k1Verifier
            .check(message, &signature[1..], &pubkey_bytes)
            .unwrap_err();
        assert!(err.to_string().contains("signature has 63 bytes"));

        assert!(!Secp256k1Verifier.verify(message, &[], &[]));
    }

    #[test]
    fn test_from_secret_bytes_roundtrip_address() {
        let keypair = KeyPair::generate().unwrap();
        let restored = KeyPair::from_secret_bytes(&keypair.secret_key.secret_bytes()).unwrap();
        assert_eq!(keypair.address(), restored.address());

        let short_bytes = [0u8; SECRET_KEY_SIZE - 1];
        assert!(KeyPair::from_secret_bytes(&short_bytes)
            .unwrap_err()
            .to_string()
            .contains("Secret key must be"));
    }
}
