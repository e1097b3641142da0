//! Key-holding wallet that authorizes transfers for the ledger

use crate::crypto::KeyPair;
use crate::error::ChainError;
use crate::transaction::{Amount, Transaction};

/// Everything [`crate::blockchain::Ledger::add_transaction`] needs to admit a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub sender: String,
    pub recipient: String,
    pub value: Amount,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Wallet {
    keypair: KeyPair,
    address: String,
}

impl Wallet {
    pub fn generate() -> Result<Self, ChainError> {
        Ok(Self::from_keypair(KeyPair::generate()?))
    }

    pub fn from_keypair(keypair: KeyPair) -> Self {
        let address = keypair.address();
        Wallet { keypair, address }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public_key_bytes())
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.keypair.secret_key.secret_bytes())
    }

    /// Signs a transfer of `value` from this wallet to `recipient`.
    pub fn sign_transfer(&self, recipient: &str, value: Amount) -> Result<SignedTransfer, ChainError> {
        let tx = Transaction::new(self.address.as_str(), recipient, value)?;
        let signature = self.keypair.sign(&tx.signable_message())?;
        Ok(SignedTransfer {
            sender: self.address.clone(),
            recipient: recipient.to_string(),
            value,
            public_key: self.keypair.public_key_bytes().to_vec(),
            signature: signature.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, Secp256k1Verifier};

    #[test]
    fn test_wallet_address_matches_keypair() {
        let keypair = KeyPair::generate().unwrap();
        let expected = keypair.address();
        let wallet = Wallet::from_keypair(keypair);
        assert_eq!(wallet.address(), expected);
        assert_eq!(wallet.public_key_hex().len(), 66);
        assert_eq!(wallet.secret_key_hex().len(), 64);
    }

    #[test]
    fn test_two_wallets_differ() {
        let alice = Wallet::generate().unwrap();
        let bob = Wallet::generate().unwrap();
        assert_ne!(alice.address(), bob.address());
    }

    #[test]
    fn test_sign_transfer_verifies_against_message() {
        let wallet = Wallet::generate().unwrap();
        let transfer = wallet.sign_transfer("bob", Amount::from_num(1)).unwrap();
        assert_eq!(transfer.sender, wallet.address());

        let tx = Transaction::new(transfer.sender.as_str(), "bob", Amount::from_num(1)).unwrap();
        assert!(Secp256k1Verifier
            .check(&tx.signable_message(), &transfer.signature, &transfer.public_key)
            .is_ok());
    }

    #[test]
    fn test_sign_negative_transfer_fails() {
        let wallet = Wallet::generate().unwrap();
        let result = wallet.sign_transfer("bob", Amount::from_num(-2));
        assert!(matches!(result, Err(ChainError::InvalidAmount(_))));
    }
}
