/// Authenticity checks separated from type definitions
use crate::crypto::SignatureVerifier;
use crate::error::ChainError;
use crate::transaction::types::{Sender, Transaction};

impl Transaction {
    /// Checks `signature` over this transaction's signable message with the
    /// given public key. Rewards are minted by the ledger and always pass.
    pub fn verify(
        &self,
        verifier: &dyn SignatureVerifier,
        signature: &[u8],
        public_key: &[u8],
    ) -> bool {
        match self.sender() {
            Sender::Reward => true,
            Sender::Address(_) => {
                verifier.verify(&self.signable_message(), signature, public_key)
            }
        }
    }

    /// Verifies the signature and public key the transaction carries.
    pub fn verify_attached(&self, verifier: &dyn SignatureVerifier) -> Result<(), ChainError> {
        if self.sender().is_reward() {
            return Ok(());
        }

        let (signature, public_key) = match (self.signature(), self.public_key()) {
            (Some(sig), Some(pk)) => (sig, pk),
            _ => {
                return Err(ChainError::AuthenticationFailure(
                    "Transaction not signed".to_string(),
                ))
            }
        };

        if self.verify(verifier, signature, public_key) {
            Ok(())
        } else {
            Err(ChainError::AuthenticationFailure(format!(
                "Signature does not authorize transfer from {}",
                self.sender()
            )))
        }
    }
}
