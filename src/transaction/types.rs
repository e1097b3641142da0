/// Transaction types for linkledger
use crate::error::ChainError;
use fixed::types::I64F64;
use std::fmt;

/// Fixed-point decimal used for every transferred value and balance.
pub type Amount = I64F64;

/// Label rendered for system-minted rewards. Never compared against user input.
pub const REWARD_SENDER_LABEL: &str = "THE BLOCKCHAIN";

/// Origin of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Sender {
    /// A user-controlled blockchain address.
    Address(String),
    /// The ledger itself, minting a mining reward.
    Reward,
}

impl Sender {
    pub fn address(&self) -> Option<&str> {
        match self {
            Sender::Address(addr) => Some(addr),
            Sender::Reward => None,
        }
    }

    pub fn is_reward(&self) -> bool {
        matches!(self, Sender::Reward)
    }
}

impl From<&str> for Sender {
    fn from(addr: &str) -> Self {
        Sender::Address(addr.to_string())
    }
}

impl From<String> for Sender {
    fn from(addr: String) -> Self {
        Sender::Address(addr)
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Sender::Address(addr) => write!(f, "{}", addr),
            Sender::Reward => write!(f, "{}", REWARD_SENDER_LABEL),
        }
    }
}

/// A value transfer. Fields are private: a transaction never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    sender: Sender,
    recipient: String,
    value: Amount,
    signature: Option<Vec<u8>>,
    public_key: Option<Vec<u8>>,
}

impl Transaction {
    pub fn new(
        sender: impl Into<Sender>,
        recipient: impl Into<String>,
        value: Amount,
    ) -> Result<Self, ChainError> {
        if value < Amount::ZERO {
            return Err(ChainError::InvalidAmount(format!(
                "Transaction value cannot be negative: {}",
                value
            )));
        }
        Ok(Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            value,
            signature: None,
            public_key: None,
        })
    }

    /// Mining reward paid by the ledger to `recipient`.
    pub fn reward(recipient: impl Into<String>, value: Amount) -> Result<Self, ChainError> {
        Self::new(Sender::Reward, recipient, value)
    }

    /// Returns a copy carrying the authentication material it was admitted with.
    pub fn with_signature(mut self, signature: Vec<u8>, public_key: Vec<u8>) -> Self {
        self.signature = Some(signature);
        self.public_key = Some(public_key);
        self
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn public_key(&self) -> Option<&[u8]> {
        self.public_key.as_deref()
    }

    /// Appends the hashed form of this transaction to `out`.
    ///
    /// Layout: sender tag (0 = reward, 1 = address), length-prefixed sender
    /// address when present, length-prefixed recipient, value as little-endian
    /// fixed-point bytes. Authentication material is not part of the encoding.
    pub fn write_canonical(&self, out: &mut Vec<u8>) {
        match &self.sender {
            Sender::Reward => out.push(0),
            Sender::Address(addr) => {
                out.push(1);
                write_str(out, addr);
            }
        }
        write_str(out, &self.recipient);
        out.extend_from_slice(&self.value.to_le_bytes());
    }

    /// Bytes a sender signs to authorize this transfer.
    pub fn signable_message(&self) -> Vec<u8> {
        let mut message = Vec::new();
        message.extend_from_slice("TRANSFER:".as_bytes());
        self.write_canonical(&mut message);
        message
    }
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u64).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(f, "sender_blockchain_address     {}", self.sender)?;
        writeln!(f, "recipient_blockchain_address  {}", self.recipient)?;
        write!(f, "value                         {}", self.value)
    }
}
