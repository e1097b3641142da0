use crate::config::LedgerConfig;
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use crate::error::ChainError;
use crate::miner::{self, CancelToken, Difficulty};
use crate::transaction::{Amount, Sender, Transaction};
use crate::wallet::SignedTransfer;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, info, warn};

use super::state::LedgerState;
use super::validation::validate_chain;

pub type Sha256Hash = [u8; 32];

/// Encodes a transaction list for hashing: count (u64 LE) followed by each
/// transaction's canonical bytes, in order.
pub fn encode_transactions(transactions: &[Transaction]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(transactions.len() as u64).to_le_bytes());
    for tx in transactions {
        tx.write_canonical(&mut out);
    }
    out
}

/// SHA-256 over `nonce ‖ previous_hash ‖ encoded_transactions`.
pub fn block_digest(nonce: u64, previous_hash: &Sha256Hash, encoded_transactions: &[u8]) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(nonce.to_le_bytes());
    hasher.update(previous_hash);
    hasher.update(encoded_transactions);
    hasher.finalize().into()
}

mod hex_hash {
    use super::Sha256Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Sha256Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Sha256Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut hash = [0u8; 32];
        hex::decode_to_slice(&s, &mut hash).map_err(serde::de::Error::custom)?;
        Ok(hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub nonce: u64,
    #[serde(with = "hex_hash")]
    pub previous_hash: Sha256Hash,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(nonce: u64, previous_hash: Sha256Hash, transactions: Vec<Transaction>) -> Self {
        Block {
            nonce,
            previous_hash,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            transactions,
        }
    }

    /// The zero-value block whose hash genesis links to.
    pub fn zero() -> Self {
        Block {
            nonce: 0,
            previous_hash: [0u8; 32],
            timestamp: 0,
            transactions: Vec::new(),
        }
    }

    /// Digest of `{nonce, previous_hash, transactions}`.
    ///
    /// The timestamp is not hashed: the same nonce, link and transactions
    /// mined at different instants produce the same hash.
    pub fn hash(&self) -> Sha256Hash {
        block_digest(
            self.nonce,
            &self.previous_hash,
            &encode_transactions(&self.transactions),
        )
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "nonce          {}", self.nonce)?;
        writeln!(f, "previous_hash  {}", hex::encode(self.previous_hash))?;
        writeln!(f, "timestamp      {}", self.timestamp)?;
        for tx in &self.transactions {
            writeln!(f, "{}", tx)?;
        }
        Ok(())
    }
}

/// In-memory ledger: a hash-linked chain of blocks plus the pool of admitted,
/// not yet mined transactions.
///
/// `{chain, pool}` sit behind one lock so readers observe either the state
/// before a block is committed or the state after it. Mining attempts are
/// serialized by a second lock and run the nonce search without holding the
/// state lock.
pub struct Ledger {
    state: RwLock<LedgerState>,
    mining: Mutex<()>,
    reward_address: String,
    difficulty: Difficulty,
    mining_reward: Amount,
    verifier: Box<dyn SignatureVerifier>,
    span: tracing::Span,
}

impl Ledger {
    /// Create a ledger with default difficulty and reward, secp256k1 signature
    /// checks and a `ledger` tracing span.
    pub fn new(reward_address: impl Into<String>) -> Self {
        Self::new_with_options(
            reward_address,
            LedgerConfig::default(),
            Box::new(Secp256k1Verifier),
            tracing::info_span!("ledger"),
        )
    }

    /// Create a ledger with an injected configuration, signing capability and span.
    pub fn new_with_options(
        reward_address: impl Into<String>,
        config: LedgerConfig,
        verifier: Box<dyn SignatureVerifier>,
        span: tracing::Span,
    ) -> Self {
        let reward_address = reward_address.into();
        let genesis = Block::new(0, Block::zero().hash(), Vec::new());
        span.in_scope(|| {
            info!(
                reward_address = %reward_address,
                difficulty = config.difficulty.get(),
                genesis = %genesis.hash_hex(),
                "created genesis block"
            )
        });

        Ledger {
            state: RwLock::new(LedgerState::new(genesis)),
            mining: Mutex::new(()),
            reward_address,
            difficulty: config.difficulty,
            mining_reward: config.mining_reward,
            verifier,
            span,
        }
    }

    pub fn reward_address(&self) -> &str {
        &self.reward_address
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn mining_reward(&self) -> Amount {
        self.mining_reward
    }

    /// Admits a transfer into the pending pool. Returns false, leaving the
    /// ledger untouched, when the value is negative, the signature does not
    /// verify, or the sender's mined balance is below `value`.
    pub fn add_transaction(
        &self,
        sender: &str,
        recipient: &str,
        value: Amount,
        public_key: &[u8],
        signature: &[u8],
    ) -> bool {
        match self.try_add_transaction(sender, recipient, value, public_key, signature) {
            Ok(()) => true,
            Err(e) => {
                self.span
                    .in_scope(|| debug!(sender, recipient, %value, "transaction rejected: {}", e));
                false
            }
        }
    }

    /// Like [`Ledger::add_transaction`], naming the reason for a rejection.
    pub fn try_add_transaction(
        &self,
        sender: &str,
        recipient: &str,
        value: Amount,
        public_key: &[u8],
        signature: &[u8],
    ) -> Result<(), ChainError> {
        let tx = Transaction::new(sender, recipient, value)?
            .with_signature(signature.to_vec(), public_key.to_vec());
        let mut state = self.state.write();
        self.admit(&mut state, tx)
    }

    /// Submits a transfer produced by [`crate::wallet::Wallet::sign_transfer`].
    pub fn add_signed_transfer(&self, transfer: &SignedTransfer) -> bool {
        self.add_transaction(
            &transfer.sender,
            &transfer.recipient,
            transfer.value,
            &transfer.public_key,
            &transfer.signature,
        )
    }

    fn admit(&self, state: &mut LedgerState, tx: Transaction) -> Result<(), ChainError> {
        match tx.sender() {
            Sender::Reward => {}
            Sender::Address(sender) => {
                tx.verify_attached(self.verifier.as_ref())?;
                let balance = state.balance_of(sender);
                if balance < tx.value() {
                    return Err(ChainError::InsufficientFunds {
                        address: sender.clone(),
                        balance: balance.to_string(),
                        requested: tx.value().to_string(),
                    });
                }
            }
        }
        state.pool.push(tx);
        Ok(())
    }

    /// Independent copies of the pending pool, in admission order.
    pub fn copy_pending_transactions(&self) -> Vec<Transaction> {
        self.state.read().pool.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.state.read().pool.len()
    }

    /// Smallest nonce, scanning upward from zero, whose block hash over
    /// `(nonce, previous_hash, transactions)` meets `difficulty`.
    pub fn proof_of_work(
        transactions: &[Transaction],
        previous_hash: &Sha256Hash,
        difficulty: Difficulty,
    ) -> Result<u64, ChainError> {
        miner::proof_of_work(transactions, previous_hash, difficulty)
    }

    /// Mines one block: pending transactions plus this node's reward.
    pub fn mine(&self) -> bool {
        match self.mine_with_cancel(&CancelToken::new()) {
            Ok(_) => true,
            Err(e) => {
                self.span.in_scope(|| warn!("action=mining, status=failed: {}", e));
                false
            }
        }
    }

    /// Mines one block, abandoning the nonce search when `cancel` fires.
    ///
    /// The reward transaction joins the live pool while the search runs. A
    /// cancelled or failed search withdraws it again, leaving pool and chain as
    /// they were. On success the block is appended and the mined transactions
    /// leave the pool in the same write.
    pub fn mine_with_cancel(&self, cancel: &CancelToken) -> Result<Block, ChainError> {
        let _mining = self.mining.lock();
        let _enter = self.span.enter();

        let reward = Transaction::reward(self.reward_address.clone(), self.mining_reward)?;
        let (candidate, previous_hash, reward_index) = {
            let mut state = self.state.write();
            let mut candidate = state.pool.clone();
            let reward_index = candidate.len();
            self.admit(&mut state, reward.clone())?;
            candidate.push(reward);
            (candidate, state.tip_hash(), reward_index)
        };

        debug!(
            transactions = candidate.len(),
            previous_hash = %hex::encode(previous_hash),
            "searching for nonce"
        );

        let nonce = match miner::proof_of_work_with_cancel(
            &candidate,
            &previous_hash,
            self.difficulty,
            cancel,
        ) {
            Ok(nonce) => nonce,
            Err(e) => {
                let mut state = self.state.write();
                if reward_index < state.pool.len() {
                    state.pool.remove(reward_index);
                }
                warn!("action=mining, status=aborted: {}", e);
                return Err(e);
            }
        };

        let block = Block::new(nonce, previous_hash, candidate);
        {
            let mut state = self.state.write();
            let mined = (reward_index + 1).min(state.pool.len());
            state.pool.drain(..mined);
            state.chain.push(block.clone());
            info!(
                height = state.chain.len() - 1,
                nonce,
                hash = %block.hash_hex(),
                "action=mining, status=success"
            );
        }
        Ok(block)
    }

    /// Balance of `address` computed from mined blocks only.
    pub fn calculate_balance(&self, address: &str) -> Amount {
        self.state.read().balance_of(address)
    }

    pub fn valid_chain(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                self.span.in_scope(|| warn!("{}", e));
                false
            }
        }
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        validate_chain(&self.state.read().chain)
    }

    /// Snapshot of the chain.
    pub fn blocks(&self) -> Vec<Block> {
        self.state.read().chain.clone()
    }

    pub fn chain_len(&self) -> usize {
        self.state.read().chain.len()
    }

    pub fn last_block(&self) -> Option<Block> {
        self.state.read().chain.last().cloned()
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state.read();
        for (i, block) in state.chain.iter().enumerate() {
            writeln!(f, "{} Chain {} {}", "=".repeat(25), i, "=".repeat(25))?;
            write!(f, "{}", block)?;
            writeln!(f, "{}", "*".repeat(25))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::wallet::Wallet;

    /// Accepts any signature; isolates ledger rules from key handling.
    struct AcceptAll;

    impl SignatureVerifier for AcceptAll {
        fn verify(&self, _message: &[u8], _signature: &[u8], _public_key: &[u8]) -> bool {
            true
        }
    }

    fn test_ledger(reward_address: &str, reward: u32) -> Ledger {
        let config = LedgerConfig {
            difficulty: Difficulty::new(1).unwrap(),
            mining_reward: Amount::from_num(reward),
        };
        Ledger::new_with_options(
            reward_address,
            config,
            Box::new(AcceptAll),
            tracing::Span::none(),
        )
    }

    #[test]
    fn test_genesis_block() {
        let ledger = Ledger::new("M");
        let blocks = ledger.blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].nonce, 0);
        assert_eq!(blocks[0].previous_hash, Block::zero().hash());
        assert!(blocks[0].transactions.is_empty());
        assert_eq!(ledger.pending_len(), 0);
        assert_eq!(ledger.difficulty().get(), 4);
        assert_eq!(ledger.mining_reward(), Amount::from_num(5));
        assert!(ledger.valid_chain());
    }

    #[test]
    fn test_block_hash_excludes_timestamp() {
        let tx = Transaction::new("B", "A", Amount::from_num(1)).unwrap();
        let mut a = Block::new(3, [1u8; 32], vec![tx]);
        let before = a.hash();
        a.timestamp += 1_000;
        assert_eq!(a.hash(), before);
        assert_eq!(a.hash_hex().len(), 64);
    }

    #[test]
    fn test_mine_pays_reward_and_links() {
        let ledger = test_ledger("M", 5);
        assert!(ledger.mine());
        assert_eq!(ledger.chain_len(), 2);
        assert_eq!(ledger.pending_len(), 0);
        assert_eq!(ledger.calculate_balance("M"), Amount::from_num(5));

        let blocks = ledger.blocks();
        assert_eq!(blocks[1].previous_hash, blocks[0].hash());
        assert_eq!(blocks[1].transactions.len(), 1);
        assert!(blocks[1].transactions[0].sender().is_reward());
        assert!(blocks[1].hash_hex().starts_with('0'));
    }

    #[test]
    fn test_insufficient_funds_rejected() {
        let ledger = test_ledger("M", 5);
        let result = ledger.try_add_transaction("B", "A", Amount::from_num(1), &[], &[]);
        assert!(matches!(result, Err(ChainError::InsufficientFunds { .. })));
        assert_eq!(ledger.pending_len(), 0);
    }

    #[test]
    fn test_negative_value_rejected() {
        let ledger = test_ledger("M", 5);
        assert!(!ledger.add_transaction("M", "A", Amount::from_num(-1), &[], &[]));
        assert_eq!(ledger.pending_len(), 0);
    }

    #[test]
    fn test_pool_checks_against_mined_balance_only() {
        let ledger = test_ledger("M", 5);
        assert!(ledger.mine());
        assert!(ledger.add_transaction("M", "A", Amount::from_num(5), &[], &[]));
        // The first pending transfer is not subtracted from M's balance yet.
        assert!(ledger.add_transaction("M", "B", Amount::from_num(5), &[], &[]));
        assert_eq!(ledger.pending_len(), 2);
    }

    #[test]
    fn test_cancelled_mining_leaves_ledger_untouched() {
        let ledger = test_ledger("M", 5);
        assert!(ledger.mine());
        assert!(ledger.add_transaction("M", "A", Amount::from_num(2), &[], &[]));
        let pool_before = ledger.copy_pending_transactions();
        let chain_before = ledger.blocks();

        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            ledger.mine_with_cancel(&cancel),
            Err(ChainError::MiningCancelled)
        );
        assert_eq!(ledger.copy_pending_transactions(), pool_before);
        assert_eq!(ledger.blocks(), chain_before);
    }

    #[test]
    fn test_tampered_chain_detected() {
        let ledger = test_ledger("M", 5);
        assert!(ledger.mine());
        assert!(ledger.mine());
        assert!(ledger.valid_chain());

        ledger.state.write().chain[1].previous_hash = [0xFF; 32];
        assert!(!ledger.valid_chain());
        assert_eq!(
            ledger.validate(),
            Err(ChainError::ChainIntegrityViolation { height: 1 })
        );
    }

    #[test]
    fn test_real_signatures_required_by_default() {
        let wallet = Wallet::generate().unwrap();
        let other = KeyPair::generate().unwrap();
        let config = LedgerConfig {
            difficulty: Difficulty::new(1).unwrap(),
            mining_reward: Amount::from_num(10),
        };
        let ledger = Ledger::new_with_options(
            wallet.address(),
            config,
            Box::new(Secp256k1Verifier),
            tracing::Span::none(),
        );
        assert!(ledger.mine());

        let transfer = wallet.sign_transfer("A", Amount::from_num(4)).unwrap();
        let forged_key = other.public_key_bytes();
        let result = ledger.try_add_transaction(
            &transfer.sender,
            &transfer.recipient,
            transfer.value,
            &forged_key,
            &transfer.signature,
        );
        assert!(matches!(result, Err(ChainError::AuthenticationFailure(_))));
        assert!(ledger.add_signed_transfer(&transfer));
    }

    #[test]
    fn test_display_renders_every_block() {
        let ledger = test_ledger("M", 5);
        assert!(ledger.mine());
        let rendered = ledger.to_string();
        assert!(rendered.contains("Chain 0"));
        assert!(rendered.contains("Chain 1"));
        assert!(rendered.contains("THE BLOCKCHAIN"));
    }
}
