//! Proof-of-work search and the background miner

use crate::blockchain::{block_digest, encode_transactions, Ledger, Sha256Hash};
use crate::error::ChainError;
use crate::transaction::Transaction;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Number of leading `'0'` hex digits a block hash must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Difficulty(u32);

impl Difficulty {
    /// A SHA-256 digest renders as 64 hex digits.
    pub const MAX: u32 = 64;

    pub fn new(digits: u32) -> Result<Self, ChainError> {
        if digits > Self::MAX {
            return Err(ChainError::InvalidDifficulty(digits));
        }
        Ok(Difficulty(digits))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty(4)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared flag that asks a running nonce search to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// True when the lowercase hex rendering of `hash` starts with
/// `difficulty` zero digits.
pub fn meets_difficulty(hash: &Sha256Hash, difficulty: Difficulty) -> bool {
    (0..difficulty.get() as usize).all(|i| {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        nibble == 0
    })
}

pub fn valid_proof(
    nonce: u64,
    previous_hash: &Sha256Hash,
    transactions: &[Transaction],
    difficulty: Difficulty,
) -> bool {
    let encoded = encode_transactions(transactions);
    meets_difficulty(&block_digest(nonce, previous_hash, &encoded), difficulty)
}

/// Scans nonces upward from zero and returns the first that satisfies
/// `difficulty`.
pub fn proof_of_work(
    transactions: &[Transaction],
    previous_hash: &Sha256Hash,
    difficulty: Difficulty,
) -> Result<u64, ChainError> {
    proof_of_work_with_cancel(transactions, previous_hash, difficulty, &CancelToken::new())
}

/// Same search as [`proof_of_work`], checking `cancel` before every attempt.
pub fn proof_of_work_with_cancel(
    transactions: &[Transaction],
    previous_hash: &Sha256Hash,
    difficulty: Difficulty,
    cancel: &CancelToken,
) -> Result<u64, ChainError> {
    // Transactions are encoded once; only the nonce changes between attempts.
    let encoded = encode_transactions(transactions);
    let mut nonce = 0u64;
    loop {
        if cancel.is_cancelled() {
            return Err(ChainError::MiningCancelled);
        }
        if meets_difficulty(&block_digest(nonce, previous_hash, &encoded), difficulty) {
            return Ok(nonce);
        }
        nonce = nonce.checked_add(1).ok_or(ChainError::NonceSpaceExhausted)?;
    }
}

/// Mines pending transactions on a fixed interval until stopped.
pub struct AutoMiner {
    cancel: CancelToken,
    shutdown: Arc<Notify>,
    blocks_mined: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl AutoMiner {
    /// Spawns the mining loop on the current tokio runtime. Each search runs on
    /// the blocking pool so it never stalls async tasks.
    pub fn start(ledger: Arc<Ledger>, interval: Duration) -> Self {
        let cancel = CancelToken::new();
        let shutdown = Arc::new(Notify::new());
        let blocks_mined = Arc::new(AtomicU64::new(0));

        let task = {
            let cancel = cancel.clone();
            let shutdown = shutdown.clone();
            let blocks_mined = blocks_mined.clone();
            tokio::spawn(async move {
                info!(reward_address = ledger.reward_address(), "auto miner started");
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }

                    if ledger.pending_len() > 0 {
                        let ledger = ledger.clone();
                        let token = cancel.clone();
                        match tokio::task::spawn_blocking(move || ledger.mine_with_cancel(&token)).await {
                            Ok(Ok(_)) => {
                                blocks_mined.fetch_add(1, Ordering::SeqCst);
                            }
                            Ok(Err(ChainError::MiningCancelled)) => break,
                            Ok(Err(e)) => warn!("auto miner: {}", e),
                            Err(e) => {
                                error!("auto miner task failed: {}", e);
                                break;
                            }
                        }
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = shutdown.notified() => break,
                    }
                }
                info!("auto miner stopped");
            })
        };

        AutoMiner {
            cancel,
            shutdown,
            blocks_mined,
            task,
        }
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancels any in-flight search, waits for the loop to exit and returns
    /// the number of blocks it mined.
    pub async fn stop(self) -> u64 {
        self.cancel.cancel();
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            error!("auto miner task failed: {}", e);
        }
        self.blocks_mined.load(Ordering::SeqCst)
    }
}
