use crate::transaction::{Amount, Transaction};

use super::chain::{Block, Sha256Hash};

/// The chain and the pending pool, guarded together by the ledger's lock.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub chain: Vec<Block>,
    pub pool: Vec<Transaction>,
}

impl LedgerState {
    pub fn new(genesis: Block) -> Self {
        Self {
            chain: vec![genesis],
            pool: Vec::new(),
        }
    }

    /// Hash of the newest block. The chain always holds at least the genesis
    /// block; an empty chain links to the zero block like genesis does.
    pub fn tip_hash(&self) -> Sha256Hash {
        self.chain
            .last()
            .map(Block::hash)
            .unwrap_or_else(|| Block::zero().hash())
    }

    /// Replays every mined transaction; pending transactions do not count.
    pub fn balance_of(&self, address: &str) -> Amount {
        let mut balance = Amount::ZERO;
        for tx in self.chain.iter().flat_map(|block| block.transactions.iter()) {
            if tx.sender().address() == Some(address) {
                balance = balance.saturating_sub(tx.value());
            }
            if tx.recipient() == address {
                balance = balance.saturating_add(tx.value());
            }
        }
        balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with(transactions: Vec<Transaction>) -> Block {
        Block::new(0, [0u8; 32], transactions)
    }

    #[test]
    fn test_balance_replays_chain() {
        let mut state = LedgerState::new(block_with(vec![]));
        state.chain.push(block_with(vec![
            Transaction::reward("M", Amount::from_num(5)).unwrap(),
            Transaction::new("M", "A", Amount::from_num(2)).unwrap(),
        ]));
        state.chain.push(block_with(vec![
            Transaction::new("A", "B", Amount::from_num(0.5)).unwrap(),
        ]));

        assert_eq!(state.balance_of("M"), Amount::from_num(3));
        assert_eq!(state.balance_of("A"), Amount::from_num(1.5));
        assert_eq!(state.balance_of("B"), Amount::from_num(0.5));
        assert_eq!(state.balance_of("nobody"), Amount::ZERO);
    }

    #[test]
    fn test_pool_not_counted() {
        let mut state = LedgerState::new(block_with(vec![]));
        state
            .pool
            .push(Transaction::reward("M", Amount::from_num(5)).unwrap());
        assert_eq!(state.balance_of("M"), Amount::ZERO);
    }

    #[test]
    fn test_self_transfer_is_neutral() {
        let mut state = LedgerState::new(block_with(vec![
            Transaction::reward("A", Amount::from_num(4)).unwrap(),
        ]));
        state.chain.push(block_with(vec![
            Transaction::new("A", "A", Amount::from_num(4)).unwrap(),
        ]));
        assert_eq!(state.balance_of("A"), Amount::from_num(4));
    }

    #[test]
    fn test_tip_hash_tracks_last_block() {
        let genesis = block_with(vec![]);
        let mut state = LedgerState::new(genesis.clone());
        assert_eq!(state.tip_hash(), genesis.hash());

        let next = Block::new(7, genesis.hash(), vec![]);
        state.chain.push(next.clone());
        assert_eq!(state.tip_hash(), next.hash());
    }
}
