use crate::error::ChainError;

use super::chain::Block;

/// Checks that every block after genesis links to the hash of its predecessor.
pub fn validate_chain(blocks: &[Block]) -> Result<(), ChainError> {
    for (height, pair) in blocks.windows(2).enumerate() {
        if pair[1].previous_hash != pair[0].hash() {
            return Err(ChainError::ChainIntegrityViolation { height: height + 1 });
        }
    }
    Ok(())
}
