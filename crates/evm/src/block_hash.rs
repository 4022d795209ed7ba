use alloy_primitives::{BlockNumber, B256};
use sonic_primitives::constants::BLOCK_HASH_HISTORY;

/// Serves the hashes of previous blocks to `BLOCKHASH`.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait BlockHashProvider: Send + Sync {
    /// Hash of block `number`, if known.
    fn block_hash(&self, number: BlockNumber) -> Option<B256>;
}

const SLOTS: usize = BLOCK_HASH_HISTORY as usize;

/// Ring buffer of the last 256 block hashes, indexed by `number mod 256`.
#[derive(Debug, Clone)]
pub struct RecentBlockHashes {
    slots: Box<[Option<(BlockNumber, B256)>; SLOTS]>,
}

impl Default for RecentBlockHashes {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentBlockHashes {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self { slots: Box::new([None; SLOTS]) }
    }

    /// Records the hash of block `number`, replacing the block 256 below it.
    pub fn insert(&mut self, number: BlockNumber, hash: B256) {
        self.slots[(number % BLOCK_HASH_HISTORY) as usize] = Some((number, hash));
    }

    /// Hash of block `number` if it is still buffered.
    pub fn get(&self, number: BlockNumber) -> Option<B256> {
        match self.slots[(number % BLOCK_HASH_HISTORY) as usize] {
            Some((stored, hash)) if stored == number => Some(hash),
            _ => None,
        }
    }
}

impl BlockHashProvider for RecentBlockHashes {
    fn block_hash(&self, number: BlockNumber) -> Option<B256> {
        self.get(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_overwrites_old_blocks() {
        let mut hashes = RecentBlockHashes::new();
        hashes.insert(3, B256::with_last_byte(3));
        assert_eq!(hashes.block_hash(3), Some(B256::with_last_byte(3)));
        assert_eq!(hashes.block_hash(4), None);

        hashes.insert(3 + 256, B256::with_last_byte(4));
        assert_eq!(hashes.block_hash(3), None);
        assert_eq!(hashes.block_hash(259), Some(B256::with_last_byte(4)));
    }
}
