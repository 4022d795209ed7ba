use alloy_primitives::{BlockNumber, B256};
use parking_lot::RwLock;
use sonic_evm::{BlockHashProvider, RecentBlockHashes};
use std::sync::Arc;

/// Recent block hashes shared between the replayer and the processor serving `BLOCKHASH`.
#[derive(Debug, Clone, Default)]
pub struct SharedBlockHashes {
    inner: Arc<RwLock<RecentBlockHashes>>,
}

impl SharedBlockHashes {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the hash of block `number`.
    pub fn insert(&self, number: BlockNumber, hash: B256) {
        self.inner.write().insert(number, hash);
    }
}

impl BlockHashProvider for SharedBlockHashes {
    fn block_hash(&self, number: BlockNumber) -> Option<B256> {
        self.inner.read().get(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_hashes() {
        let hashes = SharedBlockHashes::new();
        let provider: Arc<dyn BlockHashProvider> = Arc::new(hashes.clone());
        assert_eq!(provider.block_hash(7), None);

        hashes.insert(7, B256::with_last_byte(7));
        assert_eq!(provider.block_hash(7), Some(B256::with_last_byte(7)));
    }
}
