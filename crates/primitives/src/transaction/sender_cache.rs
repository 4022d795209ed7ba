use super::{ChainSigner, SignatureError, TransactionSigned};
use alloy_primitives::{Address, TxHash};
use parking_lot::{Mutex, RwLock};
use schnellru::{ByLength, LruMap};
use std::sync::{Arc, LazyLock};

/// Default number of senders kept by the process wide cache.
pub const DEFAULT_SENDER_CACHE_CAPACITY: u32 = 40_000;

/// The process wide cache, `None` after [`SenderCache::teardown_global`].
static GLOBAL: LazyLock<RwLock<Option<Arc<SenderCache>>>> = LazyLock::new(|| {
    RwLock::new(Some(Arc::new(SenderCache::new(DEFAULT_SENDER_CACHE_CAPACITY))))
});

/// Bounded LRU of recovered senders keyed by transaction hash.
///
/// An entry is only reused if it was recovered by an equal [`ChainSigner`]. Updates of the same
/// hash with a different signer overwrite the entry.
#[derive(Debug)]
pub struct SenderCache {
    inner: Mutex<LruMap<TxHash, (Address, ChainSigner), ByLength>>,
}

impl SenderCache {
    /// Creates an empty cache holding at most `capacity` senders.
    pub fn new(capacity: u32) -> Self {
        Self { inner: Mutex::new(LruMap::new(ByLength::new(capacity.max(1)))) }
    }

    /// Returns the cached sender of `hash` if it was recovered with `signer`.
    pub fn get(&self, hash: &TxHash, signer: &ChainSigner) -> Option<Address> {
        let mut inner = self.inner.lock();
        let (sender, cached_signer) = *inner.get(hash)?;
        (cached_signer == *signer).then_some(sender)
    }

    /// Records the sender of `hash` as recovered with `signer`.
    pub fn insert(&self, hash: TxHash, sender: Address, signer: ChainSigner) {
        self.inner.lock().insert(hash, (sender, signer));
    }

    /// Returns the number of cached senders.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the sender of `tx`, recovering and caching it on a miss.
    ///
    /// Internal transactions bypass the cache.
    pub fn sender(
        &self,
        signer: &ChainSigner,
        tx: &TransactionSigned,
    ) -> Result<Address, SignatureError> {
        if tx.is_internal() {
            return signer.sender(tx)
        }
        if let Some(sender) = self.get(&tx.hash(), signer) {
            return Ok(sender)
        }
        let sender = signer.sender(tx)?;
        self.insert(tx.hash(), sender, *signer);
        Ok(sender)
    }

    /// Returns the process wide cache, if enabled.
    pub fn global() -> Option<Arc<Self>> {
        GLOBAL.read().clone()
    }

    /// Replaces the process wide cache with an empty one of the given capacity.
    pub fn init_global(capacity: u32) {
        *GLOBAL.write() = Some(Arc::new(Self::new(capacity)));
    }

    /// Drops the process wide cache. Senders are recovered on every lookup until
    /// [`SenderCache::init_global`] is called again.
    pub fn teardown_global() {
        GLOBAL.write().take();
    }
}

impl ChainSigner {
    /// Derives the sender of `tx` through the process wide [`SenderCache`].
    pub fn sender_cached(&self, tx: &TransactionSigned) -> Result<Address, SignatureError> {
        match SenderCache::global() {
            Some(cache) => cache.sender(self, tx),
            None => self.sender(tx),
        }
    }
}
