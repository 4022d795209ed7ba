use crate::{SubsidyChecker, SubsidyError};
use alloy_primitives::{Address, TxHash};
use parking_lot::Mutex;
use schnellru::{ByLength, LruMap};
use sonic_primitives::TransactionSigned;
use std::time::{Duration, Instant};
use tracing::trace;

/// Default memory budget of a [`SubsidyCheckCache`].
pub const DEFAULT_CACHE_BYTES: usize = 10 << 20;

/// Validity of an entry after its first check.
pub const DEFAULT_MIN_VALIDITY: Duration = Duration::from_millis(200);

/// Upper bound of the validity of an entry.
pub const DEFAULT_MAX_VALIDITY: Duration = Duration::from_secs(15);

/// A cached check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    /// Result of the last check.
    pub covered: bool,
    /// The result is reused until this instant.
    pub valid_until: Instant,
    /// Validity granted by the last check.
    pub validity: Duration,
}

/// [`SubsidyChecker`] caching the results of another checker by transaction hash.
///
/// Every expired lookup re-runs the check and doubles the validity of the entry, from the
/// minimum validity up to the maximum. Transactions that wait in the pool are thus re-checked
/// ever more rarely. Errors are not cached.
#[derive(Debug)]
pub struct SubsidyCheckCache<C> {
    checker: C,
    entries: Mutex<LruMap<TxHash, CacheEntry, ByLength>>,
    min_validity: Duration,
    max_validity: Duration,
}

impl<C: SubsidyChecker> SubsidyCheckCache<C> {
    /// Creates a cache of at most `bytes` in front of `checker`.
    pub fn new(checker: C, bytes: usize) -> Self {
        let capacity = (bytes / std::mem::size_of::<(TxHash, CacheEntry)>()).max(1);
        let capacity = u32::try_from(capacity).unwrap_or(u32::MAX);
        Self {
            checker,
            entries: Mutex::new(LruMap::new(ByLength::new(capacity))),
            min_validity: DEFAULT_MIN_VALIDITY,
            max_validity: DEFAULT_MAX_VALIDITY,
        }
    }

    /// Sets the validity bounds. `max` is raised to `min` if lower.
    pub fn with_validity(mut self, min: Duration, max: Duration) -> Self {
        self.min_validity = min;
        self.max_validity = max.max(min);
        self
    }

    /// The wrapped checker.
    pub const fn checker(&self) -> &C {
        &self.checker
    }

    /// The entry of `hash`, without promoting it.
    pub fn entry(&self, hash: &TxHash) -> Option<CacheEntry> {
        self.entries.lock().peek(hash).copied()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks `tx` at `now`, reusing a cached result that is still valid.
    pub fn is_covered_at(
        &self,
        now: Instant,
        tx: &TransactionSigned,
        sender: Address,
    ) -> Result<bool, SubsidyError> {
        let hash = tx.hash();
        let previous = self.entries.lock().get(&hash).copied();
        if let Some(entry) = previous.filter(|entry| entry.valid_until > now) {
            return Ok(entry.covered)
        }

        let covered = self.checker.is_covered(tx, sender)?;
        let validity = previous.map_or(self.min_validity, |entry| {
            entry.validity.saturating_mul(2).clamp(self.min_validity, self.max_validity)
        });
        trace!(target: "subsidies", ?hash, covered, ?validity, "refreshed subsidy check");
        let entry = CacheEntry { covered, valid_until: now + validity, validity };
        self.entries.lock().insert(hash, entry);
        Ok(covered)
    }
}

impl<C: SubsidyChecker> SubsidyChecker for SubsidyCheckCache<C> {
    fn is_covered(&self, tx: &TransactionSigned, sender: Address) -> Result<bool, SubsidyError> {
        self.is_covered_at(Instant::now(), tx, sender)
    }
}
