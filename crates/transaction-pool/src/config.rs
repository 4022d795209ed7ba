use crate::TransactionOrigin;
use alloy_primitives::Address;
use sonic_primitives::constants::TX_MAX_SIZE;
use std::collections::HashSet;

/// Default maximum encoded size of a pooled transaction.
pub const DEFAULT_MAX_TX_INPUT_BYTES: usize = TX_MAX_SIZE;

/// Configuration of the exemptions local transactions enjoy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTransactionConfig {
    /// Treat all transactions as remote, regardless of their origin or sender.
    pub no_exemptions: bool,
    /// Senders whose transactions are always local.
    pub local_addresses: HashSet<Address>,
    /// Whether local transactions are propagated to peers.
    pub propagate_local_transactions: bool,
}

impl Default for LocalTransactionConfig {
    fn default() -> Self {
        Self {
            no_exemptions: false,
            local_addresses: HashSet::default(),
            propagate_local_transactions: true,
        }
    }
}

impl LocalTransactionConfig {
    /// Returns whether local exemptions are disabled.
    #[inline]
    pub const fn no_local_exemptions(&self) -> bool {
        self.no_exemptions
    }

    /// Returns whether `address` is a local sender.
    #[inline]
    pub fn contains_local_address(&self, address: &Address) -> bool {
        self.local_addresses.contains(address)
    }

    /// Returns whether a transaction of `sender` arriving from `origin` is local.
    ///
    /// Always false if exemptions are disabled.
    #[inline]
    pub fn is_local(&self, origin: TransactionOrigin, sender: &Address) -> bool {
        if self.no_local_exemptions() {
            return false
        }
        origin.is_local() || self.contains_local_address(sender)
    }

    /// Sets whether local transactions are propagated.
    pub const fn set_propagate_local_transactions(mut self, propagate: bool) -> Self {
        self.propagate_local_transactions = propagate;
        self
    }
}
