use crate::memory::Account;
use alloy_primitives::{Address, Bytes, TxHash, B256, U256};

/// A reversible change of the state.
#[derive(Debug, Clone)]
pub(crate) enum JournalEntry {
    /// An account was created, replacing `prev`.
    AccountCreated { address: Address, prev: Option<Account> },
    BalanceChange { address: Address, prev: U256 },
    NonceChange { address: Address, prev: u64 },
    CodeChange { address: Address, prev_code: Bytes, prev_hash: B256 },
    /// `prev` is `None` if the slot was unset.
    StorageChange { address: Address, key: B256, prev: Option<B256> },
    /// The committed value of the slot was recorded by this change.
    OriginalRecorded { address: Address, key: B256 },
    TransientStorageChange { address: Address, key: B256, prev: B256 },
    SelfDestruct { address: Address, prev_balance: U256, was_destructed: bool },
    ContractCreated { address: Address },
    RefundChange { prev: u64 },
    AccessListAddAccount { address: Address },
    AccessListAddSlot { address: Address, slot: B256 },
    Touch { address: Address },
    AddLog { tx_hash: TxHash },
}

/// Ordered list of changes of the current transaction.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub(crate) fn push(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Current length, used as revision id.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes and returns the entries recorded after `revision`, newest first.
    pub(crate) fn drain_since(&mut self, revision: usize) -> impl Iterator<Item = JournalEntry> {
        let revision = revision.min(self.entries.len());
        self.entries.split_off(revision).into_iter().rev()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
