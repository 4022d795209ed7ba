use crate::{
    journal::{Journal, JournalEntry},
    root::{state_root, storage_root, TrieAccount},
    BalanceChangeReason, StateDb, StateReader, StateSnapshotProvider,
};
use alloy_primitives::{
    keccak256, Address, BlockHash, BlockNumber, Bytes, Log, TxHash, B256, U256,
};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use sonic_primitives::{constants::KECCAK256_EMPTY, AccessList, IndexedLog};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::trace;

/// An account of the in-memory state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Account {
    pub(crate) balance: U256,
    pub(crate) nonce: u64,
    pub(crate) code: Bytes,
    pub(crate) code_hash: B256,
    pub(crate) storage: HashMap<B256, B256>,
}

impl Account {
    fn new(balance: U256) -> Self {
        Self {
            balance,
            nonce: 0,
            code: Bytes::new(),
            code_hash: KECCAK256_EMPTY,
            storage: HashMap::new(),
        }
    }

    /// Empty in the EIP-161 sense.
    fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == KECCAK256_EMPTY
    }
}

/// Journaled in-memory [`StateDb`].
///
/// Copies created with [`MemoryStateDb::non_committable_copy`] share nothing with the original.
#[derive(Debug, Clone)]
pub struct MemoryStateDb {
    accounts: HashMap<Address, Account>,
    journal: Journal,

    /// Committed values of the slots written by the current transaction.
    original_storage: HashMap<(Address, B256), B256>,
    transient_storage: HashMap<(Address, B256), B256>,
    self_destructed: HashSet<Address>,
    created: HashSet<Address>,
    touched: HashSet<Address>,
    refund: u64,
    warm_addresses: HashSet<Address>,
    warm_slots: HashSet<(Address, B256)>,

    tx_hash: TxHash,
    tx_index: usize,
    logs: HashMap<TxHash, Vec<IndexedLog>>,
    log_count: u32,

    block: Option<BlockNumber>,
    last_committed_block: Option<BlockNumber>,
    committable: bool,
}

impl Default for MemoryStateDb {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStateDb {
    /// Creates an empty, committable state.
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            journal: Journal::default(),
            original_storage: HashMap::new(),
            transient_storage: HashMap::new(),
            self_destructed: HashSet::new(),
            created: HashSet::new(),
            touched: HashSet::new(),
            refund: 0,
            warm_addresses: HashSet::new(),
            warm_slots: HashSet::new(),
            tx_hash: TxHash::ZERO,
            tx_index: 0,
            logs: HashMap::new(),
            log_count: 0,
            block: None,
            last_committed_block: None,
            committable: true,
        }
    }

    /// Returns a copy of this state whose blocks are never committed.
    pub fn non_committable_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.committable = false;
        copy
    }

    /// Returns true if [`StateDb::end_block`] commits blocks.
    pub const fn is_committable(&self) -> bool {
        self.committable
    }

    /// Number of the last committed block.
    pub const fn last_committed_block(&self) -> Option<BlockNumber> {
        self.last_committed_block
    }

    /// Number of accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn touch(&mut self, address: Address) {
        if self.touched.insert(address) {
            self.journal.push(JournalEntry::Touch { address });
        }
    }

    /// Returns the account, creating it if needed.
    fn account_mut(&mut self, address: Address) -> &mut Account {
        self.touch(address);
        let journal = &mut self.journal;
        self.accounts.entry(address).or_insert_with(|| {
            journal.push(JournalEntry::AccountCreated { address, prev: None });
            Account::new(U256::ZERO)
        })
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        let account = self.account_mut(address);
        let prev = account.balance;
        account.balance = balance;
        self.journal.push(JournalEntry::BalanceChange { address, prev });
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountCreated { address, prev } => match prev {
                Some(prev) => {
                    self.accounts.insert(address, prev);
                }
                None => {
                    self.accounts.remove(&address);
                }
            },
            JournalEntry::BalanceChange { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.balance = prev;
                }
            }
            JournalEntry::NonceChange { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.nonce = prev;
                }
            }
            JournalEntry::CodeChange { address, prev_code, prev_hash } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.code = prev_code;
                    account.code_hash = prev_hash;
                }
            }
            JournalEntry::StorageChange { address, key, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    match prev {
                        Some(prev) => account.storage.insert(key, prev),
                        None => account.storage.remove(&key),
                    };
                }
            }
            JournalEntry::OriginalRecorded { address, key } => {
                self.original_storage.remove(&(address, key));
            }
            JournalEntry::TransientStorageChange { address, key, prev } => {
                self.transient_storage.insert((address, key), prev);
            }
            JournalEntry::SelfDestruct { address, prev_balance, was_destructed } => {
                if !was_destructed {
                    self.self_destructed.remove(&address);
                }
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.balance = prev_balance;
                }
            }
            JournalEntry::ContractCreated { address } => {
                self.created.remove(&address);
            }
            JournalEntry::RefundChange { prev } => self.refund = prev,
            JournalEntry::AccessListAddAccount { address } => {
                self.warm_addresses.remove(&address);
            }
            JournalEntry::AccessListAddSlot { address, slot } => {
                self.warm_slots.remove(&(address, slot));
            }
            JournalEntry::Touch { address } => {
                self.touched.remove(&address);
            }
            JournalEntry::AddLog { tx_hash } => {
                if let Some(logs) = self.logs.get_mut(&tx_hash) {
                    logs.pop();
                }
                self.log_count = self.log_count.saturating_sub(1);
            }
        }
    }
}

impl StateDb for MemoryStateDb {
    fn exist(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    fn empty(&self, address: Address) -> bool {
        self.accounts.get(&address).map_or(true, Account::is_empty)
    }

    fn create_account(&mut self, address: Address) {
        let prev = self.accounts.get(&address).cloned();
        let balance = prev.as_ref().map(|account| account.balance).unwrap_or_default();
        self.journal.push(JournalEntry::AccountCreated { address, prev });
        self.accounts.insert(address, Account::new(balance));
        self.touch(address);
    }

    fn create_contract(&mut self, address: Address) {
        if self.created.insert(address) {
            self.journal.push(JournalEntry::ContractCreated { address });
        }
    }

    fn balance(&self, address: Address) -> U256 {
        self.accounts.get(&address).map(|account| account.balance).unwrap_or_default()
    }

    fn add_balance(&mut self, address: Address, amount: U256, reason: BalanceChangeReason) {
        trace!(target: "state", %address, %amount, ?reason, "add balance");
        let balance = self.balance(address).saturating_add(amount);
        self.set_balance(address, balance);
    }

    fn sub_balance(&mut self, address: Address, amount: U256, reason: BalanceChangeReason) {
        trace!(target: "state", %address, %amount, ?reason, "sub balance");
        let balance = self.balance(address).saturating_sub(amount);
        self.set_balance(address, balance);
    }

    fn nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map(|account| account.nonce).unwrap_or_default()
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        let account = self.account_mut(address);
        let prev = account.nonce;
        account.nonce = nonce;
        self.journal.push(JournalEntry::NonceChange { address, prev });
    }

    fn code(&self, address: Address) -> Bytes {
        self.accounts.get(&address).map(|account| account.code.clone()).unwrap_or_default()
    }

    fn code_hash(&self, address: Address) -> B256 {
        self.accounts.get(&address).map(|account| account.code_hash).unwrap_or_default()
    }

    fn code_size(&self, address: Address) -> usize {
        self.accounts.get(&address).map_or(0, |account| account.code.len())
    }

    fn set_code(&mut self, address: Address, code: Bytes) {
        let code_hash = if code.is_empty() { KECCAK256_EMPTY } else { keccak256(&code) };
        let account = self.account_mut(address);
        let prev_code = std::mem::replace(&mut account.code, code);
        let prev_hash = std::mem::replace(&mut account.code_hash, code_hash);
        self.journal.push(JournalEntry::CodeChange { address, prev_code, prev_hash });
    }

    fn storage(&self, address: Address, key: B256) -> B256 {
        self.accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key).copied())
            .unwrap_or_default()
    }

    fn committed_storage(&self, address: Address, key: B256) -> B256 {
        match self.original_storage.get(&(address, key)) {
            Some(value) => *value,
            None => self.storage(address, key),
        }
    }

    fn set_storage(&mut self, address: Address, key: B256, value: B256) {
        let account = self.account_mut(address);
        let prev = account.storage.insert(key, value);
        self.journal.push(JournalEntry::StorageChange { address, key, prev });
        if let std::collections::hash_map::Entry::Vacant(entry) =
            self.original_storage.entry((address, key))
        {
            entry.insert(prev.unwrap_or_default());
            self.journal.push(JournalEntry::OriginalRecorded { address, key });
        }
    }

    fn transient_storage(&self, address: Address, key: B256) -> B256 {
        self.transient_storage.get(&(address, key)).copied().unwrap_or_default()
    }

    fn set_transient_storage(&mut self, address: Address, key: B256, value: B256) {
        let prev = self.transient_storage.insert((address, key), value).unwrap_or_default();
        self.journal.push(JournalEntry::TransientStorageChange { address, key, prev });
    }

    fn self_destruct(&mut self, address: Address) {
        let Some(account) = self.accounts.get_mut(&address) else { return };
        let prev_balance = std::mem::take(&mut account.balance);
        let was_destructed = !self.self_destructed.insert(address);
        self.journal.push(JournalEntry::SelfDestruct { address, prev_balance, was_destructed });
    }

    fn has_self_destructed(&self, address: Address) -> bool {
        self.self_destructed.contains(&address)
    }

    fn created_in_transaction(&self, address: Address) -> bool {
        self.created.contains(&address)
    }

    fn add_refund(&mut self, gas: u64) {
        self.journal.push(JournalEntry::RefundChange { prev: self.refund });
        self.refund = self.refund.saturating_add(gas);
    }

    fn sub_refund(&mut self, gas: u64) {
        self.journal.push(JournalEntry::RefundChange { prev: self.refund });
        self.refund = self.refund.saturating_sub(gas);
    }

    fn refund(&self) -> u64 {
        self.refund
    }

    fn prepare(
        &mut self,
        sender: Address,
        coinbase: Option<Address>,
        destination: Option<Address>,
        precompiles: &[Address],
        access_list: Option<&AccessList>,
    ) {
        self.warm_addresses.clear();
        self.warm_slots.clear();
        self.transient_storage.clear();
        self.refund = 0;

        self.warm_addresses.insert(sender);
        self.warm_addresses.extend(destination);
        self.warm_addresses.extend(coinbase);
        self.warm_addresses.extend(precompiles.iter().copied());
        for item in access_list.into_iter().flat_map(|list| list.iter()) {
            self.warm_addresses.insert(item.address);
            for slot in &item.storage_keys {
                self.warm_slots.insert((item.address, *slot));
            }
        }
    }

    fn add_address_to_access_list(&mut self, address: Address) {
        if self.warm_addresses.insert(address) {
            self.journal.push(JournalEntry::AccessListAddAccount { address });
        }
    }

    fn add_slot_to_access_list(&mut self, address: Address, slot: B256) {
        self.add_address_to_access_list(address);
        if self.warm_slots.insert((address, slot)) {
            self.journal.push(JournalEntry::AccessListAddSlot { address, slot });
        }
    }

    fn address_in_access_list(&self, address: Address) -> bool {
        self.warm_addresses.contains(&address)
    }

    fn slot_in_access_list(&self, address: Address, slot: B256) -> (bool, bool) {
        (self.warm_addresses.contains(&address), self.warm_slots.contains(&(address, slot)))
    }

    fn snapshot(&mut self) -> usize {
        self.journal.len()
    }

    fn revert_to_snapshot(&mut self, revision: usize) {
        let entries: Vec<_> = self.journal.drain_since(revision).collect();
        for entry in entries {
            self.undo(entry);
        }
    }

    fn set_tx_context(&mut self, tx_hash: TxHash, index: usize) {
        self.tx_hash = tx_hash;
        self.tx_index = index;
    }

    fn add_log(&mut self, log: Log) {
        let tx_hash = self.tx_hash;
        let log = IndexedLog {
            inner: log,
            block_number: self.block.unwrap_or_default(),
            block_hash: BlockHash::ZERO,
            transaction_hash: tx_hash,
            transaction_index: self.tx_index as u32,
            log_index: self.log_count,
        };
        self.logs.entry(tx_hash).or_default().push(log);
        self.log_count += 1;
        self.journal.push(JournalEntry::AddLog { tx_hash });
    }

    fn logs(
        &self,
        tx_hash: TxHash,
        block_number: BlockNumber,
        block_hash: BlockHash,
    ) -> Vec<IndexedLog> {
        self.logs
            .get(&tx_hash)
            .map(|logs| {
                logs.iter()
                    .cloned()
                    .map(|log| IndexedLog { block_number, block_hash, ..log })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn end_transaction(&mut self) {
        self.transient_storage.clear();
        self.warm_addresses.clear();
        self.warm_slots.clear();
    }

    fn finalise(&mut self, delete_empty_objects: bool) {
        for address in std::mem::take(&mut self.self_destructed) {
            self.accounts.remove(&address);
        }
        let touched = std::mem::take(&mut self.touched);
        if delete_empty_objects {
            for address in touched {
                if self.accounts.get(&address).is_some_and(Account::is_empty) {
                    self.accounts.remove(&address);
                }
            }
        }
        self.created.clear();
        self.original_storage.clear();
        self.journal.clear();
    }

    fn begin_block(&mut self, number: BlockNumber) {
        self.block = Some(number);
        self.logs.clear();
        self.log_count = 0;
    }

    fn end_block(&mut self, number: BlockNumber) {
        if self.committable {
            self.last_committed_block = Some(number);
        } else {
            trace!(target: "state", number, "discarding block of non-committable state");
        }
        self.logs.clear();
    }

    fn release(&mut self) {
        self.accounts.clear();
        self.logs.clear();
        self.journal.clear();
    }

    fn state_hash(&self) -> B256 {
        state_root(self.accounts.iter().map(|(address, account)| {
            (
                *address,
                TrieAccount {
                    nonce: account.nonce,
                    balance: account.balance,
                    storage_root: storage_root(&account.storage),
                    code_hash: account.code_hash,
                },
            )
        }))
    }
}

/// The latest state shared between block processing and its concurrent readers.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<MemoryStateDb>>,
}

impl SharedState {
    /// Wraps `state`.
    pub fn new(state: MemoryStateDb) -> Self {
        Self { inner: Arc::new(RwLock::new(state)) }
    }

    /// Locks the state for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, MemoryStateDb> {
        self.inner.read()
    }

    /// Locks the state for block processing.
    pub fn write(&self) -> RwLockWriteGuard<'_, MemoryStateDb> {
        self.inner.write()
    }
}

impl StateReader for SharedState {
    fn account_nonce(&self, address: Address) -> u64 {
        self.inner.read().nonce(address)
    }

    fn account_balance(&self, address: Address) -> U256 {
        self.inner.read().balance(address)
    }
}

impl StateSnapshotProvider for SharedState {
    fn state_snapshot(&self) -> Box<dyn StateDb + Send> {
        Box::new(self.inner.read().non_committable_copy())
    }
}
