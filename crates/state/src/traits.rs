use alloy_primitives::{Address, BlockHash, BlockNumber, Bytes, Log, TxHash, B256, U256};
use sonic_primitives::{AccessList, IndexedLog};

/// Why a balance changed. Carried for tracers, it never influences execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceChangeReason {
    /// Allocation of the genesis block.
    Genesis,
    /// Value transfer of a message call or creation.
    Transfer,
    /// Up-front purchase of a transaction's gas.
    GasBuy,
    /// Refund of the unused gas.
    GasReturn,
    /// Tip paid to the block's coinbase.
    TipPayment,
    /// Balance moved to the beneficiary of a `SELFDESTRUCT`.
    SelfDestruct,
    /// Balance burnt by a `SELFDESTRUCT` to itself.
    SelfDestructBurn,
}

/// Mutable state a block is executed against.
///
/// Mutations are journaled: [`StateDb::snapshot`] returns a revision that
/// [`StateDb::revert_to_snapshot`] rolls back to. [`StateDb::finalise`] ends the journal of a
/// transaction, revisions taken before it are invalid afterwards.
///
/// Logs are collected per transaction, tagged with the context set by
/// [`StateDb::set_tx_context`].
#[auto_impl::auto_impl(&mut, Box)]
pub trait StateDb {
    /// Returns true if the account exists.
    fn exist(&self, address: Address) -> bool;

    /// Returns true if the account does not exist or is empty in the EIP-161 sense.
    fn empty(&self, address: Address) -> bool;

    /// Creates the account, keeping the balance of a previous account at the same address.
    fn create_account(&mut self, address: Address);

    /// Marks the account as a contract created by the current transaction.
    fn create_contract(&mut self, address: Address);

    /// Balance of the account.
    fn balance(&self, address: Address) -> U256;

    /// Adds `amount` to the balance, creating the account if needed.
    fn add_balance(&mut self, address: Address, amount: U256, reason: BalanceChangeReason);

    /// Subtracts `amount` from the balance. Callers check the balance first.
    fn sub_balance(&mut self, address: Address, amount: U256, reason: BalanceChangeReason);

    /// Nonce of the account.
    fn nonce(&self, address: Address) -> u64;

    /// Sets the nonce, creating the account if needed.
    fn set_nonce(&mut self, address: Address, nonce: u64);

    /// Code of the account.
    fn code(&self, address: Address) -> Bytes;

    /// Code hash of the account, zero for accounts that do not exist.
    fn code_hash(&self, address: Address) -> B256;

    /// Length of the code of the account.
    fn code_size(&self, address: Address) -> usize {
        self.code(address).len()
    }

    /// Sets the code, creating the account if needed.
    fn set_code(&mut self, address: Address, code: Bytes);

    /// Current value of a storage slot.
    fn storage(&self, address: Address, key: B256) -> B256;

    /// Value of a storage slot at the start of the current transaction.
    fn committed_storage(&self, address: Address, key: B256) -> B256;

    /// Sets a storage slot.
    fn set_storage(&mut self, address: Address, key: B256, value: B256);

    /// Value of a transient storage slot (EIP-1153).
    fn transient_storage(&self, address: Address, key: B256) -> B256;

    /// Sets a transient storage slot.
    fn set_transient_storage(&mut self, address: Address, key: B256, value: B256);

    /// Schedules the account for deletion at the end of the transaction and clears its balance.
    fn self_destruct(&mut self, address: Address);

    /// Returns true if the account self destructed in the current transaction.
    fn has_self_destructed(&self, address: Address) -> bool;

    /// Returns true if the account was created by the current transaction.
    fn created_in_transaction(&self, address: Address) -> bool;

    /// Adds to the refund counter.
    fn add_refund(&mut self, gas: u64);

    /// Subtracts from the refund counter.
    fn sub_refund(&mut self, gas: u64);

    /// Current refund counter.
    fn refund(&self) -> u64;

    /// Resets the per transaction access list, refund counter and transient storage, and warms
    /// the sender, destination, coinbase, precompiles and the transaction's access list.
    fn prepare(
        &mut self,
        sender: Address,
        coinbase: Option<Address>,
        destination: Option<Address>,
        precompiles: &[Address],
        access_list: Option<&AccessList>,
    );

    /// Adds an address to the access list.
    fn add_address_to_access_list(&mut self, address: Address);

    /// Adds a storage slot and its address to the access list.
    fn add_slot_to_access_list(&mut self, address: Address, slot: B256);

    /// Returns true if the address is warm.
    fn address_in_access_list(&self, address: Address) -> bool;

    /// Returns whether the address and the slot are warm.
    fn slot_in_access_list(&self, address: Address, slot: B256) -> (bool, bool);

    /// Takes a journal revision.
    fn snapshot(&mut self) -> usize;

    /// Reverts all changes made since `revision` was taken.
    fn revert_to_snapshot(&mut self, revision: usize);

    /// Sets the transaction that subsequent logs belong to.
    fn set_tx_context(&mut self, tx_hash: TxHash, index: usize);

    /// Records a log of the current transaction.
    fn add_log(&mut self, log: Log);

    /// Logs recorded for `tx_hash`, stamped with the given block number and hash.
    fn logs(&self, tx_hash: TxHash, block_number: BlockNumber, block_hash: BlockHash)
        -> Vec<IndexedLog>;

    /// Marks the end of a transaction.
    fn end_transaction(&mut self);

    /// Applies self-destructs, optionally deletes touched empty accounts (EIP-158), and clears
    /// the journal.
    fn finalise(&mut self, delete_empty_objects: bool);

    /// Starts a block.
    fn begin_block(&mut self, number: BlockNumber);

    /// Commits the block. Non-committable states discard it.
    fn end_block(&mut self, number: BlockNumber);

    /// Releases the resources of a non-committable snapshot.
    fn release(&mut self);

    /// Merkle-Patricia root of the current state.
    fn state_hash(&self) -> B256;
}

/// Read access to the latest committed account state, shared between threads.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait StateReader: Send + Sync {
    /// Nonce of the account.
    fn account_nonce(&self, address: Address) -> u64;

    /// Balance of the account.
    fn account_balance(&self, address: Address) -> U256;
}

/// Creates throwaway copies of the latest state.
///
/// A snapshot is not committable: [`StateDb::end_block`] discards its changes. Callers
/// [`release`](StateDb::release) it when done.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait StateSnapshotProvider: Send + Sync {
    /// Returns a non-committable copy of the latest state.
    fn state_snapshot(&self) -> Box<dyn StateDb + Send>;
}
