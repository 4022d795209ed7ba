use crate::transition::Message;
use alloy_primitives::{Address, BlockNumber, B256, U256};
use sonic_primitives::{Header, Timestamp};
use std::time::Duration;

/// Blob base fee exposed to the EVM.
///
/// Blob transactions never execute, so no fork has defined a real value yet.
pub const BLOB_BASE_FEE: U256 = U256::from_limbs([1, 0, 0, 0]);

/// The block a state processor or scheduler runs transactions in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvmHeader {
    /// Block number.
    pub number: BlockNumber,
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Receiver of the tips.
    pub coinbase: Address,
    /// Block time with nanosecond precision.
    pub time: Timestamp,
    /// Time since the previous block.
    pub duration: Duration,
    /// Gas available to the transactions of the block.
    pub gas_limit: u64,
    /// Prev-randao. Zero before the merge rules.
    pub prev_randao: B256,
    /// Base fee per gas.
    pub base_fee: U256,
    /// Blob base fee, [`BLOB_BASE_FEE`] if unset.
    pub blob_base_fee: Option<U256>,
}

impl EvmHeader {
    /// Returns the EVM view of this block.
    pub fn block_context(&self, chain_id: u64) -> BlockContext {
        BlockContext {
            chain_id,
            number: self.number,
            coinbase: self.coinbase,
            time: self.time,
            gas_limit: self.gas_limit,
            base_fee: self.base_fee,
            blob_base_fee: self.blob_base_fee.unwrap_or(BLOB_BASE_FEE),
            prev_randao: self.prev_randao,
            difficulty: Header::difficulty_for(self.prev_randao),
        }
    }
}

/// Block values visible to executing code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockContext {
    /// Chain id returned by `CHAINID`.
    pub chain_id: u64,
    /// Block number.
    pub number: BlockNumber,
    /// Receiver of the tips.
    pub coinbase: Address,
    /// Block time. `TIMESTAMP` returns the seconds.
    pub time: Timestamp,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Base fee per gas.
    pub base_fee: U256,
    /// Blob base fee per gas.
    pub blob_base_fee: U256,
    /// Prev-randao.
    pub prev_randao: B256,
    /// One before the merge rules, zero afterwards.
    pub difficulty: U256,
}

impl BlockContext {
    /// Block time in seconds.
    pub const fn timestamp(&self) -> u64 {
        self.time.secs()
    }
}

/// Transaction values visible to executing code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxContext {
    /// Sender of the transaction.
    pub origin: Address,
    /// Effective gas price.
    pub gas_price: U256,
    /// Blob hashes of the transaction.
    pub blob_hashes: Vec<B256>,
    /// Max fee per blob gas.
    pub blob_fee_cap: Option<U256>,
}

impl TxContext {
    /// Context of the transaction `msg` was created from.
    pub fn from_message(msg: &Message) -> Self {
        Self {
            origin: msg.from,
            gas_price: msg.gas_price,
            blob_hashes: msg.blob_hashes.clone(),
            blob_fee_cap: msg.blob_gas_fee_cap,
        }
    }
}
