//! Protocol constants.

use alloy_primitives::{b256, B256};

/// Maximum encoded size of a transaction accepted into the pool, 128 KiB.
pub const TX_MAX_SIZE: usize = 4 * 32 * 1024;

/// Gas charged for a plain value transfer.
pub const TX_GAS: u64 = 21_000;

/// Gas charged for a contract creation transaction.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;

/// Gas per zero byte of calldata.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Gas per non-zero byte of calldata before Istanbul.
pub const TX_DATA_NON_ZERO_GAS_FRONTIER: u64 = 68;

/// Gas per non-zero byte of calldata since Istanbul.
pub const TX_DATA_NON_ZERO_GAS_EIP2028: u64 = 16;

/// Gas per address in an access list.
pub const TX_ACCESS_LIST_ADDRESS_GAS: u64 = 2_400;

/// Gas per storage key in an access list.
pub const TX_ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1_900;

/// Gas per word of init code (EIP-3860).
pub const INIT_CODE_WORD_GAS: u64 = 2;

/// Maximum init code size (EIP-3860).
pub const MAX_INIT_CODE_SIZE: usize = 2 * 24_576;

/// Gas per authorization of a set-code transaction (EIP-7702).
pub const PER_EMPTY_ACCOUNT_COST: u64 = 25_000;

/// Calldata token cost of the EIP-7623 floor.
pub const TX_COST_FLOOR_PER_TOKEN: u64 = 10;

/// Calldata tokens per non-zero byte (EIP-7623).
pub const TX_TOKEN_PER_NON_ZERO_BYTE: u64 = 4;

/// Blob gas per blob (EIP-4844).
pub const DATA_GAS_PER_BLOB: u64 = 131_072;

/// Maximum refund quotient since London (EIP-3529).
pub const MAX_REFUND_QUOTIENT: u64 = 5;

/// Number of recent block hashes available to the `BLOCKHASH` opcode.
pub const BLOCK_HASH_HISTORY: u64 = 256;

/// Keccak256 of the RLP of an empty list, the ommers hash of every block.
pub const EMPTY_OMMER_ROOT_HASH: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

/// Keccak256 of the empty byte string, the code hash of accounts without code.
pub const KECCAK256_EMPTY: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

pub use alloy_trie::EMPTY_ROOT_HASH;
