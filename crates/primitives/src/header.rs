use crate::{constants::EMPTY_OMMER_ROOT_HASH, TransactionSigned};
use alloy_primitives::{keccak256, Address, BlockHash, BlockNumber, Bloom, Bytes, B256, B64, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use std::{fmt, time::Duration};

/// Nanoseconds in a second.
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Length of the encoded [`BlockExtra`].
const EXTRA_DATA_LEN: usize = 12;

/// A point in time with nanosecond precision, counted from the unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Creates a timestamp from whole seconds and the sub-second remainder.
    pub const fn from_parts(secs: u64, nanos: u32) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC).saturating_add(nanos as u64))
    }

    /// Nanoseconds since the unix epoch.
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Whole seconds, the precision exposed to the EVM.
    pub const fn secs(&self) -> u64 {
        self.0 / NANOS_PER_SEC
    }

    /// Sub-second remainder in nanoseconds.
    pub const fn subsec_nanos(&self) -> u32 {
        (self.0 % NANOS_PER_SEC) as u32
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs(), self.subsec_nanos())
    }
}

/// Errors decoding [`BlockExtra`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtraDataError {
    /// The extra data has the wrong length.
    #[error("invalid extra data length {0}, expected 12")]
    InvalidLength(usize),
    /// The sub-second part is not below one second.
    #[error("sub-second nanos out of range: {0}")]
    NanosOutOfRange(u32),
}

/// Content of the header extra data: the time information that does not fit the seconds
/// precision header timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BlockExtra {
    /// Sub-second part of the block time.
    pub subsec_nanos: u32,
    /// Time between the parent block and this block.
    pub duration: Duration,
}

impl BlockExtra {
    /// Encodes as 4 bytes of sub-second nanos followed by 8 bytes of duration nanos, big-endian.
    /// Durations above `u64::MAX` nanoseconds saturate.
    pub fn encode(&self) -> Bytes {
        let mut out = [0u8; EXTRA_DATA_LEN];
        out[..4].copy_from_slice(&self.subsec_nanos.to_be_bytes());
        let duration = u64::try_from(self.duration.as_nanos()).unwrap_or(u64::MAX);
        out[4..].copy_from_slice(&duration.to_be_bytes());
        Bytes::copy_from_slice(&out)
    }

    /// Decodes extra data produced by [`BlockExtra::encode`].
    pub fn decode(data: &[u8]) -> Result<Self, ExtraDataError> {
        let data: &[u8; EXTRA_DATA_LEN] =
            data.try_into().map_err(|_| ExtraDataError::InvalidLength(data.len()))?;
        let mut nanos = [0u8; 4];
        nanos.copy_from_slice(&data[..4]);
        let subsec_nanos = u32::from_be_bytes(nanos);
        if subsec_nanos as u64 >= NANOS_PER_SEC {
            return Err(ExtraDataError::NanosOutOfRange(subsec_nanos))
        }
        let mut duration = [0u8; 8];
        duration.copy_from_slice(&data[4..]);
        Ok(Self { subsec_nanos, duration: Duration::from_nanos(u64::from_be_bytes(duration)) })
    }
}

/// Ethereum shaped block header. Its hash is the block hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
pub struct Header {
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Always the hash of an empty list.
    pub ommers_hash: B256,
    /// Recipient of the tips.
    pub beneficiary: Address,
    /// State root after the block.
    pub state_root: B256,
    /// Root of the transaction trie.
    pub transactions_root: B256,
    /// Root of the receipt trie.
    pub receipts_root: B256,
    /// Union of the receipt blooms.
    pub logs_bloom: Bloom,
    /// `1` for blocks without randao, `0` otherwise.
    pub difficulty: U256,
    /// Block number.
    pub number: BlockNumber,
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas used by all transactions.
    pub gas_used: u64,
    /// Block time in whole seconds.
    pub timestamp: u64,
    /// Encoded [`BlockExtra`].
    pub extra_data: Bytes,
    /// The prev-randao value.
    pub mix_hash: B256,
    /// Always zero.
    pub nonce: B64,
    /// Base fee per gas.
    pub base_fee_per_gas: U256,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: B256::ZERO,
            ommers_hash: EMPTY_OMMER_ROOT_HASH,
            beneficiary: Address::ZERO,
            state_root: B256::ZERO,
            transactions_root: B256::ZERO,
            receipts_root: B256::ZERO,
            logs_bloom: Bloom::ZERO,
            difficulty: U256::from(1),
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_hash: B256::ZERO,
            nonce: B64::ZERO,
            base_fee_per_gas: U256::ZERO,
        }
    }
}

impl Header {
    /// Difficulty implied by a prev-randao value: `1` when it is zero (no randao), `0` otherwise.
    pub fn difficulty_for(prev_randao: B256) -> U256 {
        if prev_randao.is_zero() {
            U256::from(1)
        } else {
            U256::ZERO
        }
    }

    /// Computes the hash of the RLP encoded header.
    pub fn hash_slow(&self) -> BlockHash {
        keccak256(alloy_rlp::encode(self))
    }

    /// Decodes the extra data.
    pub fn extra(&self) -> Result<BlockExtra, ExtraDataError> {
        BlockExtra::decode(&self.extra_data)
    }

    /// Full precision block time, combining the timestamp with the extra data.
    pub fn time(&self) -> Result<Timestamp, ExtraDataError> {
        Ok(Timestamp::from_parts(self.timestamp, self.extra()?.subsec_nanos))
    }
}

/// A block with its hash and transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlock {
    /// The block header.
    pub header: Header,
    /// Hash of the header.
    pub hash: BlockHash,
    /// Transactions, including internal transactions, in execution order.
    pub transactions: Vec<TransactionSigned>,
}

impl SealedBlock {
    /// Seals `header`, computing its hash.
    pub fn new(header: Header, transactions: Vec<TransactionSigned>) -> Self {
        let hash = header.hash_slow();
        Self { header, hash, transactions }
    }

    /// Block number.
    pub const fn number(&self) -> BlockNumber {
        self.header.number
    }
}
