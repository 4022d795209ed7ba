use alloy_primitives::{BlockNumber, B256};
use sonic_executor::ProcessError;
use sonic_primitives::{ExtraDataError, GotExpected};

/// Mismatches between a replayed block and its recorded version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ReplayError {
    /// No block was given for the genesis.
    #[error("missing genesis block")]
    MissingGenesis,
    /// Blocks are not consecutive.
    #[error("unexpected block number: {0}")]
    UnexpectedNumber(GotExpected<BlockNumber>),
    /// The recorded extra data can't be decoded.
    #[error("block {number}: {source}")]
    ExtraData {
        /// Block number.
        number: BlockNumber,
        /// Decoding error.
        source: ExtraDataError,
    },
    /// Processing the block failed.
    #[error("block {number}: {source}")]
    Process {
        /// Block number.
        number: BlockNumber,
        /// Processing error.
        source: ProcessError,
    },
    /// The state root differs.
    #[error("block {number}: state root mismatch: {diff}")]
    StateRoot {
        /// Block number.
        number: BlockNumber,
        /// Computed and recorded root.
        diff: GotExpected<B256>,
    },
    /// The gas used differs.
    #[error("block {number}: gas used mismatch: {diff}")]
    GasUsed {
        /// Block number.
        number: BlockNumber,
        /// Computed and recorded gas.
        diff: GotExpected<u64>,
    },
    /// The receipts root differs.
    #[error("block {number}: receipts root mismatch: {diff}")]
    ReceiptsRoot {
        /// Block number.
        number: BlockNumber,
        /// Computed and recorded root.
        diff: GotExpected<B256>,
    },
    /// The block hash differs.
    #[error("block {number}: block hash mismatch: {diff}")]
    BlockHash {
        /// Block number.
        number: BlockNumber,
        /// Computed and recorded hash.
        diff: GotExpected<B256>,
    },
}

impl ReplayError {
    /// Number of the block the error occurred in, if any.
    pub const fn block_number(&self) -> Option<BlockNumber> {
        match self {
            Self::MissingGenesis | Self::UnexpectedNumber(_) => None,
            Self::ExtraData { number, .. } |
            Self::Process { number, .. } |
            Self::StateRoot { number, .. } |
            Self::GasUsed { number, .. } |
            Self::ReceiptsRoot { number, .. } |
            Self::BlockHash { number, .. } => Some(*number),
        }
    }
}
