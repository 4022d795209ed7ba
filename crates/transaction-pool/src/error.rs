//! Transaction pool errors

use alloy_primitives::U256;
use sonic_gas_subsidies::SubsidyError;
use sonic_primitives::{GotExpected, SignatureError, TxType};

/// Reasons a transaction is refused by the pool.
///
/// Submitters receive the error verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidPoolTransactionError {
    /// The sender could not be recovered from the signature.
    #[error("invalid sender: {0}")]
    InvalidSender(#[from] SignatureError),
    /// Internal transactions are created by the block processor only.
    #[error("internal transactions are not accepted")]
    InternalTransaction,
    /// The transaction type is not enabled by the active upgrades.
    #[error("transaction type {0} not supported")]
    TxTypeNotSupported(TxType),
    /// The init code of a creation exceeds the limit.
    #[error("max initcode size exceeded: code size {0}, limit {1}")]
    ExceedsMaxInitCodeSize(usize, usize),
    /// The gas limit exceeds the maximum gas of a single transaction.
    #[error("exceeds gas limit: transaction gas {0}, limit {1}")]
    ExceedsGasLimit(u64, u64),
    /// The fee cap is below the pool's minimum or the tip below the minimum tip.
    #[error("transaction underpriced")]
    Underpriced,
    /// The gas limit does not cover the intrinsic gas.
    #[error("intrinsic gas too low: {0}")]
    IntrinsicGasTooLow(GotExpected<u64>),
    /// The gas limit does not cover the floor data gas.
    #[error("insufficient gas for floor data gas cost: {0}")]
    FloorDataGasTooLow(GotExpected<u64>),
    /// The tip cap exceeds the fee cap.
    #[error("max priority fee per gas higher than max fee per gas")]
    TipAboveFeeCap,
    /// Blob transactions must not carry blobs.
    #[error("blob transaction with blobs")]
    NonEmptyBlobTx,
    /// Set-code transactions need at least one authorization.
    #[error("set-code transaction with empty authorization list")]
    EmptyAuthorizations,
    /// The encoded transaction exceeds the size limit.
    #[error("oversized data: transaction size {0}, limit {1}")]
    OversizedData(usize, usize),
    /// The nonce was already used by the sender.
    #[error("nonce too low: next nonce {state}, tx nonce {tx}")]
    NonceTooLow {
        /// Nonce of the transaction.
        tx: u64,
        /// Next nonce of the sender.
        state: u64,
    },
    /// The sender's balance does not cover `value + gas * fee_cap`.
    #[error("insufficient funds for gas * price + value: {0}")]
    InsufficientFunds(GotExpected<U256>),
    /// No fund of the registry pays for the sponsorship request.
    #[error("sponsorship rejected: no fund covers the transaction")]
    SponsorshipRejected,
    /// The subsidies registry is not deployed.
    #[error("gas subsidies registry is not deployed")]
    RegistryAbsent,
    /// The sponsored fee does not fit into 256 bits.
    #[error("sponsored transaction fee overflow")]
    FeeOverflow,
    /// The registry could not be queried.
    #[error(transparent)]
    Subsidy(SubsidyError),
}

impl InvalidPoolTransactionError {
    /// Returns true if the transaction was refused because of its price.
    ///
    /// Sponsorship rejections are not price rejections, the sender offered no price at all.
    pub const fn is_underpriced(&self) -> bool {
        matches!(self, Self::Underpriced)
    }

    /// Returns true if the error stems from the sponsorship check.
    pub const fn is_sponsorship_error(&self) -> bool {
        matches!(
            self,
            Self::SponsorshipRejected | Self::RegistryAbsent | Self::FeeOverflow | Self::Subsidy(_)
        )
    }
}

impl From<SubsidyError> for InvalidPoolTransactionError {
    fn from(err: SubsidyError) -> Self {
        match err {
            SubsidyError::RegistryAbsent => Self::RegistryAbsent,
            SubsidyError::FeeOverflow => Self::FeeOverflow,
            err => Self::Subsidy(err),
        }
    }
}
