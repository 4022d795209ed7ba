use alloy_primitives::TxHash;
use sonic_primitives::SignatureError;

/// Errors aborting the processing of a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ProcessError {
    /// The sender of a transaction could not be derived.
    #[error(transparent)]
    Sender(#[from] SignatureError),
    /// The fee charge of a sponsored transaction did not succeed.
    #[error("fee charge {fee_charge} of sponsored transaction {sponsored} failed")]
    FeeChargeFailed {
        /// Hash of the sponsored transaction.
        sponsored: TxHash,
        /// Hash of the fee-charge transaction.
        fee_charge: TxHash,
    },
}
