//! Transaction validation abstractions.

use crate::{error::InvalidPoolTransactionError, TransactionOrigin, ValidPoolTransaction};
use alloy_primitives::{TxHash, U256};
use sonic_evm::EvmHeader;
use sonic_primitives::TransactionSigned;

mod sonic;

pub use sonic::{
    ensure_intrinsic_gas, ensure_max_init_code_size, SonicTransactionValidator,
    SonicTransactionValidatorBuilder,
};

/// Outcome of validating a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationOutcome {
    /// The transaction is valid at the current head.
    Valid {
        /// Balance of the sender at the time of validation.
        balance: U256,
        /// Next nonce of the sender at the time of validation.
        state_nonce: u64,
        /// The validated transaction.
        transaction: ValidPoolTransaction,
        /// Whether to propagate the transaction to peers.
        propagate: bool,
    },
    /// The transaction is invalid.
    ///
    /// This does not mean the transaction is invalid forever. A rejected sponsorship request
    /// may be accepted after its fund was topped up.
    Invalid(TransactionSigned, InvalidPoolTransactionError),
}

impl TransactionValidationOutcome {
    /// Hash of the validated transaction.
    pub const fn tx_hash(&self) -> TxHash {
        match self {
            Self::Valid { transaction, .. } => transaction.hash(),
            Self::Invalid(transaction, ..) => transaction.hash(),
        }
    }

    /// Returns true if the transaction is valid.
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Returns true if the transaction is invalid.
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(..))
    }

    /// Returns the error of an invalid transaction.
    pub const fn as_invalid(&self) -> Option<&InvalidPoolTransactionError> {
        match self {
            Self::Invalid(_, err) => Some(err),
            Self::Valid { .. } => None,
        }
    }

    /// Converts the outcome into a result.
    pub fn into_result(self) -> Result<ValidPoolTransaction, InvalidPoolTransactionError> {
        match self {
            Self::Valid { transaction, .. } => Ok(transaction),
            Self::Invalid(_, err) => Err(err),
        }
    }
}

/// Validates transactions against the latest state and the rules of the next block.
#[auto_impl::auto_impl(&, Arc)]
pub trait TransactionValidator: Send + Sync {
    /// Validates a single transaction.
    fn validate_transaction(
        &self,
        origin: TransactionOrigin,
        transaction: TransactionSigned,
    ) -> TransactionValidationOutcome;

    /// Validates all given transactions.
    ///
    /// Returns all outcomes for the given transactions in the same order.
    fn validate_transactions(
        &self,
        transactions: Vec<(TransactionOrigin, TransactionSigned)>,
    ) -> Vec<TransactionValidationOutcome> {
        transactions
            .into_iter()
            .map(|(origin, tx)| self.validate_transaction(origin, tx))
            .collect()
    }

    /// Invoked when the head block changes. `next` is the block following the new head.
    fn on_new_head_block(&self, _next: &EvmHeader) {}
}
