use alloy_primitives::{Address, TxHash};
use sonic_primitives::TransactionSigned;

/// Where a transaction entered the node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TransactionOrigin {
    /// Submitted through a trusted local interface.
    Local,
    /// Received from a peer or a public endpoint.
    External,
}

impl TransactionOrigin {
    /// Whether the transaction originates from a local source.
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// Whether the transaction originates from an external source.
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::External)
    }
}

/// A transaction that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPoolTransaction {
    /// The transaction.
    pub transaction: TransactionSigned,
    /// Recovered sender.
    pub sender: Address,
    /// Where the transaction came from.
    pub origin: TransactionOrigin,
    /// Whether the local exemptions applied.
    pub is_local: bool,
    /// Whether a fund of the subsidies registry pays for the transaction.
    pub sponsored: bool,
}

impl ValidPoolTransaction {
    /// Hash of the transaction.
    pub const fn hash(&self) -> TxHash {
        self.transaction.hash()
    }

    /// Nonce of the transaction.
    pub const fn nonce(&self) -> u64 {
        self.transaction.transaction().nonce()
    }
}
