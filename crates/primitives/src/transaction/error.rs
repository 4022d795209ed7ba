use super::TxType;

/// Errors raised while deriving the sender of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// `v`, `r` or `s` is outside the range accepted by the signer.
    #[error("invalid transaction v, r, s values")]
    InvalidSignatureValues,
    /// The chain id of the transaction does not match the signer's.
    #[error("invalid chain id for signer: have {got}, want {expected}")]
    InvalidChainId {
        /// Chain id of the transaction.
        got: u64,
        /// Chain id of the signer.
        expected: u64,
    },
    /// The signer does not know the transaction type.
    #[error("transaction type {0} not supported")]
    TxTypeNotSupported(TxType),
    /// Public key recovery failed.
    #[error("failed to recover the signer public key")]
    RecoveryFailed,
}
