use alloy_primitives::{Address, B256, U256};
use sonic_primitives::GotExpected;

/// Failure of a message call or creation frame.
///
/// Frames failing with anything but [`VmError::Reverted`] consume all of their gas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum VmError {
    /// `REVERT` was executed.
    #[error("execution reverted")]
    Reverted,
    /// The frame ran out of gas.
    #[error("out of gas")]
    OutOfGas,
    /// The code deposit of a creation could not be paid.
    #[error("contract creation code storage out of gas")]
    CodeStoreOutOfGas,
    /// The call depth limit was exceeded.
    #[error("max call depth exceeded")]
    Depth,
    /// The caller cannot afford the transferred value.
    #[error("insufficient balance for transfer")]
    InsufficientBalance,
    /// A contract already exists at the created address.
    #[error("contract address collision")]
    ContractAddressCollision,
    /// Deployed code exceeds the EIP-170 limit.
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,
    /// Init code exceeds the EIP-3860 limit.
    #[error("max initcode size exceeded")]
    MaxInitCodeSizeExceeded,
    /// Deployed code starts with `0xEF` (EIP-3541).
    #[error("invalid code: must not begin with 0xef")]
    InvalidCode,
    /// The nonce of the creator overflowed.
    #[error("nonce uint64 overflow")]
    NonceOverflow,
    /// State modification inside a static call.
    #[error("write protection")]
    WriteProtection,
    /// Any other error raised by the interpreter.
    #[error("{0}")]
    Interpreter(String),
}

/// Reasons a message cannot be applied at all.
///
/// A message failing with one of these has no result and changes no state once the caller
/// reverts to its snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StateTransitionError {
    /// The nonce is lower than the sender's.
    #[error("nonce too low: address {sender}, tx: {tx} state: {state}")]
    NonceTooLow {
        /// Sender.
        sender: Address,
        /// Nonce of the transaction.
        tx: u64,
        /// Nonce of the sender.
        state: u64,
    },
    /// The nonce is higher than the sender's.
    #[error("nonce too high: address {sender}, tx: {tx} state: {state}")]
    NonceTooHigh {
        /// Sender.
        sender: Address,
        /// Nonce of the transaction.
        tx: u64,
        /// Nonce of the sender.
        state: u64,
    },
    /// The sender's nonce cannot be incremented.
    #[error("nonce has max value: address {sender}, nonce: {nonce}")]
    NonceMax {
        /// Sender.
        sender: Address,
        /// Nonce of the sender.
        nonce: u64,
    },
    /// The sender has code that is not a delegation designator.
    #[error("sender not an eoa: address {sender}, codehash: {code_hash}")]
    SenderNoEoa {
        /// Sender.
        sender: Address,
        /// Hash of the sender's code.
        code_hash: B256,
    },
    /// The fee cap is below the base fee.
    #[error(
        "max fee per gas less than block base fee: address {sender}, maxFeePerGas: {fee_cap}, baseFee: {base_fee}"
    )]
    FeeCapTooLow {
        /// Sender.
        sender: Address,
        /// Max fee per gas.
        fee_cap: U256,
        /// Base fee of the block.
        base_fee: U256,
    },
    /// The tip cap is above the fee cap.
    #[error(
        "max priority fee per gas higher than max fee per gas: address {sender}, maxPriorityFeePerGas: {tip_cap}, maxFeePerGas: {fee_cap}"
    )]
    TipAboveFeeCap {
        /// Sender.
        sender: Address,
        /// Max priority fee per gas.
        tip_cap: U256,
        /// Max fee per gas.
        fee_cap: U256,
    },
    /// The sender cannot afford `gas * fee_cap + value`.
    #[error("insufficient funds for gas * price + value: address {sender} have {have} want {want}")]
    InsufficientFunds {
        /// Sender.
        sender: Address,
        /// Balance of the sender.
        have: U256,
        /// Required balance.
        want: U256,
    },
    /// The block gas pool cannot provide the gas limit.
    #[error("gas limit reached")]
    GasLimitReached,
    /// The gas limit is below the intrinsic gas.
    #[error("intrinsic gas too low: {0}")]
    IntrinsicGas(GotExpected<u64>),
    /// The gas limit is below the EIP-7623 floor.
    #[error("insufficient gas for floor data gas cost: {0}")]
    FloorDataGas(GotExpected<u64>),
    /// The sender cannot afford the value after buying gas.
    #[error("insufficient funds for transfer: address {sender}")]
    InsufficientFundsForTransfer {
        /// Sender.
        sender: Address,
    },
    /// Init code of a creation exceeds the EIP-3860 limit.
    #[error("max initcode size exceeded: code size {size} limit {limit}")]
    MaxInitCodeSizeExceeded {
        /// Size of the init code.
        size: usize,
        /// Maximum size.
        limit: usize,
    },
    /// Intrinsic gas does not fit into 64 bits.
    #[error("gas uint64 overflow")]
    GasUintOverflow,
    /// Set-code transaction without authorizations.
    #[error("EIP-7702 transaction with empty auth list")]
    EmptyAuthorizations,
    /// Set-code transaction without recipient.
    #[error("EIP-7702 transaction cannot be used to create contract")]
    SetCodeCreate,
}
