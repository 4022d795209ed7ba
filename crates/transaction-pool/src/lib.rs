//! Admission checks of the transaction pool.
//!
//! Every transaction entering the pool passes a [`TransactionValidator`]. The
//! [`SonicTransactionValidator`] runs four phases in order and rejects with the error of the
//! first phase that fails:
//!
//! 1. network rules: transaction types enabled by the active upgrades, gas limits, the sender's
//!    signature, intrinsic and floor data gas, and the minimum fee cap derived from the base fee.
//! 2. static rules: fee and tip caps, blob and authorization lists, the encoded size.
//! 3. pool rules: the minimum tip of non-local transactions.
//! 4. state rules: the sender's nonce and balance.
//!
//! Sponsorship requests, transactions with a gas price of zero, are exempt from the fee floors
//! while gas subsidies are active. Instead a
//! [`SubsidyChecker`](sonic_gas_subsidies::SubsidyChecker) has to confirm that a fund of the
//! registry pays for them.
//!
//! ## Feature Flags
//!
//! - `test-utils`: export of the test utilities of the dependencies.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod config;
pub mod error;
mod traits;
pub mod validate;

pub use config::{LocalTransactionConfig, DEFAULT_MAX_TX_INPUT_BYTES};
pub use error::InvalidPoolTransactionError;
pub use traits::{TransactionOrigin, ValidPoolTransaction};
pub use validate::{
    SonicTransactionValidator, SonicTransactionValidatorBuilder, TransactionValidationOutcome,
    TransactionValidator,
};
