//! Gas subsidies: transactions with a zero gas price paid from a fund of the on-chain
//! subsidies registry.
//!
//! A transaction is a sponsorship request if it is not internal, has a recipient and offers a
//! gas price of zero ([`is_sponsorship_request`]). The registry picks the fund paying for it
//! ([`is_covered`]). After the sponsored transaction executed, an internal fee-charge
//! transaction deducts the exact cost from the fund ([`fee_charge_transaction`]).
//!
//! Admission checks go through a [`SubsidyChecker`], usually a [`RegistryChecker`] behind a
//! [`SubsidyCheckCache`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod abi;
mod cache;
mod checker;
mod error;
mod fee;
mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::{
    CacheEntry, SubsidyCheckCache, DEFAULT_CACHE_BYTES, DEFAULT_MAX_VALIDITY, DEFAULT_MIN_VALIDITY,
};
pub use checker::{RegistryChecker, SubsidyChecker};
pub use error::SubsidyError;
pub use fee::{fee_charge_transaction, sponsored_fee};
pub use registry::{
    choose_fund, get_gas_config, is_covered, is_sponsorship_request, Coverage, FundId, GasConfig,
    GAS_CONFIG_CALL_GAS, REGISTRY_ADDRESS,
};
