//! Network upgrades and the EVM rules they imply.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod spec;
mod upgrades;

pub use spec::{
    ChainSpec, ChainSpecBuilder, UpgradeActivation, DEFAULT_MAX_EVENT_GAS, SONIC_CHAIN_ID,
};
pub use upgrades::{EvmRules, Upgrades};
