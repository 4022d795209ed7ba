//! Configuration of the ledger core.
//!
//! The configuration is read from a TOML file with one table per component. Every field has a
//! default, so an empty file is a valid configuration:
//!
//! ```toml
//! [pool]
//! min_tip = "0x3b9aca00"
//! locals = ["0x00000000000000000000000000000000000000aa"]
//!
//! [subsidies]
//! min_validity = "200ms"
//! max_validity = "15s"
//!
//! [log]
//! format = "json"
//! filter = "info,scheduler=debug"
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod config;
mod error;

pub use config::{
    Config, LogConfig, PoolConfig, SchedulingConfig, SenderCacheConfig, SubsidiesConfig,
};
pub use error::ConfigError;
