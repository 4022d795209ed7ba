//! Block processing.
//!
//! The [`StateProcessor`] runs the transactions of a block in order against a
//! [`StateDb`](sonic_state::StateDb). Transactions failing before execution are skipped: they
//! consume no gas and get no receipt. Transactions failing during execution consume gas and get
//! a failed receipt. Only an unrecoverable sender aborts the block.
//!
//! With gas subsidies enabled, every covered sponsorship request is followed by an internal
//! transaction charging its fee to the paying fund.
//!
//! [`seal_block`] assembles the final block from a processed transaction list.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
mod processor;
mod seal;

pub use error::ProcessError;
pub use processor::{
    ExecutableBlock, ProcessedBlock, ProcessedTransaction, StateProcessor, TransactionProcessor,
};
pub use seal::seal_block;
