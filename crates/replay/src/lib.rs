//! Verification of a chain by replaying its blocks.
//!
//! The [`Replayer`] applies a genesis as block 0 and then processes every block on top of the
//! state of its predecessor, checking the state root, the gas used, the receipts root and the
//! block hash the processing yields against the recorded block.
//!
//! Fee charges of sponsored transactions are part of the recorded blocks, so blocks are
//! processed without injecting them again.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod block_hashes;
mod error;
mod replayer;

pub use block_hashes::SharedBlockHashes;
pub use error::ReplayError;
pub use replayer::{apply_genesis, evm_header, Replayer};
