//! The state database consumed by the ledger core.
//!
//! [`StateDb`] is the capability set block processing, scheduling and validation operate on.
//! [`MemoryStateDb`] is a journaled in-memory implementation computing a Merkle-Patricia state
//! root.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod journal;
mod memory;
mod root;
mod traits;

pub use memory::{MemoryStateDb, SharedState};
pub use root::{state_root, storage_root, TrieAccount};
pub use traits::{BalanceChangeReason, StateDb, StateReader, StateSnapshotProvider};
