//! EVM integration of the ledger core.
//!
//! Opcode execution is delegated to an [`Interpreter`]. This crate owns everything around it:
//! message call and creation frames ([`Evm`]), the state transition applying a [`Message`]
//! ([`apply_message`]), intrinsic gas, the block gas pool, the EIP-2935 system call and the
//! recent block hashes served to `BLOCKHASH`.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod block_hash;
mod config;
mod env;
mod error;
mod evm;
pub mod gas;
mod interpreter;
pub mod precompiles;
pub mod system_calls;
mod transition;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use block_hash::{BlockHashProvider, RecentBlockHashes};
pub use config::VmConfig;
pub use env::{BlockContext, EvmHeader, TxContext, BLOB_BASE_FEE};
pub use error::{StateTransitionError, VmError};
pub use evm::{
    delegation_code, delegation_target, CallKind, Evm, FrameResult, CALL_DEPTH_LIMIT,
    DELEGATION_PREFIX, MAX_CODE_SIZE,
};
pub use gas::{floor_data_gas, intrinsic_gas, GasPool};
pub use interpreter::{CallInputs, Contract, CreateInputs, Host, Interpreter, InterpreterResult};
pub use transition::{apply_message, ExecutionResult, Message};
