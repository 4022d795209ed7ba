//! Test helpers for running frames without a bytecode interpreter.

use crate::{
    system_calls::{HISTORY_SERVE_WINDOW, SYSTEM_ADDRESS},
    Contract, Host, Interpreter, InterpreterResult, VmError,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use sonic_state::StateDb;
use std::{collections::HashMap, fmt, sync::Arc};

/// A contract implemented in Rust.
pub type NativeContract =
    Arc<dyn Fn(&mut dyn Host, &Contract, bool) -> InterpreterResult + Send + Sync>;

/// [`Interpreter`] dispatching frames to native contracts by code address.
///
/// Frames of accounts without a native contract return immediately. Init code without a native
/// contract returns itself, so it deploys its own bytes.
#[derive(Clone, Default)]
pub struct MockInterpreter {
    contracts: HashMap<Address, NativeContract>,
}

impl fmt::Debug for MockInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockInterpreter")
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MockInterpreter {
    /// Creates an interpreter without native contracts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `contract` for frames loading code from `address`.
    pub fn with_contract<F>(mut self, address: Address, contract: F) -> Self
    where
        F: Fn(&mut dyn Host, &Contract, bool) -> InterpreterResult + Send + Sync + 'static,
    {
        self.contracts.insert(address, Arc::new(contract));
        self
    }

    /// Adds the history storage contract, recording the parent hash sent by the system address.
    pub fn with_history_storage(self) -> Self {
        self.with_contract(crate::system_calls::HISTORY_STORAGE_ADDRESS, history_storage)
    }

    /// Gives `address` placeholder code so calls reach its native contract.
    pub fn deploy_native(state: &mut dyn StateDb, address: Address) {
        state.set_code(address, Bytes::from_static(&[0x00]));
    }
}

impl Interpreter for MockInterpreter {
    fn run(&self, host: &mut dyn Host, contract: &Contract, read_only: bool) -> InterpreterResult {
        match self.contracts.get(&contract.code_address) {
            Some(native) => native(host, contract, read_only),
            None if contract.is_create => {
                InterpreterResult::success(contract.code.clone(), contract.gas)
            }
            None => InterpreterResult::success(Bytes::new(), contract.gas),
        }
    }
}

fn history_storage(host: &mut dyn Host, contract: &Contract, read_only: bool) -> InterpreterResult {
    if contract.caller != SYSTEM_ADDRESS || contract.input.len() != 32 {
        return InterpreterResult::failure(VmError::Reverted, Bytes::new(), contract.gas)
    }
    if read_only {
        return InterpreterResult::failure(VmError::WriteProtection, Bytes::new(), 0)
    }
    let number = host.block().number.saturating_sub(1) % HISTORY_SERVE_WINDOW;
    let key = B256::from(U256::from(number));
    host.state().set_storage(contract.address, key, B256::from_slice(&contract.input));
    InterpreterResult::success(Bytes::new(), contract.gas.saturating_sub(22_100))
}
