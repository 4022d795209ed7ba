use crate::{BlockContext, CallKind, FrameResult, TxContext, VmError};
use alloy_primitives::{Address, Bytes, B256, U256};
use sonic_chainspec::EvmRules;
use sonic_state::StateDb;

/// Executes bytecode.
///
/// Implementations run the opcodes of a single frame and call back into the [`Host`] for state
/// access and nested frames. Precompiled contracts are run by the interpreter as well, their
/// frames carry empty code.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait Interpreter: Send + Sync {
    /// Runs `contract`. In `read_only` mode state modifications fail with
    /// [`VmError::WriteProtection`].
    fn run(&self, host: &mut dyn Host, contract: &Contract, read_only: bool) -> InterpreterResult;
}

/// What a frame executes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contract {
    /// `CALLER` of the frame.
    pub caller: Address,
    /// Account the frame runs on.
    pub address: Address,
    /// Account the code was loaded from.
    pub code_address: Address,
    /// `CALLVALUE` of the frame.
    pub value: U256,
    /// Calldata. Empty for creations.
    pub input: Bytes,
    /// Code, or init code for creations.
    pub code: Bytes,
    /// Gas available to the frame.
    pub gas: u64,
    /// Whether the frame runs init code.
    pub is_create: bool,
}

/// Outcome of running a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterResult {
    /// Return data, or the code to deploy for creations.
    pub output: Bytes,
    /// Gas not consumed.
    pub gas_left: u64,
    /// Set if the frame failed.
    pub error: Option<VmError>,
}

impl InterpreterResult {
    /// Successful result.
    pub const fn success(output: Bytes, gas_left: u64) -> Self {
        Self { output, gas_left, error: None }
    }

    /// Failed result.
    pub const fn failure(error: VmError, output: Bytes, gas_left: u64) -> Self {
        Self { output, gas_left, error: Some(error) }
    }
}

/// Inputs of a nested message call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInputs {
    /// Kind of call.
    pub kind: CallKind,
    /// `CALLER` of the new frame.
    pub caller: Address,
    /// Account the new frame runs on.
    pub target: Address,
    /// Account the code is loaded from.
    pub code_address: Address,
    /// Calldata.
    pub input: Bytes,
    /// Gas passed to the frame.
    pub gas: u64,
    /// Transferred for `CALL`, checked against the caller for `CALLCODE` and apparent for
    /// `DELEGATECALL`.
    pub value: U256,
}

impl CallInputs {
    /// A `CALL` of `to`.
    pub const fn call(caller: Address, to: Address, input: Bytes, gas: u64, value: U256) -> Self {
        Self { kind: CallKind::Call, caller, target: to, code_address: to, input, gas, value }
    }

    /// A `STATICCALL` of `to`.
    pub const fn static_call(caller: Address, to: Address, input: Bytes, gas: u64) -> Self {
        Self {
            kind: CallKind::StaticCall,
            caller,
            target: to,
            code_address: to,
            input,
            gas,
            value: U256::ZERO,
        }
    }
}

/// Inputs of a contract creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInputs {
    /// Creator.
    pub caller: Address,
    /// Init code.
    pub init_code: Bytes,
    /// Gas passed to the frame.
    pub gas: u64,
    /// Endowment.
    pub value: U256,
    /// Salt of `CREATE2`, `None` for `CREATE`.
    pub salt: Option<B256>,
}

/// Callbacks of the interpreter into the EVM.
pub trait Host {
    /// State of the running transaction.
    fn state(&mut self) -> &mut dyn StateDb;

    /// Block values.
    fn block(&self) -> &BlockContext;

    /// Transaction values.
    fn tx(&self) -> &TxContext;

    /// Network rules.
    fn rules(&self) -> &EvmRules;

    /// `BLOCKHASH`: zero outside the 256 blocks below the current one.
    fn block_hash(&self, number: u64) -> B256;

    /// Depth of the running frame, the outermost frame has depth one.
    fn depth(&self) -> usize;

    /// Runs a nested call frame.
    fn call(&mut self, inputs: CallInputs) -> FrameResult;

    /// Runs a nested creation frame.
    fn create(&mut self, inputs: CreateInputs) -> FrameResult;
}
