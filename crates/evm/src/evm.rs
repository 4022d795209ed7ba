use crate::{
    interpreter::{CallInputs, CreateInputs},
    precompiles, BlockContext, BlockHashProvider, Contract, Host, Interpreter, InterpreterResult,
    TxContext, VmConfig, VmError,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use sonic_chainspec::EvmRules;
use sonic_primitives::constants::{BLOCK_HASH_HISTORY, KECCAK256_EMPTY};
use sonic_state::{BalanceChangeReason, StateDb};
use tracing::trace;

/// Maximum depth of nested frames.
pub const CALL_DEPTH_LIMIT: usize = 1024;

/// Maximum size of deployed code (EIP-170).
pub const MAX_CODE_SIZE: usize = 24_576;

/// Gas per byte of deployed code.
const CREATE_DATA_GAS: u64 = 200;

/// Prefix of EIP-7702 delegation designators.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// Returns the address `code` delegates to if it is an EIP-7702 delegation designator.
pub fn delegation_target(code: &[u8]) -> Option<Address> {
    match code.strip_prefix(&DELEGATION_PREFIX) {
        Some(target) if target.len() == Address::len_bytes() => Some(Address::from_slice(target)),
        _ => None,
    }
}

/// Returns the delegation designator pointing to `target`.
pub fn delegation_code(target: Address) -> Bytes {
    let mut code = Vec::with_capacity(DELEGATION_PREFIX.len() + Address::len_bytes());
    code.extend_from_slice(&DELEGATION_PREFIX);
    code.extend_from_slice(target.as_slice());
    code.into()
}

/// Kind of a message call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `CALL`.
    Call,
    /// `CALLCODE`.
    CallCode,
    /// `DELEGATECALL`.
    DelegateCall,
    /// `STATICCALL`.
    StaticCall,
}

/// Outcome of a call or creation frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameResult {
    /// Return data.
    pub output: Bytes,
    /// Gas returned to the caller.
    pub gas_left: u64,
    /// Set if the frame failed. Its state changes are reverted.
    pub error: Option<VmError>,
    /// Address of the created contract.
    pub created_address: Option<Address>,
}

impl FrameResult {
    const fn ok(gas_left: u64) -> Self {
        Self { output: Bytes::new(), gas_left, error: None, created_address: None }
    }

    const fn failed(error: VmError, gas_left: u64) -> Self {
        Self { output: Bytes::new(), gas_left, error: Some(error), created_address: None }
    }

    /// Returns true if the frame succeeded.
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Message call and creation frames over a [`StateDb`].
///
/// Opcodes run in the [`Interpreter`], which re-enters the EVM through its [`Host`]
/// implementation for nested frames.
pub struct Evm<'a> {
    state: &'a mut dyn StateDb,
    interpreter: &'a dyn Interpreter,
    block_hashes: &'a dyn BlockHashProvider,
    block: BlockContext,
    tx: TxContext,
    rules: EvmRules,
    config: VmConfig,
    depth: usize,
    read_only: bool,
}

impl std::fmt::Debug for Evm<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evm")
            .field("block", &self.block)
            .field("tx", &self.tx)
            .field("rules", &self.rules)
            .field("config", &self.config)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl<'a> Evm<'a> {
    /// Creates an EVM for a block.
    pub fn new(
        state: &'a mut dyn StateDb,
        interpreter: &'a dyn Interpreter,
        block_hashes: &'a dyn BlockHashProvider,
        block: BlockContext,
        rules: EvmRules,
        config: VmConfig,
    ) -> Self {
        Self {
            state,
            interpreter,
            block_hashes,
            block,
            tx: TxContext::default(),
            rules,
            config,
            depth: 0,
            read_only: false,
        }
    }

    /// Sets the context of the next transaction.
    pub fn set_tx_context(&mut self, tx: TxContext) {
        self.tx = tx;
    }

    /// The state.
    pub fn state_mut(&mut self) -> &mut dyn StateDb {
        &mut *self.state
    }

    /// The state.
    pub fn state_ref(&self) -> &dyn StateDb {
        &*self.state
    }

    /// Block values.
    pub const fn block_context(&self) -> &BlockContext {
        &self.block
    }

    /// Network rules.
    pub const fn evm_rules(&self) -> &EvmRules {
        &self.rules
    }

    /// Configuration.
    pub const fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Mutable configuration.
    pub fn config_mut(&mut self) -> &mut VmConfig {
        &mut self.config
    }

    /// Code executed when calling `address` and the account it is loaded from, following an
    /// EIP-7702 delegation.
    pub fn resolve_code(&self, address: Address) -> (Address, Bytes) {
        let code = self.state.code(address);
        if self.rules.is_prague {
            if let Some(target) = delegation_target(&code) {
                return (target, self.state.code(target))
            }
        }
        (address, code)
    }

    /// Runs a message call frame.
    pub fn call(&mut self, inputs: CallInputs) -> FrameResult {
        let CallInputs { kind, caller, target, code_address, input, gas, value } = inputs;
        if self.depth > CALL_DEPTH_LIMIT {
            return FrameResult::failed(VmError::Depth, gas)
        }
        let transfers = matches!(kind, CallKind::Call | CallKind::CallCode) && !value.is_zero();
        if transfers && self.state.balance(caller) < value {
            return FrameResult::failed(VmError::InsufficientBalance, gas)
        }

        let snapshot = self.state.snapshot();
        let precompile = precompiles::is_precompile(code_address, &self.rules);
        match kind {
            CallKind::Call => {
                if !self.state.exist(target) {
                    if !precompile && value.is_zero() {
                        // EIP-158: calling a missing account without value does not create it
                        return FrameResult::ok(gas)
                    }
                    self.state.create_account(target);
                }
                self.transfer(caller, target, value);
            }
            // touch
            CallKind::StaticCall => {
                self.state.add_balance(target, U256::ZERO, BalanceChangeReason::Transfer)
            }
            CallKind::CallCode | CallKind::DelegateCall => {}
        }

        let (code_address, code) =
            if precompile { (code_address, Bytes::new()) } else { self.resolve_code(code_address) };
        if !precompile && code.is_empty() {
            return FrameResult::ok(gas)
        }

        let contract = Contract {
            caller,
            address: target,
            code_address,
            value,
            input,
            code,
            gas,
            is_create: false,
        };
        let read_only = self.read_only || kind == CallKind::StaticCall;
        let result = self.run(&contract, read_only);
        self.finish_frame(snapshot, result, None)
    }

    /// Runs a creation frame.
    pub fn create(&mut self, inputs: CreateInputs) -> FrameResult {
        let CreateInputs { caller, init_code, gas, value, salt } = inputs;
        if self.depth > CALL_DEPTH_LIMIT {
            return FrameResult::failed(VmError::Depth, gas)
        }
        if self.state.balance(caller) < value {
            return FrameResult::failed(VmError::InsufficientBalance, gas)
        }
        let nonce = self.state.nonce(caller);
        let Some(next_nonce) = nonce.checked_add(1) else {
            return FrameResult::failed(VmError::NonceOverflow, gas)
        };
        let address = match salt {
            Some(salt) => caller.create2_from_code(salt, &init_code),
            None => caller.create(nonce),
        };
        self.state.set_nonce(caller, next_nonce);
        if self.rules.is_berlin {
            self.state.add_address_to_access_list(address);
        }

        let code_hash = self.state.code_hash(address);
        if self.state.nonce(address) != 0 ||
            (code_hash != B256::ZERO && code_hash != KECCAK256_EMPTY)
        {
            trace!(target: "evm", %address, "contract address collision");
            return FrameResult::failed(VmError::ContractAddressCollision, 0)
        }

        let snapshot = self.state.snapshot();
        if !self.state.exist(address) {
            self.state.create_account(address);
        }
        self.state.create_contract(address);
        self.state.set_nonce(address, 1);
        self.transfer(caller, address, value);

        let contract = Contract {
            caller,
            address,
            code_address: address,
            value,
            input: Bytes::new(),
            code: init_code,
            gas,
            is_create: true,
        };
        let mut result = self.run(&contract, self.read_only);
        if result.error.is_none() {
            if let Err(err) = self.deposit_code(address, &mut result) {
                result.error = Some(err);
            }
        }
        self.finish_frame(snapshot, result, Some(address))
    }

    /// Checks and stores the code returned by init code.
    fn deposit_code(
        &mut self,
        address: Address,
        result: &mut InterpreterResult,
    ) -> Result<(), VmError> {
        if result.output.len() > MAX_CODE_SIZE {
            return Err(VmError::MaxCodeSizeExceeded)
        }
        if self.rules.is_london && result.output.first() == Some(&0xef) {
            return Err(VmError::InvalidCode)
        }
        let deposit = result.output.len() as u64 * CREATE_DATA_GAS;
        result.gas_left =
            result.gas_left.checked_sub(deposit).ok_or(VmError::CodeStoreOutOfGas)?;
        self.state.set_code(address, result.output.clone());
        Ok(())
    }

    fn run(&mut self, contract: &Contract, read_only: bool) -> InterpreterResult {
        let interpreter = self.interpreter;
        let prev_read_only = std::mem::replace(&mut self.read_only, read_only);
        self.depth += 1;
        let result = interpreter.run(self, contract, read_only);
        self.depth -= 1;
        self.read_only = prev_read_only;
        result
    }

    /// Reverts a failed frame. All gas is consumed unless the frame reverted.
    fn finish_frame(
        &mut self,
        snapshot: usize,
        result: InterpreterResult,
        created_address: Option<Address>,
    ) -> FrameResult {
        let InterpreterResult { output, mut gas_left, error } = result;
        if let Some(err) = &error {
            self.state.revert_to_snapshot(snapshot);
            if *err != VmError::Reverted {
                gas_left = 0;
            }
        }
        let created_address = if error.is_none() { created_address } else { None };
        FrameResult { output, gas_left, error, created_address }
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) {
        self.state.sub_balance(from, value, BalanceChangeReason::Transfer);
        self.state.add_balance(to, value, BalanceChangeReason::Transfer);
    }
}

impl Host for Evm<'_> {
    fn state(&mut self) -> &mut dyn StateDb {
        &mut *self.state
    }

    fn block(&self) -> &BlockContext {
        &self.block
    }

    fn tx(&self) -> &TxContext {
        &self.tx
    }

    fn rules(&self) -> &EvmRules {
        &self.rules
    }

    fn block_hash(&self, number: u64) -> B256 {
        let current = self.block.number;
        let lower = current.saturating_sub(BLOCK_HASH_HISTORY);
        if number >= lower && number < current {
            self.block_hashes.block_hash(number).unwrap_or_default()
        } else {
            B256::ZERO
        }
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn call(&mut self, inputs: CallInputs) -> FrameResult {
        Self::call(self, inputs)
    }

    fn create(&mut self, inputs: CreateInputs) -> FrameResult {
        Self::create(self, inputs)
    }
}
