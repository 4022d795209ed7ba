//! A native subsidies registry for tests.

use crate::{
    abi::{chooseFundCall, deductFeesCall, getGasConfigCall},
    FundId, GasConfig, REGISTRY_ADDRESS,
};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use sonic_evm::{test_utils::MockInterpreter, Contract, Host, InterpreterResult, VmError};
use sonic_state::StateDb;

/// Gas charged by every call of the [`MockRegistry`].
pub const REGISTRY_CALL_GAS: u64 = 10_000;

/// Registry contract run by the [`MockInterpreter`].
///
/// The gas configuration lives in storage slots 0 to 2 of the registry, the balance of a fund
/// at `keccak256(fund_id)`. `chooseFund` picks the first registered fund able to pay the fee.
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    gas_config: GasConfig,
    funds: Vec<FundId>,
}

impl MockRegistry {
    /// Creates a registry publishing `gas_config`.
    pub fn new(gas_config: GasConfig) -> Self {
        Self { gas_config, funds: Vec::new() }
    }

    /// Registers a fund. Funds are tried in registration order.
    pub fn with_fund(mut self, fund_id: FundId) -> Self {
        self.funds.push(fund_id);
        self
    }

    /// The published gas configuration.
    pub const fn gas_config(&self) -> &GasConfig {
        &self.gas_config
    }

    /// Deploys the registry into `state` and finalises it.
    pub fn deploy(&self, state: &mut dyn StateDb) {
        MockInterpreter::deploy_native(state, REGISTRY_ADDRESS);
        let GasConfig { choose_fund_gas, deduct_fees_gas, overhead_charge } = self.gas_config;
        let values = [choose_fund_gas, deduct_fees_gas, overhead_charge];
        for (slot, value) in values.into_iter().enumerate() {
            state.set_storage(
                REGISTRY_ADDRESS,
                B256::with_last_byte(slot as u8),
                B256::from(U256::from(value)),
            );
        }
        state.finalise(true);
    }

    /// Sets the balance of a fund and finalises the state.
    pub fn set_fund_balance(state: &mut dyn StateDb, fund_id: FundId, balance: U256) {
        state.set_storage(REGISTRY_ADDRESS, keccak256(fund_id), B256::from(balance));
        state.finalise(true);
    }

    /// Balance of a fund.
    pub fn fund_balance(state: &dyn StateDb, fund_id: FundId) -> U256 {
        U256::from_be_bytes(state.storage(REGISTRY_ADDRESS, keccak256(fund_id)).0)
    }

    /// Adds the registry to `interpreter`.
    pub fn install(&self, interpreter: MockInterpreter) -> MockInterpreter {
        let funds = self.funds.clone();
        interpreter.with_contract(REGISTRY_ADDRESS, move |host, contract, read_only| {
            registry(&funds, host, contract, read_only)
        })
    }
}

fn revert(gas: u64) -> InterpreterResult {
    InterpreterResult::failure(VmError::Reverted, Bytes::new(), gas)
}

fn registry(
    funds: &[FundId],
    host: &mut dyn Host,
    contract: &Contract,
    read_only: bool,
) -> InterpreterResult {
    let Some(gas) = contract.gas.checked_sub(REGISTRY_CALL_GAS) else {
        return InterpreterResult::failure(VmError::OutOfGas, Bytes::new(), 0)
    };
    let input = &contract.input;
    let this = contract.address;
    let slot = |host: &mut dyn Host, key: B256| host.state().storage(this, key);

    match input.get(..4).unwrap_or_default() {
        selector if selector == getGasConfigCall::SELECTOR => {
            let mut output = Vec::with_capacity(96);
            for index in 0..3u8 {
                let value = slot(host, B256::with_last_byte(index));
                output.extend_from_slice(value.as_slice());
            }
            InterpreterResult::success(output.into(), gas)
        }
        selector if selector == chooseFundCall::SELECTOR => {
            let Ok(call) = chooseFundCall::abi_decode(input, true) else { return revert(gas) };
            let fund = funds
                .iter()
                .copied()
                .find(|fund| U256::from_be_bytes(slot(host, keccak256(fund)).0) >= call.fee)
                .unwrap_or_default();
            InterpreterResult::success(Bytes::copy_from_slice(fund.as_slice()), gas)
        }
        selector if selector == deductFeesCall::SELECTOR => {
            if read_only {
                return InterpreterResult::failure(VmError::WriteProtection, Bytes::new(), 0)
            }
            let Ok(call) = deductFeesCall::abi_decode(input, true) else { return revert(gas) };
            if contract.caller != Address::ZERO {
                return revert(gas)
            }
            let key = keccak256(call.fundId);
            let balance = U256::from_be_bytes(slot(host, key).0);
            let Some(balance) = balance.checked_sub(call.fee) else { return revert(gas) };
            host.state().set_storage(this, key, B256::from(balance));
            InterpreterResult::success(Bytes::new(), gas)
        }
        _ => revert(gas),
    }
}
