//! Intrinsic gas and the block gas pool.

use crate::StateTransitionError;
use sonic_chainspec::EvmRules;
use sonic_primitives::{
    constants::{
        INIT_CODE_WORD_GAS, PER_EMPTY_ACCOUNT_COST, TX_ACCESS_LIST_ADDRESS_GAS,
        TX_ACCESS_LIST_STORAGE_KEY_GAS, TX_COST_FLOOR_PER_TOKEN, TX_DATA_NON_ZERO_GAS_EIP2028,
        TX_DATA_ZERO_GAS, TX_GAS, TX_GAS_CONTRACT_CREATION, TX_TOKEN_PER_NON_ZERO_BYTE,
    },
    AccessList,
};

/// Gas charged before a message executes.
///
/// Homestead and EIP-2028 calldata pricing always apply, EIP-3860 init code words are charged
/// from Shanghai on.
pub fn intrinsic_gas(
    data: &[u8],
    access_list: Option<&AccessList>,
    authorizations: usize,
    is_create: bool,
    rules: &EvmRules,
) -> Result<u64, StateTransitionError> {
    let mut gas = if is_create { TX_GAS_CONTRACT_CREATION } else { TX_GAS };

    if !data.is_empty() {
        let non_zero = data.iter().filter(|byte| **byte != 0).count() as u64;
        let zero = data.len() as u64 - non_zero;
        gas = non_zero
            .checked_mul(TX_DATA_NON_ZERO_GAS_EIP2028)
            .and_then(|cost| gas.checked_add(cost))
            .and_then(|gas| {
                zero.checked_mul(TX_DATA_ZERO_GAS).and_then(|cost| gas.checked_add(cost))
            })
            .ok_or(StateTransitionError::GasUintOverflow)?;

        if is_create && rules.is_shanghai {
            let words = (data.len() as u64).div_ceil(32);
            gas = words
                .checked_mul(INIT_CODE_WORD_GAS)
                .and_then(|cost| gas.checked_add(cost))
                .ok_or(StateTransitionError::GasUintOverflow)?;
        }
    }

    if let Some(access_list) = access_list {
        let (addresses, keys) = access_list.counts();
        gas = gas
            .checked_add(addresses.saturating_mul(TX_ACCESS_LIST_ADDRESS_GAS))
            .and_then(|gas| gas.checked_add(keys.saturating_mul(TX_ACCESS_LIST_STORAGE_KEY_GAS)))
            .ok_or(StateTransitionError::GasUintOverflow)?;
    }

    gas.checked_add((authorizations as u64).saturating_mul(PER_EMPTY_ACCOUNT_COST))
        .ok_or(StateTransitionError::GasUintOverflow)
}

/// Minimum gas a message with calldata `data` pays (EIP-7623).
pub fn floor_data_gas(data: &[u8]) -> Result<u64, StateTransitionError> {
    let non_zero = data.iter().filter(|byte| **byte != 0).count() as u64;
    let zero = data.len() as u64 - non_zero;
    let tokens = non_zero
        .checked_mul(TX_TOKEN_PER_NON_ZERO_BYTE)
        .and_then(|tokens| tokens.checked_add(zero))
        .ok_or(StateTransitionError::GasUintOverflow)?;
    tokens
        .checked_mul(TX_COST_FLOOR_PER_TOKEN)
        .and_then(|gas| gas.checked_add(TX_GAS))
        .ok_or(StateTransitionError::GasUintOverflow)
}

/// Gas still available to the transactions of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasPool(u64);

impl GasPool {
    /// Creates a pool holding `gas`.
    pub const fn new(gas: u64) -> Self {
        Self(gas)
    }

    /// Remaining gas.
    pub const fn gas(&self) -> u64 {
        self.0
    }

    /// Returns gas to the pool.
    pub fn add_gas(&mut self, gas: u64) {
        self.0 = self.0.saturating_add(gas);
    }

    /// Takes gas from the pool.
    pub fn sub_gas(&mut self, gas: u64) -> Result<(), StateTransitionError> {
        self.0 = self.0.checked_sub(gas).ok_or(StateTransitionError::GasLimitReached)?;
        Ok(())
    }
}
