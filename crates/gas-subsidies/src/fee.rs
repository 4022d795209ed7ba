use crate::{abi::deductFeesCall, FundId, GasConfig, SubsidyError, REGISTRY_ADDRESS};
use alloy_primitives::{Address, TxKind, U256};
use alloy_sol_types::SolCall;
use sonic_primitives::{TransactionSigned, TxLegacy};

/// Fee of a sponsored transaction: `(gas + overhead) * base_fee`.
pub fn sponsored_fee(gas: u64, overhead: u64, base_fee: U256) -> Result<U256, SubsidyError> {
    let gas = U256::from(gas) + U256::from(overhead);
    gas.checked_mul(base_fee).ok_or(SubsidyError::FeeOverflow)
}

/// Builds the internal transaction deducting the fee of a sponsored transaction that used
/// `gas_used` from `fund_id`.
///
/// `nonce` is the current nonce of the zero address.
pub fn fee_charge_transaction(
    nonce: u64,
    gas_config: &GasConfig,
    fund_id: FundId,
    gas_used: u64,
    base_fee: U256,
) -> Result<TransactionSigned, SubsidyError> {
    let fee = sponsored_fee(gas_used, gas_config.overhead_charge, base_fee)?;
    let input = deductFeesCall { fundId: fund_id, fee }.abi_encode();
    Ok(TransactionSigned::new_internal(
        Address::ZERO,
        TxLegacy {
            chain_id: None,
            nonce,
            gas_price: U256::ZERO,
            gas_limit: gas_config.deduct_fees_gas,
            to: TxKind::Call(REGISTRY_ADDRESS),
            value: U256::ZERO,
            input: input.into(),
        },
    ))
}
