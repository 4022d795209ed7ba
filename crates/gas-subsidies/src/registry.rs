use crate::{
    abi::{chooseFundCall, getGasConfigCall},
    sponsored_fee, SubsidyError,
};
use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use sonic_chainspec::Upgrades;
use sonic_evm::{CallInputs, Evm, TxContext};
use sonic_primitives::TransactionSigned;
use tracing::trace;

/// Identifier of a fund of the registry. Zero means no fund.
pub type FundId = B256;

/// Address of the subsidies registry, or of the proxy in front of it.
pub const REGISTRY_ADDRESS: Address = address!("7d0E23398b6CA0eC7Cf1A3fA4bd8B2A9eC4E2D18");

/// Gas limit of the `getGasConfig` call.
pub const GAS_CONFIG_CALL_GAS: u64 = 50_000;

/// Gas parameters published by the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasConfig {
    /// Gas limit of the `chooseFund` call.
    pub choose_fund_gas: u64,
    /// Gas limit of the fee-charge transaction.
    pub deduct_fees_gas: u64,
    /// Gas charged on top of the gas used by a sponsored transaction.
    pub overhead_charge: u64,
}

/// The fund selected for a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    /// The paying fund, zero if the transaction is not covered.
    pub fund_id: FundId,
    /// Gas parameters the fund was selected with.
    pub gas_config: GasConfig,
}

impl Coverage {
    /// Returns true if a fund pays for the transaction.
    pub fn is_covered(&self) -> bool {
        !self.fund_id.is_zero()
    }
}

/// Returns true if `tx` asks to be paid by a fund: an external call offering a zero gas price.
pub fn is_sponsorship_request(tx: &TransactionSigned) -> bool {
    !tx.is_internal() && tx.to().is_some() && tx.max_fee_per_gas().is_zero()
}

/// Calls the registry without keeping any state change.
fn view_call(evm: &mut Evm<'_>, input: Vec<u8>, gas: u64) -> Result<Bytes, SubsidyError> {
    evm.set_tx_context(TxContext::default());
    let snapshot = evm.state_mut().snapshot();
    let result =
        evm.call(CallInputs::static_call(Address::ZERO, REGISTRY_ADDRESS, input.into(), gas));
    evm.state_mut().revert_to_snapshot(snapshot);
    match result.error {
        Some(err) => Err(SubsidyError::CallFailed(err)),
        None => Ok(result.output),
    }
}

/// Reads the gas parameters of the registry.
pub fn get_gas_config(evm: &mut Evm<'_>) -> Result<GasConfig, SubsidyError> {
    let output = view_call(evm, getGasConfigCall {}.abi_encode(), GAS_CONFIG_CALL_GAS)?;
    if output.is_empty() {
        return Err(SubsidyError::RegistryAbsent)
    }
    let len = output.len();
    let config = getGasConfigCall::abi_decode_returns(&output, true)
        .map_err(|_| SubsidyError::ParseError { len })?;
    let to_u64 = |value: U256| u64::try_from(value).map_err(|_| SubsidyError::ParseError { len });
    Ok(GasConfig {
        choose_fund_gas: to_u64(config.chooseFundGasLimit)?,
        deduct_fees_gas: to_u64(config.deductFeesGasLimit)?,
        overhead_charge: to_u64(config.overheadCharge)?,
    })
}

/// Asks the registry for the fund paying for `tx` of `sender`.
///
/// The offered fee covers the full gas limit plus the overhead charge at the block's base fee.
pub fn choose_fund(
    evm: &mut Evm<'_>,
    tx: &TransactionSigned,
    sender: Address,
    gas_config: &GasConfig,
) -> Result<FundId, SubsidyError> {
    let base_fee = evm.block_context().base_fee;
    let fee = sponsored_fee(tx.gas_limit(), gas_config.overhead_charge, base_fee)?;
    let call = chooseFundCall {
        from: sender,
        to: tx.to().unwrap_or_default(),
        value: tx.value(),
        nonce: U256::from(tx.nonce()),
        data: tx.input().clone(),
        fee,
    };
    let output = view_call(evm, call.abi_encode(), gas_config.choose_fund_gas)?;
    match output.len() {
        0 => Err(SubsidyError::RegistryAbsent),
        32 => Ok(FundId::from_slice(&output)),
        len => Err(SubsidyError::ParseError { len }),
    }
}

/// Selects the fund paying for `tx` against the state of `evm`.
///
/// Without the gas subsidies upgrade no transaction is covered.
pub fn is_covered(
    upgrades: &Upgrades,
    evm: &mut Evm<'_>,
    tx: &TransactionSigned,
    sender: Address,
) -> Result<Coverage, SubsidyError> {
    if !upgrades.gas_subsidies {
        return Ok(Coverage::default())
    }
    let gas_config = get_gas_config(evm)?;
    let fund_id = choose_fund(evm, tx, sender, &gas_config)?;
    trace!(target: "subsidies", hash = ?tx.hash(), %sender, %fund_id, "selected fund");
    Ok(Coverage { fund_id, gas_config })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockRegistry;
    use assert_matches::assert_matches;
    use sonic_evm::{
        test_utils::MockInterpreter, BlockContext, InterpreterResult, RecentBlockHashes, VmConfig,
    };
    use sonic_primitives::{
        test_utils::TestKey, Signature, Transaction, TxEip1559, TxKind, TxLegacy,
    };
    use sonic_state::{MemoryStateDb, StateDb};

    const FUND: FundId = B256::repeat_byte(0x01);

    fn sponsored(key: &TestKey, gas_limit: u64) -> TransactionSigned {
        key.sign(Transaction::Legacy(TxLegacy {
            chain_id: Some(146),
            gas_limit,
            to: TxKind::Call(Address::with_last_byte(0x42)),
            ..Default::default()
        }))
    }

    fn with_evm<T>(
        state: &mut MemoryStateDb,
        interpreter: &MockInterpreter,
        f: impl FnOnce(&mut Evm<'_>) -> T,
    ) -> T {
        let hashes = RecentBlockHashes::new();
        let block = BlockContext { chain_id: 146, base_fee: U256::from(1), ..Default::default() };
        let mut evm = Evm::new(
            state,
            interpreter,
            &hashes,
            block,
            Upgrades::allegro().rules(),
            VmConfig::default(),
        );
        f(&mut evm)
    }

    #[test]
    fn detects_requests() {
        let key = TestKey::new(1);
        assert!(is_sponsorship_request(&sponsored(&key, 21_000)));

        let priced = key.sign(Transaction::Eip1559(TxEip1559 {
            chain_id: 146,
            max_fee_per_gas: U256::from(1),
            to: TxKind::Call(Address::ZERO),
            ..Default::default()
        }));
        assert!(!is_sponsorship_request(&priced));

        let create = key.sign(Transaction::Legacy(TxLegacy::default()));
        assert!(!is_sponsorship_request(&create));

        let internal = TransactionSigned::new(
            Transaction::Legacy(TxLegacy {
                to: TxKind::Call(REGISTRY_ADDRESS),
                ..Default::default()
            }),
            Signature::internal(Address::ZERO),
        );
        assert!(!is_sponsorship_request(&internal));
    }

    #[test]
    fn registry_selects_funded_fund() {
        let registry = MockRegistry::new(GasConfig {
            choose_fund_gas: 100_000,
            deduct_fees_gas: 100_000,
            overhead_charge: 1_000,
        })
        .with_fund(FUND);
        let mut state = MemoryStateDb::new();
        registry.deploy(&mut state);
        let interpreter = registry.install(MockInterpreter::new());
        let key = TestKey::new(1);
        let tx = sponsored(&key, 21_000);
        let upgrades = Upgrades::allegro().with_gas_subsidies();

        // fee = (21_000 + 1_000) * 1
        MockRegistry::set_fund_balance(&mut state, FUND, U256::from(21_999));
        let coverage =
            with_evm(&mut state, &interpreter, |evm| is_covered(&upgrades, evm, &tx, key.address()))
                .unwrap();
        assert!(!coverage.is_covered());
        assert_eq!(coverage.gas_config.overhead_charge, 1_000);

        MockRegistry::set_fund_balance(&mut state, FUND, U256::from(22_000));
        let coverage =
            with_evm(&mut state, &interpreter, |evm| is_covered(&upgrades, evm, &tx, key.address()))
                .unwrap();
        assert_eq!(coverage.fund_id, FUND);

        // disabled upgrade
        let coverage = with_evm(&mut state, &interpreter, |evm| {
            is_covered(&Upgrades::allegro(), evm, &tx, key.address())
        })
        .unwrap();
        assert_eq!(coverage, Coverage::default());
    }

    #[test]
    fn absent_registry() {
        let mut state = MemoryStateDb::new();
        let key = TestKey::new(1);
        let upgrades = Upgrades::allegro().with_gas_subsidies();
        let result = with_evm(&mut state, &MockInterpreter::new(), |evm| {
            is_covered(&upgrades, evm, &sponsored(&key, 21_000), key.address())
        });
        assert_matches!(result, Err(SubsidyError::RegistryAbsent));
        assert_eq!(state.account_count(), 0);
    }

    #[test]
    fn unexpected_result_length() {
        let mut state = MemoryStateDb::new();
        MockInterpreter::deploy_native(&mut state, REGISTRY_ADDRESS);
        let interpreter = MockInterpreter::new().with_contract(REGISTRY_ADDRESS, |_, contract, _| {
            InterpreterResult::success(Bytes::from(vec![0u8; 31]), contract.gas)
        });
        let key = TestKey::new(1);
        let config = GasConfig { choose_fund_gas: 1_000, ..Default::default() };
        let result = with_evm(&mut state, &interpreter, |evm| {
            choose_fund(evm, &sponsored(&key, 21_000), key.address(), &config)
        });
        assert_matches!(result, Err(SubsidyError::ParseError { len: 31 }));

        let result = with_evm(&mut state, &interpreter, get_gas_config);
        assert_matches!(result, Err(SubsidyError::ParseError { len: 31 }));
    }
}
