use alloy_primitives::{Address, TxKind, B256, U256};
use alloy_sol_types::SolCall;
use sonic_chainspec::{ChainSpec, Upgrades};
use sonic_evm::{test_utils::MockInterpreter, EvmHeader, RecentBlockHashes, VmConfig};
use sonic_executor::{ExecutableBlock, ProcessError, ProcessedBlock, StateProcessor};
use sonic_gas_subsidies::{
    abi::deductFeesCall, test_utils::MockRegistry, GasConfig, REGISTRY_ADDRESS,
};
use sonic_primitives::{test_utils::TestKey, Transaction, TransactionSigned, TxLegacy};
use sonic_state::{BalanceChangeReason, MemoryStateDb, StateDb};
use std::sync::Arc;

const CHAIN_ID: u64 = 146;
const FUND: B256 = B256::repeat_byte(0x01);
const OVERHEAD: u64 = 5_000;
const GAS_CONFIG: GasConfig =
    GasConfig { choose_fund_gas: 100_000, deduct_fees_gas: 100_000, overhead_charge: OVERHEAD };

struct Setup {
    registry: MockRegistry,
    state: MemoryStateDb,
}

impl Setup {
    fn new(fund_balance: U256) -> Self {
        let registry = MockRegistry::new(GAS_CONFIG).with_fund(FUND);
        let mut state = MemoryStateDb::new();
        registry.deploy(&mut state);
        MockRegistry::set_fund_balance(&mut state, FUND, fund_balance);
        Self { registry, state }
    }

    fn processor(&self) -> StateProcessor {
        let upgrades = Upgrades::allegro().with_gas_subsidies();
        let chain_spec = Arc::new(ChainSpec::builder(CHAIN_ID).upgrades(upgrades).build());
        let interpreter = self.registry.install(MockInterpreter::new());
        StateProcessor::new(chain_spec, Arc::new(interpreter), Arc::new(RecentBlockHashes::new()))
    }

    fn process(&mut self, block: &ExecutableBlock) -> Result<ProcessedBlock, ProcessError> {
        let processor = self.processor();
        self.state.begin_block(block.header.number);
        let processed = processor.process(block, &mut self.state, VmConfig::default(), None);
        self.state.end_block(block.header.number);
        processed
    }

    fn fund_balance(&self) -> U256 {
        MockRegistry::fund_balance(&self.state, FUND)
    }
}

fn sponsored(key: &TestKey, nonce: u64) -> TransactionSigned {
    key.sign(Transaction::Legacy(TxLegacy {
        chain_id: Some(CHAIN_ID),
        nonce,
        gas_limit: 21_000,
        to: TxKind::Call(Address::with_last_byte(0x42)),
        ..Default::default()
    }))
}

fn block(number: u64, gas_limit: u64, transactions: Vec<TransactionSigned>) -> ExecutableBlock {
    ExecutableBlock {
        header: EvmHeader { number, gas_limit, base_fee: U256::from(1), ..Default::default() },
        transactions,
    }
}

#[test]
fn sponsored_transaction_is_charged() {
    let mut setup = Setup::new(U256::from(10u128.pow(18)));
    let key = TestKey::new(1);
    let tx = sponsored(&key, 0);

    let processed = setup.process(&block(1, 1_000_000, vec![tx.clone()])).unwrap();
    assert_eq!(processed.transactions.len(), 2);
    assert!(processed.skipped.is_empty());
    assert_eq!(processed.transactions[0], tx);

    let fee_charge = &processed.transactions[1];
    assert!(fee_charge.is_internal());
    assert_eq!(fee_charge.nonce(), 0);
    assert_eq!(fee_charge.to(), Some(REGISTRY_ADDRESS));
    assert_eq!(fee_charge.gas_limit(), GAS_CONFIG.deduct_fees_gas);
    let call = deductFeesCall::abi_decode(fee_charge.input(), true).unwrap();
    assert_eq!(call.fundId, FUND);
    assert_eq!(call.fee, U256::from(21_000 + OVERHEAD));

    let user = processed.receipts[0].as_ref().unwrap();
    let charge = processed.receipts[1].as_ref().unwrap();
    assert!(user.status.is_success() && charge.status.is_success());
    assert_eq!(user.gas_used, 21_000);
    assert_eq!(charge.transaction_index, 1);
    assert_eq!(charge.cumulative_gas_used, 21_000 + charge.gas_used);
    assert_eq!(processed.used_gas, charge.cumulative_gas_used);

    assert_eq!(setup.fund_balance(), U256::from(10u128.pow(18) - 26_000));
    assert_eq!(setup.state.balance(key.address()), U256::ZERO);
    assert_eq!(setup.state.nonce(key.address()), 1);
}

#[test]
fn fee_charges_use_consecutive_nonces() {
    let mut setup = Setup::new(U256::from(10u128.pow(18)));
    let (alice, bob) = (TestKey::new(1), TestKey::new(2));

    let first = setup
        .process(&block(1, 1_000_000, vec![sponsored(&alice, 0), sponsored(&bob, 0)]))
        .unwrap();
    assert_eq!(first.transactions.len(), 4);
    assert_eq!(first.transactions[1].nonce(), 0);
    assert_eq!(first.transactions[3].nonce(), 1);
    assert_eq!(first.receipts[3].as_ref().unwrap().transaction_index, 3);

    let second = setup.process(&block(2, 1_000_000, vec![sponsored(&alice, 1)])).unwrap();
    assert_eq!(second.transactions[1].nonce(), 2);
    assert_eq!(setup.state.nonce(Address::ZERO), 3);
}

#[test]
fn sponsored_transaction_follows_regular_one() {
    let mut setup = Setup::new(U256::from(10u128.pow(18)));
    let payer = TestKey::new(3);
    let funds = U256::from(10u64.pow(9));
    setup.state.add_balance(payer.address(), funds, BalanceChangeReason::Genesis);
    setup.state.finalise(true);
    let regular = payer.sign(Transaction::Legacy(TxLegacy {
        chain_id: Some(CHAIN_ID),
        gas_price: U256::from(1),
        gas_limit: 21_000,
        to: TxKind::Call(Address::with_last_byte(0x42)),
        ..Default::default()
    }));

    let processed = setup
        .process(&block(1, 1_000_000, vec![regular, sponsored(&TestKey::new(1), 0)]))
        .unwrap();
    assert_eq!(processed.transactions.len(), 3);
    assert!(processed.transactions[2].is_internal());
    assert_eq!(processed.receipts[2].as_ref().unwrap().transaction_index, 2);
}

#[test]
fn uncovered_request_is_skipped() {
    let mut setup = Setup::new(U256::from(25_999));
    let key = TestKey::new(1);

    let processed = setup.process(&block(1, 1_000_000, vec![sponsored(&key, 0)])).unwrap();
    assert_eq!(processed.transactions.len(), 1);
    assert_eq!(processed.skipped, vec![0]);
    assert_eq!(processed.used_gas, 0);
    assert_eq!(setup.state.nonce(key.address()), 0);
    assert_eq!(setup.fund_balance(), U256::from(25_999));
}

#[test]
fn missing_registry_skips_request() {
    sonic_tracing::init_test_tracing();
    let mut setup = Setup::new(U256::ZERO);
    setup.state = MemoryStateDb::new();
    let key = TestKey::new(1);

    let processed = setup.process(&block(1, 1_000_000, vec![sponsored(&key, 0)])).unwrap();
    assert_eq!(processed.skipped, vec![0]);
    assert_eq!(setup.state.nonce(Address::ZERO), 0);
}

#[test]
fn no_block_gas_for_fee_charge() {
    let mut setup = Setup::new(U256::from(10u128.pow(18)));
    let mut empty = Setup::new(U256::from(10u128.pow(18)));
    let key = TestKey::new(1);

    let processed = setup.process(&block(1, 21_000 + 50_000, vec![sponsored(&key, 0)])).unwrap();
    assert_eq!(processed.skipped, vec![0]);
    assert_eq!(processed.receipts, vec![None]);
    assert_eq!(processed.used_gas, 0);

    empty.process(&block(1, 21_000 + 50_000, Vec::new())).unwrap();
    assert_eq!(setup.state.state_hash(), empty.state.state_hash());
}

#[test]
fn verification_replays_embedded_fee_charges() {
    let key = TestKey::new(1);
    let mut producer = Setup::new(U256::from(10u128.pow(18)));
    let produced = producer.process(&block(1, 1_000_000, vec![sponsored(&key, 0)])).unwrap();

    let mut verifier = Setup::new(U256::from(10u128.pow(18)));
    let processor = verifier.processor().with_gas_subsidies(false);
    let replayed = block(1, 1_000_000, produced.transactions.clone());
    verifier.state.begin_block(1);
    let verified =
        processor.process(&replayed, &mut verifier.state, VmConfig::default(), None).unwrap();
    verifier.state.end_block(1);

    assert_eq!(verified, produced);
    assert_eq!(verifier.state.state_hash(), producer.state.state_hash());
}
