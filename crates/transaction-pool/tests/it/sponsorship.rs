use alloy_primitives::{Address, TxKind, B256, U256};
use assert_matches::assert_matches;
use sonic_chainspec::{ChainSpec, Upgrades};
use sonic_evm::{
    test_utils::MockInterpreter, EvmHeader, Interpreter, RecentBlockHashes, VmConfig,
};
use sonic_executor::{ExecutableBlock, StateProcessor};
use sonic_gas_subsidies::{
    test_utils::MockRegistry, GasConfig, RegistryChecker, SubsidyCheckCache, DEFAULT_CACHE_BYTES,
};
use sonic_primitives::{test_utils::TestKey, Transaction, TransactionSigned, TxLegacy};
use sonic_state::{MemoryStateDb, SharedState, StateDb};
use sonic_transaction_pool::{
    InvalidPoolTransactionError, SonicTransactionValidatorBuilder, TransactionOrigin,
    TransactionValidationOutcome, TransactionValidator,
};
use std::{sync::Arc, time::Duration};

const CHAIN_ID: u64 = 146;
const FUND: B256 = B256::repeat_byte(0x01);
const OVERHEAD: u64 = 1_000;

struct Node {
    chain_spec: Arc<ChainSpec>,
    interpreter: Arc<dyn Interpreter>,
    state: SharedState,
    next: EvmHeader,
}

impl Node {
    fn new() -> Self {
        let registry = MockRegistry::new(GasConfig {
            choose_fund_gas: 100_000,
            deduct_fees_gas: 100_000,
            overhead_charge: OVERHEAD,
        })
        .with_fund(FUND);
        let mut state = MemoryStateDb::new();
        registry.deploy(&mut state);

        let upgrades = Upgrades::allegro().with_gas_subsidies();
        Self {
            chain_spec: Arc::new(ChainSpec::builder(CHAIN_ID).upgrades(upgrades).build()),
            interpreter: Arc::new(registry.install(MockInterpreter::new())),
            state: SharedState::new(state),
            next: EvmHeader {
                number: 1,
                gas_limit: 1_000_000,
                base_fee: U256::from(1),
                ..Default::default()
            },
        }
    }

    fn checker(&self) -> RegistryChecker<SharedState> {
        RegistryChecker::new(
            Arc::clone(&self.chain_spec),
            self.state.clone(),
            Arc::clone(&self.interpreter),
            self.next.clone(),
        )
    }

    fn set_fund_balance(&self, balance: u64) {
        MockRegistry::set_fund_balance(&mut *self.state.write(), FUND, U256::from(balance));
    }

    fn fund_balance(&self) -> U256 {
        MockRegistry::fund_balance(&*self.state.read(), FUND)
    }

    fn process(&self, transactions: Vec<TransactionSigned>) -> Vec<TransactionSigned> {
        let processor = StateProcessor::new(
            Arc::clone(&self.chain_spec),
            Arc::clone(&self.interpreter),
            Arc::new(RecentBlockHashes::new()),
        );
        let block = ExecutableBlock { header: self.next.clone(), transactions };
        let mut state = self.state.write();
        state.begin_block(block.header.number);
        let processed = processor.process(&block, &mut *state, VmConfig::default(), None).unwrap();
        state.end_block(block.header.number);
        assert!(processed.skipped.is_empty());
        processed.transactions
    }
}

/// A sponsorship request estimated at `(50_000 + OVERHEAD) * 1` that uses 21 000 gas.
fn request(key: &TestKey) -> TransactionSigned {
    key.sign(Transaction::Legacy(TxLegacy {
        chain_id: Some(CHAIN_ID),
        gas_limit: 50_000,
        to: TxKind::Call(Address::with_last_byte(0x42)),
        ..Default::default()
    }))
}

#[test]
fn rejected_until_fund_is_topped_up() {
    let node = Node::new();
    let validator = SonicTransactionValidatorBuilder::new(Arc::clone(&node.chain_spec))
        .with_head(&node.next)
        .build(node.state.clone(), node.checker());
    let key = TestKey::new(1);
    let tx = request(&key);

    node.set_fund_balance(25_500);
    let outcome = validator.validate_transaction(TransactionOrigin::External, tx.clone());
    assert_matches!(
        outcome.as_invalid(),
        Some(InvalidPoolTransactionError::SponsorshipRejected)
    );

    node.set_fund_balance(51_000);
    let outcome = validator.validate_transaction(TransactionOrigin::External, tx.clone());
    assert_matches!(
        outcome,
        TransactionValidationOutcome::Valid { transaction, .. } if transaction.sponsored
    );

    let block = node.process(vec![tx]);
    assert_eq!(block.len(), 2);
    assert!(block[1].is_internal());
    // charged for the gas used, not the gas limit
    assert_eq!(node.fund_balance(), U256::from(51_000 - (21_000 + OVERHEAD)));
}

#[test]
fn missing_registry_is_distinguished() {
    let node = Node::new();
    *node.state.write() = MemoryStateDb::new();
    let validator = SonicTransactionValidatorBuilder::new(Arc::clone(&node.chain_spec))
        .with_head(&node.next)
        .build(node.state.clone(), node.checker());

    let outcome =
        validator.validate_transaction(TransactionOrigin::External, request(&TestKey::new(1)));
    assert_matches!(outcome.as_invalid(), Some(InvalidPoolTransactionError::RegistryAbsent));
}

#[test]
fn cached_rejection_outlives_top_up() {
    let node = Node::new();
    let cache = SubsidyCheckCache::new(node.checker(), DEFAULT_CACHE_BYTES)
        .with_validity(Duration::from_secs(10), Duration::from_secs(15));
    let validator = SonicTransactionValidatorBuilder::new(Arc::clone(&node.chain_spec))
        .with_head(&node.next)
        .build(node.state.clone(), cache);
    let key = TestKey::new(1);
    let tx = request(&key);

    node.set_fund_balance(0);
    let outcome = validator.validate_transaction(TransactionOrigin::External, tx.clone());
    assert!(outcome.is_invalid());

    node.set_fund_balance(51_000);
    let outcome = validator.validate_transaction(TransactionOrigin::External, tx.clone());
    assert_matches!(
        outcome.as_invalid(),
        Some(InvalidPoolTransactionError::SponsorshipRejected)
    );
    let entry = validator.subsidies().entry(&tx.hash()).unwrap();
    assert!(!entry.covered);

    // a different request of the same sender is not cached
    let other = key.sign(Transaction::Legacy(TxLegacy {
        chain_id: Some(CHAIN_ID),
        nonce: 1,
        gas_limit: 50_000,
        to: TxKind::Call(Address::with_last_byte(0x42)),
        ..Default::default()
    }));
    assert!(validator.validate_transaction(TransactionOrigin::External, other).is_valid());
}
