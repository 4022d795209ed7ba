use alloy_primitives::{Address, TxKind, B256, U256};
use sonic_chainspec::{ChainSpec, Upgrades};
use sonic_evm::{test_utils::MockInterpreter, EvmHeader, RecentBlockHashes, VmConfig};
use sonic_executor::{ExecutableBlock, StateProcessor};
use sonic_gas_subsidies::{test_utils::MockRegistry, GasConfig};
use sonic_primitives::{
    test_utils::TestKey, ChainSigner, Transaction, TransactionSigned, TxLegacy,
};
use sonic_scheduler::{
    scrambler::{is_scrambled, recover_entries, SignedEntry},
    CancelToken, EvmTrialProcessor, ScheduledTransaction, Scheduler, SenderOrderedCandidates,
    TrialOutcome, TrialProcessor,
};
use sonic_state::{MemoryStateDb, SharedState, StateDb};
use std::{collections::HashMap, sync::Arc};

const CHAIN_ID: u64 = 146;
const FUND: B256 = B256::repeat_byte(0x01);
const GAS_CONFIG: GasConfig =
    GasConfig { choose_fund_gas: 100_000, deduct_fees_gas: 100_000, overhead_charge: 1_000 };

fn processor(upgrades: Upgrades, interpreter: MockInterpreter) -> StateProcessor {
    let chain_spec = Arc::new(ChainSpec::builder(CHAIN_ID).upgrades(upgrades).build());
    StateProcessor::new(chain_spec, Arc::new(interpreter), Arc::new(RecentBlockHashes::new()))
}

fn sonic_processor() -> StateProcessor {
    processor(Upgrades::sonic(), MockInterpreter::new())
}

fn signer() -> ChainSigner {
    ChainSpec::builder(CHAIN_ID).upgrades(Upgrades::sonic()).build().signer_at(1)
}

fn transfer(key: &TestKey, nonce: u64) -> TransactionSigned {
    key.sign(Transaction::Legacy(TxLegacy {
        chain_id: Some(CHAIN_ID),
        nonce,
        gas_limit: 21_000,
        to: TxKind::Call(Address::with_last_byte(0x42)),
        ..Default::default()
    }))
}

fn header(base_fee: u64) -> EvmHeader {
    EvmHeader {
        number: 1,
        gas_limit: 30_000_000,
        base_fee: U256::from(base_fee),
        ..Default::default()
    }
}

fn entries(scheduled: &[ScheduledTransaction]) -> Vec<SignedEntry> {
    recover_entries(scheduled.iter().map(|scheduled| scheduled.transaction.clone()), &signer())
}

/// Processes the scheduled transactions as a block on `state`, returning the gas used by every
/// processed transaction.
fn replay(
    processor: &StateProcessor,
    state: &mut MemoryStateDb,
    header: &EvmHeader,
    scheduled: &[ScheduledTransaction],
) -> Vec<u64> {
    let block = ExecutableBlock {
        header: header.clone(),
        transactions: scheduled.iter().map(|scheduled| scheduled.transaction.clone()).collect(),
    };
    state.begin_block(header.number);
    let processed = processor.process(&block, state, VmConfig::default(), None).unwrap();
    state.end_block(header.number);

    assert!(processed.skipped.is_empty());
    processed.receipts.iter().map(|receipt| receipt.as_ref().unwrap().gas_used).collect()
}

#[test]
fn scheduled_transactions_replay() {
    let keys = [TestKey::new(1), TestKey::new(2), TestKey::new(3)];
    let mut txs = Vec::new();
    for key in &keys {
        txs.extend((0..3).map(|nonce| transfer(key, nonce)));
    }
    // behind a nonce gap
    txs.push(transfer(&keys[0], 5));
    txs.push(transfer(&keys[0], 6));

    let state = SharedState::default();
    let scheduler = Scheduler::new(sonic_processor(), state.clone());
    let mut candidates = SenderOrderedCandidates::scrambled(txs, 7, &signer());

    let header = header(0);
    let scheduled =
        scheduler.schedule(&CancelToken::default(), &header, &mut candidates, 150_000);
    assert_eq!(scheduled.len(), 7);
    assert!(scheduled.iter().all(|scheduled| scheduled.gas_used == 21_000));

    let mut next_nonces = HashMap::new();
    for entry in entries(&scheduled) {
        let next = next_nonces.entry(entry.sender).or_insert(0);
        assert_eq!(entry.transaction.nonce(), *next);
        *next += 1;
    }

    for key in &keys {
        assert_eq!(state.read().nonce(key.address()), 0);
    }

    let mut fresh = state.read().clone();
    let gas_used = replay(&sonic_processor(), &mut fresh, &header, &scheduled);
    let expected = scheduled.iter().map(|scheduled| scheduled.gas_used).collect::<Vec<_>>();
    assert_eq!(gas_used, expected);
}

#[test]
fn scrambled_candidates_keep_scrambled_order() {
    let keys = [TestKey::new(4), TestKey::new(5), TestKey::new(6), TestKey::new(7)];
    let txs = keys
        .iter()
        .flat_map(|key| (0..2).map(|nonce| transfer(key, nonce)))
        .collect::<Vec<_>>();

    let scheduler = Scheduler::new(sonic_processor(), SharedState::default());
    let mut candidates = SenderOrderedCandidates::scrambled(txs, 11, &signer());
    let scheduled =
        scheduler.schedule(&CancelToken::default(), &header(0), &mut candidates, 1_000_000);
    assert_eq!(scheduled.len(), 8);
    assert!(is_scrambled(&entries(&scheduled), 11));
}

#[test]
fn gas_limit_bounds_schedule() {
    let keys = [TestKey::new(1), TestKey::new(2), TestKey::new(3)];
    let txs = keys.iter().map(|key| transfer(key, 0)).collect::<Vec<_>>();
    let scheduler = Scheduler::new(sonic_processor(), SharedState::default());
    let mut candidates = SenderOrderedCandidates::from_transactions(txs, &signer());

    let scheduled =
        scheduler.schedule(&CancelToken::default(), &header(0), &mut candidates, 50_000);
    assert_eq!(scheduled.len(), 2);
}

#[test]
fn sponsored_trial_includes_fee_charge() {
    let registry = MockRegistry::new(GAS_CONFIG).with_fund(FUND);
    let mut genesis = MemoryStateDb::new();
    registry.deploy(&mut genesis);
    MockRegistry::set_fund_balance(&mut genesis, FUND, U256::from(10u128.pow(18)));
    let state = SharedState::new(genesis);

    let upgrades = Upgrades::allegro().with_gas_subsidies();
    let new_processor = || processor(upgrades, registry.install(MockInterpreter::new()));
    let scheduler = Scheduler::new(new_processor(), state.clone());

    let key = TestKey::new(1);
    let mut candidates =
        SenderOrderedCandidates::from_transactions(vec![transfer(&key, 0)], &signer());
    let header = header(1);
    let scheduled =
        scheduler.schedule(&CancelToken::default(), &header, &mut candidates, 1_000_000);
    assert_eq!(scheduled.len(), 1);
    assert!(scheduled[0].gas_used > 21_000);

    let mut fresh = state.read().clone();
    let gas_used = replay(&new_processor(), &mut fresh, &header, &scheduled);
    assert_eq!(gas_used.len(), 2);
    assert_eq!(gas_used[0], 21_000);
    assert_eq!(gas_used.iter().sum::<u64>(), scheduled[0].gas_used);
}

#[test]
fn sponsored_candidate_needs_gas_for_fee_charge() {
    let registry = MockRegistry::new(GAS_CONFIG).with_fund(FUND);
    let mut state = MemoryStateDb::new();
    registry.deploy(&mut state);
    MockRegistry::set_fund_balance(&mut state, FUND, U256::from(10u128.pow(18)));

    let upgrades = Upgrades::allegro().with_gas_subsidies();
    let processor = processor(upgrades, registry.install(MockInterpreter::new()));
    let header = header(1);
    state.begin_block(header.number);
    let mut trial = EvmTrialProcessor::new(processor.begin_block(
        &header,
        &mut state,
        VmConfig::default(),
        None,
    ));

    let tx = transfer(&TestKey::new(1), 0);
    let required_gas = 21_000 + GAS_CONFIG.deduct_fees_gas;
    assert_eq!(trial.run(&tx, required_gas - 1), TrialOutcome::OutOfGas);
    assert_eq!(trial.executed(), 0);

    let outcome = trial.run(&tx, required_gas);
    assert!(matches!(outcome, TrialOutcome::Success { gas_used } if gas_used > 21_000));
    assert_eq!(trial.executed(), 2);
}
