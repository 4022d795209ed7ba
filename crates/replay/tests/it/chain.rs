use alloy_primitives::{Address, TxKind, B256, U256};
use assert_matches::assert_matches;
use sonic_chainspec::{ChainSpec, Upgrades};
use sonic_evm::{test_utils::MockInterpreter, BlockHashProvider, EvmHeader, VmConfig};
use sonic_executor::{seal_block, ExecutableBlock, StateProcessor};
use sonic_gas_subsidies::{test_utils::MockRegistry, GasConfig};
use sonic_primitives::{
    test_utils::TestKey, Genesis, GenesisAccount, Header, Receipt, SealedBlock, Timestamp,
    Transaction, TransactionSigned, TxLegacy,
};
use sonic_replay::{apply_genesis, ReplayError, Replayer, SharedBlockHashes};
use sonic_state::{MemoryStateDb, StateDb};
use std::{sync::Arc, time::Duration};

const CHAIN_ID: u64 = 146;
const COINBASE: Address = Address::with_last_byte(0xcb);
const FUND: B256 = B256::repeat_byte(0x01);
const GAS_CONFIG: GasConfig =
    GasConfig { choose_fund_gas: 100_000, deduct_fees_gas: 100_000, overhead_charge: 2_000 };

/// Builds a chain the way a block proposer does, charging sponsored transactions.
struct Producer {
    processor: StateProcessor,
    block_hashes: SharedBlockHashes,
    state: MemoryStateDb,
    blocks: Vec<SealedBlock>,
    receipts: Vec<Vec<Receipt>>,
}

impl Producer {
    fn new(chain_spec: Arc<ChainSpec>, interpreter: MockInterpreter, genesis: &Genesis) -> Self {
        Self::with_state(chain_spec, interpreter, genesis, MemoryStateDb::new())
    }

    fn with_state(
        chain_spec: Arc<ChainSpec>,
        interpreter: MockInterpreter,
        genesis: &Genesis,
        mut state: MemoryStateDb,
    ) -> Self {
        let block_hashes = SharedBlockHashes::new();
        let processor =
            StateProcessor::new(chain_spec, Arc::new(interpreter), Arc::new(block_hashes.clone()));
        let state_root = apply_genesis(&mut state, genesis);
        let genesis_block = SealedBlock::new(
            Header { state_root, gas_limit: genesis.gas_limit, ..Default::default() },
            vec![],
        );
        Self { processor, block_hashes, state, blocks: vec![genesis_block], receipts: vec![vec![]] }
    }

    fn produce(&mut self, transactions: Vec<TransactionSigned>) -> SealedBlock {
        let parent = self.blocks.last().unwrap();
        let number = parent.number() + 1;
        let header = EvmHeader {
            number,
            parent_hash: parent.hash,
            coinbase: COINBASE,
            time: Timestamp::from_parts(1_700_000_000 + number, 250_000_000),
            duration: Duration::from_millis(400),
            gas_limit: 10_000_000,
            base_fee: U256::from(1),
            ..Default::default()
        };
        self.block_hashes.insert(number - 1, parent.hash);

        let block = ExecutableBlock { header: header.clone(), transactions };
        self.state.begin_block(number);
        let processed =
            self.processor.process(&block, &mut self.state, VmConfig::default(), None).unwrap();
        self.state.end_block(number);

        let (sealed, receipts) = seal_block(&header, processed, self.state.state_hash());
        self.blocks.push(sealed.clone());
        self.receipts.push(receipts);
        sealed
    }
}

fn chain_spec(upgrades: Upgrades) -> Arc<ChainSpec> {
    Arc::new(ChainSpec::builder(CHAIN_ID).upgrades(upgrades).build())
}

fn transfer(key: &TestKey, nonce: u64, value: u64, gas_price: u64) -> TransactionSigned {
    key.sign(Transaction::Legacy(TxLegacy {
        chain_id: Some(CHAIN_ID),
        nonce,
        gas_price: U256::from(gas_price),
        gas_limit: 21_000,
        to: TxKind::Call(Address::with_last_byte(0x42)),
        value: U256::from(value),
        ..Default::default()
    }))
}

fn funded_genesis(keys: &[TestKey]) -> Genesis {
    let balance = U256::from(10u128.pow(18));
    keys.iter().fold(Genesis { gas_limit: 10_000_000, ..Default::default() }, |genesis, key| {
        genesis.with_account(key.address(), GenesisAccount::with_balance(balance))
    })
}

fn sonic_replayer() -> Replayer {
    Replayer::new(chain_spec(Upgrades::sonic()), Arc::new(MockInterpreter::new()))
}

fn sonic_chain() -> (Genesis, Producer, [TestKey; 2]) {
    let keys = [TestKey::new(1), TestKey::new(2)];
    let genesis = funded_genesis(&keys);
    let mut producer =
        Producer::new(chain_spec(Upgrades::sonic()), MockInterpreter::new(), &genesis);
    let [alice, bob] = &keys;
    producer.produce(vec![transfer(alice, 0, 100, 2), transfer(bob, 0, 5, 1)]);
    // bob's second transaction has a nonce gap and is left out of the block
    let block = producer.produce(vec![transfer(alice, 1, 7, 3), transfer(bob, 3, 1, 1)]);
    assert_eq!(block.transactions.len(), 1);
    producer.produce(vec![]);
    (genesis, producer, keys)
}

#[test]
fn replays_produced_chain() {
    sonic_tracing::init_test_tracing();
    let (genesis, producer, _) = sonic_chain();
    let mut replayer = sonic_replayer();

    replayer.replay(&genesis, &producer.blocks).unwrap();
    assert_eq!(replayer.next_block(), Some(4));
    assert_eq!(replayer.state().state_hash(), producer.state.state_hash());
    assert_eq!(replayer.state().balance(COINBASE), producer.state.balance(COINBASE));
    assert_eq!(replayer.block_hashes().block_hash(2), Some(producer.blocks[2].hash));
}

#[test]
fn receipts_match_block() {
    let (genesis, producer, _) = sonic_chain();
    let mut replayer = sonic_replayer();
    replayer.init_genesis(&genesis, &producer.blocks[0]).unwrap();

    let block = &producer.blocks[1];
    let receipts = replayer.replay_block(block).unwrap();
    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[1].cumulative_gas_used, 42_000);
    let gas_used = receipts.iter().map(|receipt| receipt.gas_used).sum::<u64>();
    assert_eq!(gas_used, block.header.gas_used);
    assert!(receipts.iter().all(|receipt| receipt.block_hash == block.hash));
}

#[test]
fn receipts_after_skipped_transaction_match_producer() {
    let keys = [TestKey::new(1), TestKey::new(2)];
    let genesis = funded_genesis(&keys);
    let mut producer =
        Producer::new(chain_spec(Upgrades::sonic()), MockInterpreter::new(), &genesis);
    let [alice, bob] = &keys;
    // bob's transaction has a nonce gap and is left out between alice's two
    let block = producer.produce(vec![
        transfer(alice, 0, 1, 1),
        transfer(bob, 3, 1, 1),
        transfer(alice, 1, 1, 1),
    ]);
    assert_eq!(block.transactions.len(), 2);

    let produced = &producer.receipts[1];
    let indices = produced.iter().map(|receipt| receipt.transaction_index).collect::<Vec<_>>();
    assert_eq!(indices, vec![0, 1]);

    let mut replayer = sonic_replayer();
    replayer.init_genesis(&genesis, &producer.blocks[0]).unwrap();
    assert_eq!(&replayer.replay_block(&block).unwrap(), produced);
}

fn replay_tampered(
    genesis: &Genesis,
    blocks: &[SealedBlock],
    tamper: impl FnOnce(&mut Vec<SealedBlock>),
) -> Result<(), ReplayError> {
    let mut blocks = blocks.to_vec();
    tamper(&mut blocks);
    sonic_replayer().replay(genesis, &blocks)
}

fn reseal(block: &mut SealedBlock, edit: impl FnOnce(&mut Header)) {
    let mut header = block.header.clone();
    edit(&mut header);
    *block = SealedBlock::new(header, block.transactions.clone());
}

#[test]
fn detects_mismatches() {
    let (genesis, producer, [alice, _]) = sonic_chain();
    let blocks = &producer.blocks;

    assert_matches!(
        replay_tampered(&genesis, blocks, |blocks| {
            reseal(&mut blocks[0], |header| header.state_root = B256::ZERO)
        }),
        Err(ReplayError::StateRoot { number: 0, .. })
    );
    assert_matches!(
        replay_tampered(&genesis, blocks, |blocks| {
            blocks[2].transactions.push(transfer(&alice, 2, 1, 1))
        }),
        Err(ReplayError::StateRoot { number: 2, .. })
    );
    assert_matches!(
        replay_tampered(&genesis, blocks, |blocks| {
            reseal(&mut blocks[1], |header| header.gas_used += 1)
        }),
        Err(ReplayError::GasUsed { number: 1, diff }) if diff.expected == diff.got + 1
    );
    assert_matches!(
        replay_tampered(&genesis, blocks, |blocks| {
            reseal(&mut blocks[3], |header| header.receipts_root = B256::ZERO)
        }),
        Err(ReplayError::ReceiptsRoot { number: 3, .. })
    );
    assert_matches!(
        replay_tampered(&genesis, blocks, |blocks| blocks[2].hash = B256::ZERO),
        Err(ReplayError::BlockHash { number: 2, .. })
    );
    assert_matches!(
        replay_tampered(&genesis, blocks, |blocks| {
            reseal(&mut blocks[1], |header| header.extra_data = Default::default())
        }),
        Err(ReplayError::ExtraData { number: 1, .. })
    );
    assert_matches!(
        replay_tampered(&genesis, blocks, |blocks| {
            blocks.remove(2);
        }),
        Err(ReplayError::UnexpectedNumber(diff)) if diff.got == 3 && diff.expected == 2
    );
}

#[test]
fn sponsored_blocks_replay_without_recharging() {
    let registry = MockRegistry::new(GAS_CONFIG).with_fund(FUND);
    let seeded = || {
        let mut state = MemoryStateDb::new();
        registry.deploy(&mut state);
        MockRegistry::set_fund_balance(&mut state, FUND, U256::from(10u128.pow(18)));
        state
    };
    let upgrades = Upgrades::allegro().with_gas_subsidies();
    let genesis = Genesis::default();
    let key = TestKey::new(3);

    let mut producer = Producer::with_state(
        chain_spec(upgrades),
        registry.install(MockInterpreter::new()),
        &genesis,
        seeded(),
    );
    let block = producer.produce(vec![transfer(&key, 0, 0, 0)]);
    assert_eq!(block.transactions.len(), 2);
    assert!(block.transactions[1].is_internal());
    producer.produce(vec![transfer(&key, 1, 0, 0)]);

    let replayer = || {
        Replayer::with_state(
            chain_spec(upgrades),
            Arc::new(registry.install(MockInterpreter::new())),
            seeded(),
        )
    };
    let mut verified = replayer();
    verified.replay(&genesis, &producer.blocks).unwrap();
    assert_eq!(
        MockRegistry::fund_balance(verified.state(), FUND),
        MockRegistry::fund_balance(&producer.state, FUND)
    );
    assert_eq!(verified.state().nonce(Address::ZERO), 2);

    let mut blocks = producer.blocks.clone();
    blocks[1].transactions.truncate(1);
    assert_matches!(
        replayer().replay(&genesis, &blocks),
        Err(ReplayError::StateRoot { number: 1, .. })
    );
}
