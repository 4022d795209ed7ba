use crate::{ReplayError, SharedBlockHashes};
use alloy_primitives::{BlockNumber, B256};
use sonic_chainspec::ChainSpec;
use sonic_evm::{EvmHeader, Interpreter, VmConfig};
use sonic_executor::{seal_block, ExecutableBlock, StateProcessor};
use sonic_primitives::{
    ExtraDataError, Genesis, GotExpected, Header, Receipt, SealedBlock, Timestamp,
};
use sonic_state::{BalanceChangeReason, MemoryStateDb, StateDb};
use std::{fmt, sync::Arc};
use tracing::{debug, trace};

/// Writes the accounts of `genesis` into `state` as block 0 and returns the resulting state
/// root.
///
/// All accounts are written in a single synthetic transaction. Accounts without balance, nonce
/// or code are kept.
pub fn apply_genesis(state: &mut dyn StateDb, genesis: &Genesis) -> B256 {
    state.begin_block(0);
    state.set_tx_context(B256::ZERO, 0);
    for (address, account) in &genesis.alloc {
        state.create_account(*address);
        state.add_balance(*address, account.balance, BalanceChangeReason::Genesis);
        state.set_nonce(*address, account.nonce);
        if !account.code.is_empty() {
            state.set_code(*address, account.code.clone());
        }
        for (key, value) in &account.storage {
            state.set_storage(*address, *key, *value);
        }
    }
    state.end_transaction();
    state.finalise(false);
    state.end_block(0);

    let root = state.state_hash();
    trace!(target: "replay", accounts = genesis.alloc.len(), ?root, "Applied genesis");
    root
}

/// Reconstructs the header values seen by the transactions of a recorded block.
pub fn evm_header(header: &Header) -> Result<EvmHeader, ExtraDataError> {
    let extra = header.extra()?;
    Ok(EvmHeader {
        number: header.number,
        parent_hash: header.parent_hash,
        coinbase: header.beneficiary,
        time: Timestamp::from_parts(header.timestamp, extra.subsec_nanos),
        duration: extra.duration,
        gas_limit: header.gas_limit,
        prev_randao: header.mix_hash,
        base_fee: header.base_fee_per_gas,
        blob_base_fee: None,
    })
}

/// Replays a chain from its genesis, verifying every block.
pub struct Replayer<S = MemoryStateDb> {
    processor: StateProcessor,
    block_hashes: SharedBlockHashes,
    state: S,
    vm_config: VmConfig,
    next_block: Option<BlockNumber>,
}

impl<S: fmt::Debug> fmt::Debug for Replayer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replayer")
            .field("processor", &self.processor)
            .field("state", &self.state)
            .field("vm_config", &self.vm_config)
            .field("next_block", &self.next_block)
            .finish_non_exhaustive()
    }
}

impl Replayer {
    /// Creates a replayer on an empty in-memory state.
    pub fn new(chain_spec: Arc<ChainSpec>, interpreter: Arc<dyn Interpreter>) -> Self {
        Self::with_state(chain_spec, interpreter, MemoryStateDb::new())
    }
}

impl<S: StateDb> Replayer<S> {
    /// Creates a replayer applying the genesis on top of `state`.
    pub fn with_state(
        chain_spec: Arc<ChainSpec>,
        interpreter: Arc<dyn Interpreter>,
        state: S,
    ) -> Self {
        let block_hashes = SharedBlockHashes::new();
        let processor =
            StateProcessor::new(chain_spec, interpreter, Arc::new(block_hashes.clone()))
                .with_gas_subsidies(false);
        Self { processor, block_hashes, state, vm_config: VmConfig::default(), next_block: None }
    }

    /// Sets the [`VmConfig`] blocks are processed with.
    pub const fn with_vm_config(mut self, vm_config: VmConfig) -> Self {
        self.vm_config = vm_config;
        self
    }

    /// The state reached so far.
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Consumes the replayer, returning the state reached.
    pub fn into_state(self) -> S {
        self.state
    }

    /// Hashes served to `BLOCKHASH`.
    pub const fn block_hashes(&self) -> &SharedBlockHashes {
        &self.block_hashes
    }

    /// Number of the next block to replay, `None` before the genesis is applied.
    pub const fn next_block(&self) -> Option<BlockNumber> {
        self.next_block
    }

    /// Replays `blocks`, the first of which is the genesis block of `genesis`.
    pub fn replay(
        &mut self,
        genesis: &Genesis,
        blocks: &[SealedBlock],
    ) -> Result<(), ReplayError> {
        let (first, rest) = blocks.split_first().ok_or(ReplayError::MissingGenesis)?;
        self.init_genesis(genesis, first)?;
        for block in rest {
            self.replay_block(block)?;
        }
        debug!(target: "replay", blocks = blocks.len(), "Replayed chain");
        Ok(())
    }

    /// Applies `genesis` and checks the resulting state root against the genesis `block`.
    pub fn init_genesis(
        &mut self,
        genesis: &Genesis,
        block: &SealedBlock,
    ) -> Result<(), ReplayError> {
        if block.number() != 0 {
            return Err(ReplayError::UnexpectedNumber(GotExpected::new(block.number(), 0)))
        }
        let root = apply_genesis(&mut self.state, genesis);
        if root != block.header.state_root {
            return Err(ReplayError::StateRoot {
                number: 0,
                diff: GotExpected::new(root, block.header.state_root),
            })
        }
        self.next_block = Some(1);
        Ok(())
    }

    /// Processes `block` on top of the state of its parent and verifies the outcome.
    ///
    /// Returns the receipts of the block's transactions.
    pub fn replay_block(&mut self, block: &SealedBlock) -> Result<Vec<Receipt>, ReplayError> {
        let number = block.number();
        let expected = self.next_block.ok_or(ReplayError::MissingGenesis)?;
        if number != expected {
            return Err(ReplayError::UnexpectedNumber(GotExpected::new(number, expected)))
        }
        let header = evm_header(&block.header)
            .map_err(|source| ReplayError::ExtraData { number, source })?;
        self.block_hashes.insert(number - 1, block.header.parent_hash);

        let executable = ExecutableBlock { header, transactions: block.transactions.clone() };
        self.state.begin_block(number);
        let processed =
            self.processor.process(&executable, &mut self.state, self.vm_config, None);
        self.state.end_block(number);
        let processed = processed.map_err(|source| ReplayError::Process { number, source })?;

        let state_root = self.state.state_hash();
        if state_root != block.header.state_root {
            return Err(ReplayError::StateRoot {
                number,
                diff: GotExpected::new(state_root, block.header.state_root),
            })
        }

        let gas_used: u64 =
            processed.receipts.iter().flatten().map(|receipt| receipt.gas_used).sum();
        if gas_used != block.header.gas_used {
            return Err(ReplayError::GasUsed {
                number,
                diff: GotExpected::new(gas_used, block.header.gas_used),
            })
        }

        let (sealed, receipts) = seal_block(&executable.header, processed, state_root);
        if sealed.header.receipts_root != block.header.receipts_root {
            return Err(ReplayError::ReceiptsRoot {
                number,
                diff: GotExpected::new(sealed.header.receipts_root, block.header.receipts_root),
            })
        }
        if sealed.hash != block.hash {
            return Err(ReplayError::BlockHash {
                number,
                diff: GotExpected::new(sealed.hash, block.hash),
            })
        }

        self.next_block = Some(number + 1);
        debug!(
            target: "replay",
            number,
            hash = ?block.hash,
            transactions = block.transactions.len(),
            gas_used,
            "Verified block"
        );
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use assert_matches::assert_matches;
    use sonic_chainspec::Upgrades;
    use sonic_evm::test_utils::MockInterpreter;
    use sonic_executor::ProcessedBlock;
    use sonic_primitives::{constants::EMPTY_ROOT_HASH, GenesisAccount};
    use std::time::Duration;

    fn replayer() -> Replayer {
        let chain_spec = Arc::new(ChainSpec::builder(146).upgrades(Upgrades::sonic()).build());
        Replayer::new(chain_spec, Arc::new(MockInterpreter::new()))
    }

    fn genesis_block(state_root: B256) -> SealedBlock {
        SealedBlock::new(Header { state_root, ..Default::default() }, vec![])
    }

    #[test]
    fn genesis_keeps_empty_accounts() {
        let storage_only = Address::with_last_byte(1);
        let mut account = GenesisAccount::default();
        account.storage.insert(B256::with_last_byte(1), B256::with_last_byte(2));
        let genesis = Genesis::default()
            .with_account(storage_only, account)
            .with_account(Address::with_last_byte(2), GenesisAccount::default())
            .with_account(
                Address::with_last_byte(3),
                GenesisAccount {
                    balance: U256::from(5),
                    nonce: 2,
                    code: Bytes::from_static(&[0x60, 0x00]),
                    ..Default::default()
                },
            );

        let mut state = MemoryStateDb::new();
        let root = apply_genesis(&mut state, &genesis);
        assert_ne!(root, EMPTY_ROOT_HASH);
        assert_eq!(state.account_count(), 3);
        assert_eq!(state.storage(storage_only, B256::with_last_byte(1)), B256::with_last_byte(2));
        assert_eq!(state.nonce(Address::with_last_byte(3)), 2);
        assert_eq!(state.last_committed_block(), Some(0));

        let mut again = MemoryStateDb::new();
        assert_eq!(apply_genesis(&mut again, &genesis), root);
    }

    #[test]
    fn genesis_root_is_checked() {
        let mut replayer = replayer();
        let err = replayer.init_genesis(&Genesis::default(), &genesis_block(B256::ZERO));
        assert_matches!(err, Err(ReplayError::StateRoot { number: 0, diff })
            if diff.got == EMPTY_ROOT_HASH && diff.expected == B256::ZERO);

        let mut replayer = self::replayer();
        let mut header = Header { state_root: EMPTY_ROOT_HASH, number: 1, ..Default::default() };
        let block = SealedBlock::new(header.clone(), vec![]);
        assert_matches!(
            replayer.init_genesis(&Genesis::default(), &block),
            Err(ReplayError::UnexpectedNumber(GotExpected { got: 1, expected: 0 }))
        );

        header.number = 0;
        let block = SealedBlock::new(header, vec![]);
        replayer.init_genesis(&Genesis::default(), &block).unwrap();
        assert_eq!(replayer.next_block(), Some(1));
    }

    #[test]
    fn blocks_follow_genesis() {
        let mut replayer = replayer();
        let block = SealedBlock::new(Header { number: 1, ..Default::default() }, vec![]);
        assert_matches!(replayer.replay_block(&block), Err(ReplayError::MissingGenesis));
        assert_matches!(
            replayer.replay(&Genesis::default(), &[]),
            Err(ReplayError::MissingGenesis)
        );

        replayer.init_genesis(&Genesis::default(), &genesis_block(EMPTY_ROOT_HASH)).unwrap();
        let block = SealedBlock::new(Header { number: 2, ..Default::default() }, vec![]);
        assert_matches!(
            replayer.replay_block(&block),
            Err(ReplayError::UnexpectedNumber(GotExpected { got: 2, expected: 1 }))
        );

        let block = SealedBlock::new(Header { number: 1, ..Default::default() }, vec![]);
        assert_matches!(
            replayer.replay_block(&block),
            Err(ReplayError::ExtraData { number: 1, source: ExtraDataError::InvalidLength(0) })
        );
    }

    #[test]
    fn header_values_survive_sealing() {
        let header = EvmHeader {
            number: 9,
            parent_hash: B256::repeat_byte(3),
            coinbase: Address::with_last_byte(7),
            time: Timestamp::from_parts(1_700_000_000, 999),
            duration: Duration::from_millis(1_250),
            gas_limit: 5_000_000,
            prev_randao: B256::repeat_byte(9),
            base_fee: U256::from(11),
            blob_base_fee: None,
        };
        let (block, _) = seal_block(&header, ProcessedBlock::default(), EMPTY_ROOT_HASH);
        assert_eq!(evm_header(&block.header).unwrap(), header);
    }

    #[test]
    fn empty_block_verifies() {
        let mut replayer = replayer();
        replayer.init_genesis(&Genesis::default(), &genesis_block(EMPTY_ROOT_HASH)).unwrap();

        let header = EvmHeader { number: 1, gas_limit: 1_000_000, ..Default::default() };
        let (block, receipts) = seal_block(&header, ProcessedBlock::default(), EMPTY_ROOT_HASH);
        assert!(receipts.is_empty());

        assert_eq!(replayer.replay_block(&block).unwrap(), vec![]);
        assert_eq!(replayer.next_block(), Some(2));
        assert_eq!(replayer.state().last_committed_block(), Some(1));
    }
}
