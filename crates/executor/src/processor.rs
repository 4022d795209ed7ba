use crate::ProcessError;
use alloy_primitives::{Address, B256};
use sonic_chainspec::{ChainSpec, Upgrades};
use sonic_evm::{
    apply_message, system_calls, BlockHashProvider, Evm, EvmHeader, ExecutionResult, GasPool,
    Interpreter, Message, TxContext, VmConfig,
};
use sonic_gas_subsidies::{
    fee_charge_transaction, get_gas_config, is_covered, is_sponsorship_request,
};
use sonic_primitives::{ChainSigner, IndexedLog, Receipt, ReceiptStatus, TransactionSigned};
use sonic_state::StateDb;
use std::{fmt, sync::Arc};
use tracing::{debug, trace, warn};

/// A block to process: the values of its header and its transactions in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutableBlock {
    /// Header values visible to the transactions.
    pub header: EvmHeader,
    /// Transactions in execution order.
    pub transactions: Vec<TransactionSigned>,
}

/// A transaction and its receipt, `None` if it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedTransaction {
    /// The transaction.
    pub transaction: TransactionSigned,
    /// The receipt of an executed transaction.
    pub receipt: Option<Receipt>,
}

impl ProcessedTransaction {
    /// Returns true if the transaction was skipped.
    pub const fn is_skipped(&self) -> bool {
        self.receipt.is_none()
    }
}

/// Outcome of [`StateProcessor::process`].
///
/// `transactions` and `receipts` are parallel. They contain the transactions of the block
/// followed, after every charged sponsored transaction, by its fee-charge transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedBlock {
    /// Processed transactions, including injected fee charges.
    pub transactions: Vec<TransactionSigned>,
    /// Receipts, `None` for skipped transactions.
    pub receipts: Vec<Option<Receipt>>,
    /// Logs of all executed transactions in order.
    pub logs: Vec<IndexedLog>,
    /// Positions of the skipped transactions.
    pub skipped: Vec<usize>,
    /// Gas used by all executed transactions.
    pub used_gas: u64,
}

impl ProcessedBlock {
    /// Appends a processed transaction.
    pub fn push(&mut self, processed: ProcessedTransaction) {
        let ProcessedTransaction { transaction, receipt } = processed;
        match &receipt {
            Some(receipt) => self.logs.extend(receipt.logs.iter().cloned()),
            None => self.skipped.push(self.transactions.len()),
        }
        self.transactions.push(transaction);
        self.receipts.push(receipt);
    }

    /// Number of processed transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Returns true if nothing was processed.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Applies blocks of transactions to a state.
pub struct StateProcessor {
    chain_spec: Arc<ChainSpec>,
    interpreter: Arc<dyn Interpreter>,
    block_hashes: Arc<dyn BlockHashProvider>,
    charge_sponsored: bool,
}

impl fmt::Debug for StateProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateProcessor")
            .field("chain_spec", &self.chain_spec)
            .field("charge_sponsored", &self.charge_sponsored)
            .finish_non_exhaustive()
    }
}

impl StateProcessor {
    /// Creates a processor charging sponsored transactions whenever gas subsidies are active.
    pub fn new(
        chain_spec: Arc<ChainSpec>,
        interpreter: Arc<dyn Interpreter>,
        block_hashes: Arc<dyn BlockHashProvider>,
    ) -> Self {
        Self { chain_spec, interpreter, block_hashes, charge_sponsored: true }
    }

    /// Enables or disables the injection of fee-charge transactions.
    ///
    /// Blocks of the chain already contain their fee charges, so verifying them runs with
    /// injection disabled.
    pub const fn with_gas_subsidies(mut self, enabled: bool) -> Self {
        self.charge_sponsored = enabled;
        self
    }

    /// The chain spec.
    pub const fn chain_spec(&self) -> &Arc<ChainSpec> {
        &self.chain_spec
    }

    /// Starts a block on `state` and returns the processor of its transactions.
    ///
    /// Runs the block start system calls. The caller begins and ends the block on the state.
    pub fn begin_block<'a>(
        &'a self,
        header: &EvmHeader,
        state: &'a mut dyn StateDb,
        vm_config: VmConfig,
        on_log: Option<&'a mut dyn FnMut(&IndexedLog)>,
    ) -> TransactionProcessor<'a> {
        let upgrades = self.chain_spec.upgrades_at(header.number);
        let mut evm = Evm::new(
            state,
            &*self.interpreter,
            &*self.block_hashes,
            header.block_context(self.chain_spec.chain_id),
            upgrades.rules(),
            vm_config,
        );
        system_calls::process_parent_block_hash(&mut evm, header.parent_hash);

        TransactionProcessor {
            evm,
            upgrades,
            signer: self.chain_spec.signer_at(header.number),
            gas_pool: GasPool::new(header.gas_limit),
            used_gas: 0,
            charge_sponsored: self.charge_sponsored && upgrades.gas_subsidies,
            on_log,
        }
    }

    /// Processes all transactions of `block`.
    ///
    /// `on_log` receives the logs of every executed transaction in order. Only an
    /// unrecoverable sender or a failed fee charge aborts the block.
    pub fn process<'a>(
        &'a self,
        block: &ExecutableBlock,
        state: &'a mut dyn StateDb,
        vm_config: VmConfig,
        on_log: Option<&'a mut dyn FnMut(&IndexedLog)>,
    ) -> Result<ProcessedBlock, ProcessError> {
        let mut processor = self.begin_block(&block.header, state, vm_config, on_log);
        let mut processed = ProcessedBlock::default();
        for tx in &block.transactions {
            for entry in processor.run(processed.len(), tx)? {
                processed.push(entry);
            }
        }
        processed.used_gas = processor.used_gas();

        debug!(
            target: "executor",
            number = block.header.number,
            transactions = processed.len(),
            skipped = processed.skipped.len(),
            used_gas = processed.used_gas,
            "Processed block"
        );
        Ok(processed)
    }
}

/// Processes the transactions of a block one at a time.
///
/// Created by [`StateProcessor::begin_block`]. Produces the same receipts as
/// [`StateProcessor::process`] for the same transactions.
pub struct TransactionProcessor<'a> {
    evm: Evm<'a>,
    upgrades: Upgrades,
    signer: ChainSigner,
    gas_pool: GasPool,
    used_gas: u64,
    charge_sponsored: bool,
    on_log: Option<&'a mut dyn FnMut(&IndexedLog)>,
}

impl fmt::Debug for TransactionProcessor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionProcessor")
            .field("evm", &self.evm)
            .field("upgrades", &self.upgrades)
            .field("gas_pool", &self.gas_pool)
            .field("used_gas", &self.used_gas)
            .field("charge_sponsored", &self.charge_sponsored)
            .finish_non_exhaustive()
    }
}

impl TransactionProcessor<'_> {
    /// Gas used by the transactions processed so far.
    pub const fn used_gas(&self) -> u64 {
        self.used_gas
    }

    /// Gas left in the block.
    pub const fn remaining_gas(&self) -> u64 {
        self.gas_pool.gas()
    }

    /// Block gas `tx` may need: its gas limit, plus the gas limit of its fee charge if it is a
    /// sponsored transaction that gets charged.
    pub fn required_gas(&mut self, tx: &TransactionSigned) -> u64 {
        let mut gas = tx.gas_limit();
        if self.charge_sponsored && is_sponsorship_request(tx) {
            if let Ok(gas_config) = get_gas_config(&mut self.evm) {
                gas = gas.saturating_add(gas_config.deduct_fees_gas);
            }
        }
        gas
    }

    /// Processes `tx` at position `index` of the block.
    ///
    /// Returns the processed transaction, followed by its fee charge at `index + 1` if it is a
    /// charged sponsored transaction.
    pub fn run(
        &mut self,
        index: usize,
        tx: &TransactionSigned,
    ) -> Result<Vec<ProcessedTransaction>, ProcessError> {
        let sender = self.signer.sender_cached(tx)?;
        let sponsored = self.upgrades.gas_subsidies && is_sponsorship_request(tx);
        if sponsored && self.charge_sponsored {
            return self.run_sponsored(index, tx, sender)
        }

        let receipt = self
            .execute(index, tx, sender, sponsored)
            .map(|result| self.commit(index, tx, sender, result));
        Ok(vec![ProcessedTransaction { transaction: tx.clone(), receipt }])
    }

    fn run_sponsored(
        &mut self,
        index: usize,
        tx: &TransactionSigned,
        sender: Address,
    ) -> Result<Vec<ProcessedTransaction>, ProcessError> {
        let hash = tx.hash();
        let skipped = || vec![ProcessedTransaction { transaction: tx.clone(), receipt: None }];

        let coverage = match is_covered(&self.upgrades, &mut self.evm, tx, sender) {
            Ok(coverage) if coverage.is_covered() => coverage,
            Ok(_) => {
                debug!(target: "executor", ?hash, %sender, "Skipped uncovered sponsorship request");
                return Ok(skipped())
            }
            Err(err) => {
                warn!(target: "executor", ?hash, %sender, %err, "Skipped sponsorship request");
                return Ok(skipped())
            }
        };

        let snapshot = self.evm.state_mut().snapshot();
        let available = self.gas_pool.gas();
        let Some(result) = self.execute(index, tx, sender, true) else { return Ok(skipped()) };

        let fee_charge = if self.gas_pool.gas() < coverage.gas_config.deduct_fees_gas {
            warn!(target: "executor", ?hash, "Skipped sponsored transaction, no gas for its fee");
            None
        } else {
            let nonce = self.evm.state_ref().nonce(Address::ZERO);
            let base_fee = self.evm.block_context().base_fee;
            fee_charge_transaction(
                nonce,
                &coverage.gas_config,
                coverage.fund_id,
                result.used_gas,
                base_fee,
            )
            .inspect_err(|err| {
                warn!(target: "executor", ?hash, %err, "Skipped sponsored transaction")
            })
            .ok()
        };
        let Some(fee_charge) = fee_charge else {
            self.evm.state_mut().revert_to_snapshot(snapshot);
            self.gas_pool = GasPool::new(available);
            return Ok(skipped())
        };

        let receipt = self.commit(index, tx, sender, result);
        let charged = self
            .execute(index + 1, &fee_charge, Address::ZERO, false)
            .map(|result| self.commit(index + 1, &fee_charge, Address::ZERO, result));
        if !charged.as_ref().is_some_and(|receipt| receipt.status.is_success()) {
            return Err(ProcessError::FeeChargeFailed {
                sponsored: hash,
                fee_charge: fee_charge.hash(),
            })
        }

        trace!(
            target: "executor",
            ?hash,
            fund_id = %coverage.fund_id,
            gas_used = receipt.gas_used,
            "Charged sponsored transaction"
        );
        Ok(vec![
            ProcessedTransaction { transaction: tx.clone(), receipt: Some(receipt) },
            ProcessedTransaction { transaction: fee_charge, receipt: charged },
        ])
    }

    /// Applies `tx`. Returns `None` if it is skipped, leaving state and gas pool untouched.
    fn execute(
        &mut self,
        index: usize,
        tx: &TransactionSigned,
        sender: Address,
        sponsored: bool,
    ) -> Option<ExecutionResult> {
        let hash = tx.hash();
        self.evm.state_mut().set_tx_context(hash, index);
        if tx.blob_versioned_hashes().is_some_and(|hashes| !hashes.is_empty()) {
            debug!(target: "executor", ?hash, "Skipped transaction, blob data not supported");
            return None
        }

        let msg = Message::from_transaction(tx, sender, Some(self.evm.block_context().base_fee));
        self.evm.set_tx_context(TxContext::from_message(&msg));
        let config = *self.evm.config();
        // internal and sponsored transactions pay no base fee
        self.evm.config_mut().no_base_fee |= msg.skip_nonce_checks || sponsored;

        let snapshot = self.evm.state_mut().snapshot();
        let available = self.gas_pool.gas();
        let result = apply_message(&mut self.evm, &msg, &mut self.gas_pool);
        *self.evm.config_mut() = config;

        match result {
            Ok(result) => Some(result),
            Err(err) => {
                self.evm.state_mut().revert_to_snapshot(snapshot);
                self.gas_pool = GasPool::new(available);
                debug!(target: "executor", ?hash, %sender, %err, "Skipped transaction");
                None
            }
        }
    }

    /// Ends the transaction on the state and builds its receipt.
    fn commit(
        &mut self,
        index: usize,
        tx: &TransactionSigned,
        sender: Address,
        result: ExecutionResult,
    ) -> Receipt {
        let hash = tx.hash();
        let number = self.evm.block_context().number;
        let state = self.evm.state_mut();
        let logs = state.logs(hash, number, B256::ZERO);
        state.end_transaction();
        state.finalise(true);

        if let Some(on_log) = self.on_log.as_deref_mut() {
            for log in &logs {
                on_log(log);
            }
        }
        self.used_gas += result.used_gas;

        trace!(
            target: "executor",
            ?hash,
            index,
            gas_used = result.used_gas,
            failed = result.failed(),
            "Executed transaction"
        );
        Receipt {
            tx_type: tx.tx_type(),
            status: ReceiptStatus::from(!result.failed()),
            cumulative_gas_used: self.used_gas,
            gas_used: result.used_gas,
            tx_hash: hash,
            contract_address: tx.is_create().then(|| sender.create(tx.nonce())),
            logs_bloom: Receipt::bloom(logs.iter().map(|log| &log.inner)),
            logs,
            block_number: number,
            block_hash: B256::ZERO,
            transaction_index: index as u32,
        }
    }
}
