use sonic_executor::TransactionProcessor;
use sonic_primitives::TransactionSigned;
use tracing::{trace, warn};

/// Result of trial-executing a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// The transaction executed and can be included.
    Success {
        /// Block gas consumed by the transaction and anything executed on its behalf.
        gas_used: u64,
    },
    /// The transaction can't be included on top of the transactions accepted so far.
    Skipped,
    /// The transaction, with its fee charge if it is sponsored, requests more gas than the block
    /// has left.
    OutOfGas,
}

/// Executes candidates one after another on top of each other.
#[auto_impl::auto_impl(&mut, Box)]
pub trait TrialProcessor {
    /// Executes `tx` with `remaining_gas` left in the block.
    ///
    /// Only successful trials change the state seen by later trials.
    fn run(&mut self, tx: &TransactionSigned, remaining_gas: u64) -> TrialOutcome;
}

/// A [`TrialProcessor`] running candidates through the block processor.
///
/// Sponsored transactions are followed by their fee charge as in a processed block. The gas of
/// the charge is part of the sponsored transaction's [`TrialOutcome::Success`].
#[derive(Debug)]
pub struct EvmTrialProcessor<'a> {
    processor: TransactionProcessor<'a>,
    next_index: usize,
}

impl<'a> EvmTrialProcessor<'a> {
    /// Wraps a processor at the start of a block.
    pub const fn new(processor: TransactionProcessor<'a>) -> Self {
        Self { processor, next_index: 0 }
    }

    /// Number of transactions executed so far, including fee charges.
    pub const fn executed(&self) -> usize {
        self.next_index
    }
}

impl TrialProcessor for EvmTrialProcessor<'_> {
    fn run(&mut self, tx: &TransactionSigned, remaining_gas: u64) -> TrialOutcome {
        let hash = tx.hash();
        let required_gas = self.processor.required_gas(tx);
        if required_gas > remaining_gas {
            trace!(
                target: "scheduler",
                ?hash,
                required_gas,
                remaining_gas,
                "Candidate exceeds remaining gas"
            );
            return TrialOutcome::OutOfGas
        }

        let processed = match self.processor.run(self.next_index, tx) {
            Ok(processed) => processed,
            Err(err) => {
                warn!(target: "scheduler", ?hash, %err, "Failed to run candidate");
                return TrialOutcome::Skipped
            }
        };
        if processed.first().map_or(true, |first| first.is_skipped()) {
            trace!(target: "scheduler", ?hash, "Skipped candidate");
            return TrialOutcome::Skipped
        }

        let gas_used = processed
            .iter()
            .filter_map(|entry| entry.receipt.as_ref())
            .map(|receipt| receipt.gas_used)
            .sum();
        self.next_index += processed.len();
        TrialOutcome::Success { gas_used }
    }
}
