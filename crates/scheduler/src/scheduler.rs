use crate::{CancelToken, Candidates, EvmTrialProcessor, TrialOutcome, TrialProcessor};
use sonic_evm::{EvmHeader, VmConfig};
use sonic_executor::StateProcessor;
use sonic_primitives::{constants::TX_GAS, TransactionSigned};
use sonic_state::{StateDb, StateSnapshotProvider};
use std::fmt;
use tracing::{debug, trace};

/// Remaining gas below which scheduling stops: no transaction can use less.
pub const DEFAULT_MIN_TX_GAS: u64 = TX_GAS;

/// Settings of the [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Scheduling stops once less gas than this is left.
    pub min_tx_gas: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { min_tx_gas: DEFAULT_MIN_TX_GAS }
    }
}

/// A transaction picked by the [`Scheduler`] and the gas it used in its trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTransaction {
    /// The transaction.
    pub transaction: TransactionSigned,
    /// Block gas used by the transaction, including its fee charge if it is sponsored.
    pub gas_used: u64,
}

/// Picks the transactions of a block proposal.
///
/// Candidates are trial-executed in order on a snapshot of the latest state. The result is a
/// prefix of the accepted candidates that executes in order within the gas limit.
pub struct Scheduler<P> {
    processor: StateProcessor,
    state: P,
    config: SchedulerConfig,
}

impl<P> fmt::Debug for Scheduler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("processor", &self.processor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P: StateSnapshotProvider> Scheduler<P> {
    /// Creates a scheduler trial-executing with `processor` on snapshots of `state`.
    pub fn new(processor: StateProcessor, state: P) -> Self {
        Self { processor, state, config: SchedulerConfig::default() }
    }

    /// Sets the [`SchedulerConfig`].
    pub const fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// The settings of the scheduler.
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Picks the transactions of a block on top of the latest state.
    ///
    /// `block` provides the header values seen by the transactions; its gas limit is replaced by
    /// `gas_limit`. Returns early with the transactions picked so far once `cancel` is set.
    pub fn schedule<C: Candidates + ?Sized>(
        &self,
        cancel: &CancelToken,
        block: &EvmHeader,
        candidates: &mut C,
        gas_limit: u64,
    ) -> Vec<ScheduledTransaction> {
        let header = EvmHeader { gas_limit, ..block.clone() };
        let mut state = self.state.state_snapshot();
        state.begin_block(header.number);

        let scheduled = {
            let processor =
                self.processor.begin_block(&header, &mut *state, VmConfig::default(), None);
            let mut trial = EvmTrialProcessor::new(processor);
            schedule_candidates(&mut trial, candidates, gas_limit, &self.config, cancel)
        };

        state.end_block(header.number);
        state.release();
        scheduled
    }
}

/// Runs the candidates through `processor` until the stream is exhausted, less than
/// [`SchedulerConfig::min_tx_gas`] is left or `cancel` is set.
///
/// A candidate exceeding the remaining gas is skipped without ending the run: later candidates
/// may need less.
pub fn schedule_candidates<T, C>(
    processor: &mut T,
    candidates: &mut C,
    gas_limit: u64,
    config: &SchedulerConfig,
    cancel: &CancelToken,
) -> Vec<ScheduledTransaction>
where
    T: TrialProcessor + ?Sized,
    C: Candidates + ?Sized,
{
    let mut remaining_gas = gas_limit;
    let mut scheduled = Vec::new();
    let mut limit_reached = false;
    let mut skipped = 0usize;

    while remaining_gas >= config.min_tx_gas {
        if cancel.is_cancelled() {
            debug!(target: "scheduler", scheduled = scheduled.len(), "Scheduling cancelled");
            break
        }
        let Some(tx) = candidates.current() else { break };

        match processor.run(tx, remaining_gas) {
            TrialOutcome::Success { gas_used } => {
                trace!(target: "scheduler", hash = ?tx.hash(), gas_used, "Scheduled transaction");
                scheduled.push(ScheduledTransaction { transaction: tx.clone(), gas_used });
                remaining_gas = remaining_gas.saturating_sub(gas_used);
                candidates.accept();
            }
            TrialOutcome::Skipped => {
                skipped += 1;
                candidates.skip();
            }
            TrialOutcome::OutOfGas => {
                limit_reached = true;
                skipped += 1;
                candidates.skip();
            }
        }
    }

    debug!(
        target: "scheduler",
        scheduled = scheduled.len(),
        skipped,
        gas_used = gas_limit - remaining_gas,
        limit_reached,
        "Scheduled block"
    );
    scheduled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderedCandidates;
    use sonic_primitives::{Signature, Transaction, TxLegacy};

    /// Runs transactions whose nonce is prime, each using two gas.
    struct PrimeProcessor;

    impl TrialProcessor for PrimeProcessor {
        fn run(&mut self, tx: &TransactionSigned, remaining_gas: u64) -> TrialOutcome {
            let n = tx.nonce();
            if n < 2 || (2..n).any(|d| n % d == 0) {
                TrialOutcome::Skipped
            } else if remaining_gas < 2 {
                TrialOutcome::OutOfGas
            } else {
                TrialOutcome::Success { gas_used: 2 }
            }
        }
    }

    /// Reports every transaction as using its gas limit.
    struct GasLimitProcessor;

    impl TrialProcessor for GasLimitProcessor {
        fn run(&mut self, tx: &TransactionSigned, remaining_gas: u64) -> TrialOutcome {
            if tx.gas_limit() > remaining_gas {
                TrialOutcome::OutOfGas
            } else {
                TrialOutcome::Success { gas_used: tx.gas_limit() }
            }
        }
    }

    fn tx(nonce: u64, gas_limit: u64) -> TransactionSigned {
        TransactionSigned::new(
            Transaction::Legacy(TxLegacy { nonce, gas_limit, ..Default::default() }),
            Signature::default(),
        )
    }

    fn nonces(scheduled: &[ScheduledTransaction]) -> Vec<u64> {
        scheduled.iter().map(|scheduled| scheduled.transaction.nonce()).collect()
    }

    #[test]
    fn respects_gas_limit() {
        const PRIMES: [u64; 11] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31];
        let config = SchedulerConfig { min_tx_gas: 2 };

        for limit in 0..30u64 {
            let mut candidates = OrderedCandidates::new((0..32).map(|nonce| tx(nonce, 2)));
            let scheduled = schedule_candidates(
                &mut PrimeProcessor,
                &mut candidates,
                limit,
                &config,
                &CancelToken::default(),
            );

            let expected = (limit / 2).min(PRIMES.len() as u64) as usize;
            assert_eq!(nonces(&scheduled), PRIMES[..expected].to_vec(), "limit {limit}");
            assert!(scheduled.iter().all(|scheduled| scheduled.gas_used == 2));
        }
    }

    #[test]
    fn continues_past_oversized_candidate() {
        let txs = vec![tx(0, 30_000), tx(1, 50_000), tx(2, 21_000), tx(3, 30_000)];
        let scheduled = schedule_candidates(
            &mut GasLimitProcessor,
            &mut OrderedCandidates::new(txs),
            60_000,
            &SchedulerConfig::default(),
            &CancelToken::default(),
        );
        assert_eq!(nonces(&scheduled), vec![0, 2]);
    }

    #[test]
    fn stops_below_minimum_gas() {
        let txs = vec![tx(0, 30_000), tx(1, 1_000)];
        let scheduled = schedule_candidates(
            &mut GasLimitProcessor,
            &mut OrderedCandidates::new(txs),
            50_000,
            &SchedulerConfig::default(),
            &CancelToken::default(),
        );
        assert_eq!(nonces(&scheduled), vec![0]);
    }

    #[test]
    fn cancelled_before_first_trial() {
        let cancel = CancelToken::default();
        cancel.cancel();
        let scheduled = schedule_candidates(
            &mut GasLimitProcessor,
            &mut OrderedCandidates::new(vec![tx(0, 21_000)]),
            1_000_000,
            &SchedulerConfig::default(),
            &cancel,
        );
        assert!(scheduled.is_empty());
    }

    #[test]
    fn cancellation_keeps_prefix() {
        struct CancellingProcessor(CancelToken);

        impl TrialProcessor for CancellingProcessor {
            fn run(&mut self, tx: &TransactionSigned, _remaining_gas: u64) -> TrialOutcome {
                if tx.nonce() == 1 {
                    self.0.cancel();
                }
                TrialOutcome::Success { gas_used: tx.gas_limit() }
            }
        }

        let cancel = CancelToken::default();
        let txs = (0..5).map(|nonce| tx(nonce, 21_000));
        let scheduled = schedule_candidates(
            &mut CancellingProcessor(cancel.clone()),
            &mut OrderedCandidates::new(txs),
            1_000_000,
            &SchedulerConfig::default(),
            &cancel,
        );
        assert_eq!(nonces(&scheduled), vec![0, 1]);
    }
}
