use crate::{is_covered, Coverage, SubsidyError};
use alloy_primitives::Address;
use parking_lot::RwLock;
use sonic_chainspec::ChainSpec;
use sonic_evm::{Evm, EvmHeader, Interpreter, RecentBlockHashes, VmConfig};
use sonic_primitives::TransactionSigned;
use sonic_state::StateSnapshotProvider;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Minimum interval between two warnings about a missing registry.
const REGISTRY_ABSENT_LOG_PERIOD: Duration = Duration::from_secs(10);

/// Decides whether a sponsorship request is paid by a fund.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait SubsidyChecker: Send + Sync {
    /// Returns true if a fund pays for `tx` sent by `sender`.
    fn is_covered(&self, tx: &TransactionSigned, sender: Address) -> Result<bool, SubsidyError>;
}

/// [`SubsidyChecker`] querying the registry on a snapshot of the latest state.
///
/// Queries run in the context of the block set by [`RegistryChecker::on_new_head`].
pub struct RegistryChecker<P> {
    chain_spec: Arc<ChainSpec>,
    state: P,
    interpreter: Arc<dyn Interpreter>,
    head: RwLock<EvmHeader>,
}

impl<P> fmt::Debug for RegistryChecker<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryChecker")
            .field("chain_spec", &self.chain_spec)
            .field("head", &*self.head.read())
            .finish_non_exhaustive()
    }
}

impl<P: StateSnapshotProvider> RegistryChecker<P> {
    /// Creates a checker evaluating requests in the context of `head`.
    pub fn new(
        chain_spec: Arc<ChainSpec>,
        state: P,
        interpreter: Arc<dyn Interpreter>,
        head: EvmHeader,
    ) -> Self {
        Self { chain_spec, state, interpreter, head: RwLock::new(head) }
    }

    /// Sets the block subsequent queries are evaluated in, usually the one following the
    /// latest head.
    pub fn on_new_head(&self, head: EvmHeader) {
        debug!(target: "subsidies", number = head.number, base_fee = %head.base_fee, "new head");
        *self.head.write() = head;
    }

    /// Selects the fund paying for `tx`.
    pub fn coverage(
        &self,
        tx: &TransactionSigned,
        sender: Address,
    ) -> Result<Coverage, SubsidyError> {
        let head = self.head.read().clone();
        let upgrades = self.chain_spec.upgrades_at(head.number);
        let block_hashes = RecentBlockHashes::new();
        let mut state = self.state.state_snapshot();

        let mut evm = Evm::new(
            &mut *state,
            &*self.interpreter,
            &block_hashes,
            head.block_context(self.chain_spec.chain_id),
            upgrades.rules(),
            VmConfig { no_base_fee: true },
        );
        let result = is_covered(&upgrades, &mut evm, tx, sender);
        drop(evm);
        state.release();

        if let Err(SubsidyError::RegistryAbsent) = &result {
            sonic_tracing::throttle!(REGISTRY_ABSENT_LOG_PERIOD, || {
                warn!(target: "subsidies", "Gas subsidies enabled but registry not deployed")
            });
        }
        result
    }
}

impl<P: StateSnapshotProvider> SubsidyChecker for RegistryChecker<P> {
    fn is_covered(&self, tx: &TransactionSigned, sender: Address) -> Result<bool, SubsidyError> {
        self.coverage(tx, sender).map(|coverage| coverage.is_covered())
    }
}
