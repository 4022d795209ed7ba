use crate::{EvmRules, Upgrades};
use alloy_primitives::BlockNumber;
use sonic_primitives::ChainSigner;

/// Chain id of the Sonic mainnet.
pub const SONIC_CHAIN_ID: u64 = 146;

/// Default limit of the gas a single transaction may request (EIP-7825).
pub const DEFAULT_MAX_EVENT_GAS: u64 = 1 << 24;

/// Upgrades taking effect from a block onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeActivation {
    /// First block the upgrades apply to.
    pub block: BlockNumber,
    /// The upgrades.
    pub upgrades: Upgrades,
}

/// Static description of a chain: its id, the upgrade schedule and network limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    /// Chain id used for replay protection.
    pub chain_id: u64,
    /// Upgrade schedule, sorted by activation block.
    activations: Vec<UpgradeActivation>,
    /// Maximum gas of a single transaction.
    pub max_event_gas: u64,
}

impl ChainSpec {
    /// Returns a builder for a chain with the given id.
    pub fn builder(chain_id: u64) -> ChainSpecBuilder {
        ChainSpecBuilder::new(chain_id)
    }

    /// Upgrades active at block `number`. Blocks before the first activation run without any.
    pub fn upgrades_at(&self, number: BlockNumber) -> Upgrades {
        self.activations
            .iter()
            .rev()
            .find(|activation| activation.block <= number)
            .map(|activation| activation.upgrades)
            .unwrap_or_default()
    }

    /// EVM rules active at block `number`.
    pub fn rules_at(&self, number: BlockNumber) -> EvmRules {
        self.upgrades_at(number).rules()
    }

    /// Signer for transactions of block `number`.
    pub fn signer_at(&self, number: BlockNumber) -> ChainSigner {
        ChainSigner::new(self.chain_id, self.rules_at(number).signer_variant())
    }

    /// The upgrade schedule.
    pub fn activations(&self) -> &[UpgradeActivation] {
        &self.activations
    }
}

/// Builder for [`ChainSpec`].
#[derive(Debug, Clone)]
pub struct ChainSpecBuilder {
    chain_id: u64,
    activations: Vec<UpgradeActivation>,
    max_event_gas: u64,
}

impl ChainSpecBuilder {
    /// Creates a builder for a chain without upgrades.
    pub const fn new(chain_id: u64) -> Self {
        Self { chain_id, activations: Vec::new(), max_event_gas: DEFAULT_MAX_EVENT_GAS }
    }

    /// Sonic mainnet id with Sonic upgrades from genesis.
    pub fn sonic() -> Self {
        Self::new(SONIC_CHAIN_ID).upgrades(Upgrades::sonic())
    }

    /// Activates `upgrades` from genesis, replacing the schedule.
    pub fn upgrades(mut self, upgrades: Upgrades) -> Self {
        self.activations = vec![UpgradeActivation { block: 0, upgrades }];
        self
    }

    /// Activates `upgrades` from `block` onwards.
    pub fn upgrades_at(mut self, block: BlockNumber, upgrades: Upgrades) -> Self {
        self.activations.retain(|activation| activation.block != block);
        self.activations.push(UpgradeActivation { block, upgrades });
        self
    }

    /// Sets the per transaction gas cap.
    pub const fn max_event_gas(mut self, max_event_gas: u64) -> Self {
        self.max_event_gas = max_event_gas;
        self
    }

    /// Builds the chain spec.
    pub fn build(mut self) -> ChainSpec {
        self.activations.sort_by_key(|activation| activation.block);
        ChainSpec {
            chain_id: self.chain_id,
            activations: self.activations,
            max_event_gas: self.max_event_gas,
        }
    }
}
