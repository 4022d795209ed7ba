use serde::{Deserialize, Serialize};
use sonic_primitives::SignerVariant;

/// Network upgrades, switched on by the network rules rather than by block height alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Upgrades {
    /// Berlin: access lists and EIP-2929 gas.
    pub berlin: bool,
    /// London: dynamic fees, refund reduction, `0xEF` code rejection.
    pub london: bool,
    /// Lachesis light repeater.
    pub llr: bool,
    /// Sonic: Shanghai and Cancun rules, prev-randao.
    pub sonic: bool,
    /// Allegro: Prague rules.
    pub allegro: bool,
    /// Sponsored transactions paid from the subsidies registry.
    pub gas_subsidies: bool,
}

impl Upgrades {
    /// All upgrades of the Sonic network, without Allegro and gas subsidies.
    pub const fn sonic() -> Self {
        Self {
            berlin: true,
            london: true,
            llr: false,
            sonic: true,
            allegro: false,
            gas_subsidies: false,
        }
    }

    /// Sonic plus Allegro.
    pub const fn allegro() -> Self {
        Self { allegro: true, ..Self::sonic() }
    }

    /// Allegro plus gas subsidies.
    pub const fn with_gas_subsidies(self) -> Self {
        Self { gas_subsidies: true, ..self }
    }

    /// Returns the EVM rules implied by these upgrades.
    pub const fn rules(&self) -> EvmRules {
        EvmRules {
            is_berlin: self.berlin || self.sonic,
            is_london: self.london || self.sonic,
            is_merge: self.sonic,
            is_shanghai: self.sonic,
            is_cancun: self.sonic,
            is_prague: self.allegro,
        }
    }
}

/// EVM rules in effect for a block.
///
/// Homestead through Istanbul are always active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EvmRules {
    /// EIP-2929 access lists and gas.
    pub is_berlin: bool,
    /// EIP-1559 dynamic fees and EIP-3529 refunds.
    pub is_london: bool,
    /// Prev-randao instead of difficulty.
    pub is_merge: bool,
    /// EIP-3860 init code limit, `PUSH0`, warm coinbase.
    pub is_shanghai: bool,
    /// Transient storage, blob transactions.
    pub is_cancun: bool,
    /// EIP-2935 history storage, EIP-7623 floor gas, EIP-7702 set-code transactions.
    pub is_prague: bool,
}

impl EvmRules {
    /// Returns true if typed transactions (EIP-2718) are accepted.
    pub const fn is_eip2718(&self) -> bool {
        self.is_berlin
    }

    /// Returns true if dynamic fee transactions are accepted.
    pub const fn is_eip1559(&self) -> bool {
        self.is_london
    }

    /// Returns true if blob transactions are accepted.
    pub const fn is_eip4844(&self) -> bool {
        self.is_cancun
    }

    /// Returns true if set-code transactions are accepted.
    pub const fn is_eip7702(&self) -> bool {
        self.is_prague
    }

    /// Returns true if the parent hash is written to the history storage contract.
    pub const fn is_eip2935(&self) -> bool {
        self.is_prague
    }

    /// Returns true if calldata is subject to the EIP-7623 floor.
    pub const fn is_eip7623(&self) -> bool {
        self.is_prague
    }

    /// Signer variant accepting exactly the transaction types of these rules.
    pub const fn signer_variant(&self) -> SignerVariant {
        if self.is_prague {
            SignerVariant::Prague
        } else if self.is_cancun {
            SignerVariant::Cancun
        } else if self.is_london {
            SignerVariant::London
        } else if self.is_berlin {
            SignerVariant::Berlin
        } else {
            SignerVariant::Eip155
        }
    }
}
