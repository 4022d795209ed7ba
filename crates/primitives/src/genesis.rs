use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Initial accounts of a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    /// Time of the genesis block in nanoseconds.
    #[serde(default)]
    pub timestamp: u64,
    /// Gas limit of the genesis block.
    #[serde(default)]
    pub gas_limit: u64,
    /// Accounts and their initial state.
    #[serde(default)]
    pub alloc: BTreeMap<Address, GenesisAccount>,
}

impl Genesis {
    /// Adds an account, replacing any previous entry for `address`.
    pub fn with_account(mut self, address: Address, account: GenesisAccount) -> Self {
        self.alloc.insert(address, account);
        self
    }
}

/// Initial state of a genesis account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Balance in wei.
    #[serde(default)]
    pub balance: U256,
    /// Nonce.
    #[serde(default)]
    pub nonce: u64,
    /// Deployed code.
    #[serde(default, skip_serializing_if = "<[u8]>::is_empty")]
    pub code: Bytes,
    /// Storage slots.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<B256, B256>,
}

impl GenesisAccount {
    /// Creates an account holding `balance`.
    pub fn with_balance(balance: U256) -> Self {
        Self { balance, ..Default::default() }
    }
}
