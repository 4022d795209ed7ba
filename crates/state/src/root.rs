use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_rlp::RlpEncodable;
use alloy_trie::{HashBuilder, Nibbles};

/// Account leaf of the state trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, RlpEncodable)]
pub struct TrieAccount {
    /// Nonce.
    pub nonce: u64,
    /// Balance.
    pub balance: U256,
    /// Root of the storage trie.
    pub storage_root: B256,
    /// Hash of the code.
    pub code_hash: B256,
}

/// Root of a storage trie. Zero slots are not part of the trie.
pub fn storage_root<'a>(storage: impl IntoIterator<Item = (&'a B256, &'a B256)>) -> B256 {
    let leaves = storage
        .into_iter()
        .filter(|(_, value)| !value.is_zero())
        .map(|(key, value)| (keccak256(key), alloy_rlp::encode(U256::from_be_bytes(value.0))));
    root_of_hashed(leaves)
}

/// Root of the state trie over the given accounts.
pub fn state_root(accounts: impl IntoIterator<Item = (Address, TrieAccount)>) -> B256 {
    let leaves = accounts
        .into_iter()
        .map(|(address, account)| (keccak256(address), alloy_rlp::encode(account)));
    root_of_hashed(leaves)
}

fn root_of_hashed(leaves: impl Iterator<Item = (B256, Vec<u8>)>) -> B256 {
    let mut leaves: Vec<_> = leaves.collect();
    leaves.sort_unstable_by_key(|(key, _)| *key);

    let mut hb = HashBuilder::default();
    for (key, value) in leaves {
        hb.add_leaf(Nibbles::unpack(key), &value);
    }
    hb.root()
}
