use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_rlp::{
    Encodable, Header, RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper,
};
use std::ops::Deref;

/// Magic prefix of the authorization signing hash (EIP-7702).
const AUTHORIZATION_MAGIC: u8 = 0x05;

/// An address and the storage keys it pre-warms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
pub struct AccessListItem {
    /// Account address that would be loaded at the start of execution.
    pub address: Address,
    /// Keys of storage that would be loaded at the start of execution.
    pub storage_keys: Vec<B256>,
}

/// An [EIP-2930](https://eips.ethereum.org/EIPS/eip-2930) access list.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, RlpEncodableWrapper, RlpDecodableWrapper,
)]
pub struct AccessList(pub Vec<AccessListItem>);

impl AccessList {
    /// Returns the number of addresses and the total number of storage keys.
    pub fn counts(&self) -> (u64, u64) {
        self.0.iter().fold((0, 0), |(addresses, keys), item| {
            (addresses + 1, keys + item.storage_keys.len() as u64)
        })
    }
}

impl Deref for AccessList {
    type Target = [AccessListItem];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<AccessListItem>> for AccessList {
    fn from(items: Vec<AccessListItem>) -> Self {
        Self(items)
    }
}

/// A signed [EIP-7702](https://eips.ethereum.org/EIPS/eip-7702) authorization tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
pub struct SignedAuthorization {
    /// Chain the authorization is valid on, zero for any chain.
    pub chain_id: U256,
    /// Address whose code the authority delegates to.
    pub address: Address,
    /// Expected nonce of the authority.
    pub nonce: u64,
    /// Signature y parity.
    pub y_parity: u8,
    /// Signature r value.
    pub r: U256,
    /// Signature s value.
    pub s: U256,
}

impl SignedAuthorization {
    /// Hash signed by the authority: `keccak256(0x05 || rlp([chain_id, address, nonce]))`.
    pub fn signature_hash(&self) -> B256 {
        let payload_length = self.chain_id.length() + self.address.length() + self.nonce.length();
        let mut out = Vec::with_capacity(1 + payload_length + 3);
        out.push(AUTHORIZATION_MAGIC);
        Header { list: true, payload_length }.encode(&mut out);
        self.chain_id.encode(&mut out);
        self.address.encode(&mut out);
        self.nonce.encode(&mut out);
        keccak256(out)
    }
}
