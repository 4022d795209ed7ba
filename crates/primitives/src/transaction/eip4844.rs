use super::AccessList;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable};

/// An [EIP-4844](https://eips.ethereum.org/EIPS/eip-4844) blob transaction.
///
/// Blob transactions are decoded and hashed but never executed: blocks skip them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TxEip4844 {
    /// Chain the transaction is valid on.
    pub chain_id: u64,
    /// Nonce of the sender.
    pub nonce: u64,
    /// Gas limit of the transaction.
    pub gas_limit: u64,
    /// Fee cap.
    pub max_fee_per_gas: U256,
    /// Tip cap.
    pub max_priority_fee_per_gas: U256,
    /// Recipient, blob transactions cannot create contracts.
    pub to: Address,
    /// Value transferred to the recipient.
    pub value: U256,
    /// Addresses and storage keys warmed before execution.
    pub access_list: AccessList,
    /// Maximum price paid per unit of blob gas.
    pub max_fee_per_blob_gas: U256,
    /// Versioned hashes of the attached blobs.
    pub blob_versioned_hashes: Vec<B256>,
    /// Calldata.
    pub input: Bytes,
}

impl TxEip4844 {
    pub(crate) fn fields_len(&self) -> usize {
        self.chain_id.length() +
            self.nonce.length() +
            self.max_priority_fee_per_gas.length() +
            self.max_fee_per_gas.length() +
            self.gas_limit.length() +
            self.to.length() +
            self.value.length() +
            self.input.length() +
            self.access_list.length() +
            self.max_fee_per_blob_gas.length() +
            self.blob_versioned_hashes.length()
    }

    pub(crate) fn encode_fields(&self, out: &mut dyn BufMut) {
        self.chain_id.encode(out);
        self.nonce.encode(out);
        self.max_priority_fee_per_gas.encode(out);
        self.max_fee_per_gas.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.input.encode(out);
        self.access_list.encode(out);
        self.max_fee_per_blob_gas.encode(out);
        self.blob_versioned_hashes.encode(out);
    }

    pub(crate) fn decode_fields(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let chain_id = Decodable::decode(buf)?;
        let nonce = Decodable::decode(buf)?;
        let max_priority_fee_per_gas = Decodable::decode(buf)?;
        let max_fee_per_gas = Decodable::decode(buf)?;
        let gas_limit = Decodable::decode(buf)?;
        let to = Decodable::decode(buf)?;
        let value = Decodable::decode(buf)?;
        let input = Decodable::decode(buf)?;
        let access_list = Decodable::decode(buf)?;
        let max_fee_per_blob_gas = Decodable::decode(buf)?;
        let blob_versioned_hashes = Decodable::decode(buf)?;
        Ok(Self {
            chain_id,
            nonce,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            to,
            value,
            access_list,
            max_fee_per_blob_gas,
            blob_versioned_hashes,
            input,
        })
    }
}
