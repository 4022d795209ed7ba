use super::AccessList;
use alloy_primitives::{Bytes, TxKind, U256};
use alloy_rlp::{BufMut, Decodable, Encodable};

/// An [EIP-2930](https://eips.ethereum.org/EIPS/eip-2930) access list transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TxEip2930 {
    /// Chain the transaction is valid on.
    pub chain_id: u64,
    /// Nonce of the sender.
    pub nonce: u64,
    /// Price paid per unit of gas.
    pub gas_price: U256,
    /// Gas limit of the transaction.
    pub gas_limit: u64,
    /// Recipient, or contract creation.
    pub to: TxKind,
    /// Value transferred to the recipient.
    pub value: U256,
    /// Addresses and storage keys warmed before execution.
    pub access_list: AccessList,
    /// Calldata or init code.
    pub input: Bytes,
}

impl TxEip2930 {
    pub(crate) fn fields_len(&self) -> usize {
        self.chain_id.length() +
            self.nonce.length() +
            self.gas_price.length() +
            self.gas_limit.length() +
            self.to.length() +
            self.value.length() +
            self.input.length() +
            self.access_list.length()
    }

    pub(crate) fn encode_fields(&self, out: &mut dyn BufMut) {
        self.chain_id.encode(out);
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.input.encode(out);
        self.access_list.encode(out);
    }

    pub(crate) fn decode_fields(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let chain_id = Decodable::decode(buf)?;
        let nonce = Decodable::decode(buf)?;
        let gas_price = Decodable::decode(buf)?;
        let gas_limit = Decodable::decode(buf)?;
        let to = Decodable::decode(buf)?;
        let value = Decodable::decode(buf)?;
        let input = Decodable::decode(buf)?;
        let access_list = Decodable::decode(buf)?;
        Ok(Self { chain_id, nonce, gas_price, gas_limit, to, value, access_list, input })
    }
}
