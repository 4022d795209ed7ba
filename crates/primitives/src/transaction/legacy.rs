use alloy_primitives::{keccak256, Bytes, TxKind, B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, Header};

/// A legacy transaction, optionally replay protected by
/// [EIP-155](https://eips.ethereum.org/EIPS/eip-155).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TxLegacy {
    /// Chain id used for replay protection, `None` for unprotected transactions.
    pub chain_id: Option<u64>,
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
    /// Calldata or init code.
    pub input: Bytes,
}

impl TxLegacy {
    pub(crate) fn fields_len(&self) -> usize {
        self.nonce.length() +
            self.gas_price.length() +
            self.gas_limit.length() +
            self.to.length() +
            self.value.length() +
            self.input.length()
    }

    pub(crate) fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.input.encode(out);
    }

    /// Decodes the fields. The chain id is not part of them and left unset.
    pub(crate) fn decode_fields(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Ok(Self {
            chain_id: None,
            nonce: Decodable::decode(buf)?,
            gas_price: Decodable::decode(buf)?,
            gas_limit: Decodable::decode(buf)?,
            to: Decodable::decode(buf)?,
            value: Decodable::decode(buf)?,
            input: Decodable::decode(buf)?,
        })
    }

    /// Signing hash, `keccak256(rlp([fields.., chain_id, 0, 0]))` when replay protected.
    pub(crate) fn signature_hash(&self) -> B256 {
        let mut payload_length = self.fields_len();
        if let Some(chain_id) = self.chain_id {
            payload_length += chain_id.length() + 2;
        }
        let mut out = Vec::with_capacity(payload_length + 3);
        Header { list: true, payload_length }.encode(&mut out);
        self.encode_fields(&mut out);
        if let Some(chain_id) = self.chain_id {
            chain_id.encode(&mut out);
            0u8.encode(&mut out);
            0u8.encode(&mut out);
        }
        keccak256(out)
    }
}
