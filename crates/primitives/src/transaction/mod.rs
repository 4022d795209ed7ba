//! Transaction types.

use crate::constants::DATA_GAS_PER_BLOB;
use alloy_primitives::{keccak256, Address, Bytes, TxHash, TxKind, B256, U256};
use alloy_rlp::{BufMut, Header};
use std::fmt;

pub use access_list::{AccessList, AccessListItem, SignedAuthorization};
pub use eip1559::TxEip1559;
pub use eip2930::TxEip2930;
pub use eip4844::TxEip4844;
pub use eip7702::TxEip7702;
pub use error::SignatureError;
pub use legacy::TxLegacy;
pub use sender_cache::{SenderCache, DEFAULT_SENDER_CACHE_CAPACITY};
pub use signature::Signature;
pub use signer::{public_key_to_address, recover_signer, ChainSigner, SignerVariant};

mod access_list;
mod eip1559;
mod eip2930;
mod eip4844;
mod eip7702;
mod error;
mod legacy;
mod sender_cache;
mod signature;
mod signer;

/// Identifier of the transaction envelope, the first byte of a typed transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TxType {
    /// Legacy transaction.
    #[default]
    Legacy = 0,
    /// Access list transaction.
    Eip2930 = 1,
    /// Dynamic fee transaction.
    Eip1559 = 2,
    /// Blob transaction.
    Eip4844 = 3,
    /// Set-code transaction.
    Eip7702 = 4,
}

impl TryFrom<u8> for TxType {
    type Error = alloy_rlp::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Legacy,
            1 => Self::Eip2930,
            2 => Self::Eip1559,
            3 => Self::Eip4844,
            4 => Self::Eip7702,
            _ => return Err(alloy_rlp::Error::Custom("unsupported transaction type")),
        })
    }
}

impl From<TxType> for u8 {
    fn from(ty: TxType) -> Self {
        ty as Self
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// An unsigned transaction of any supported type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transaction {
    /// Legacy transaction.
    Legacy(TxLegacy),
    /// Access list transaction.
    Eip2930(TxEip2930),
    /// Dynamic fee transaction.
    Eip1559(TxEip1559),
    /// Blob transaction.
    Eip4844(TxEip4844),
    /// Set-code transaction.
    Eip7702(TxEip7702),
}

impl Transaction {
    /// Returns the transaction type.
    pub const fn tx_type(&self) -> TxType {
        match self {
            Self::Legacy(_) => TxType::Legacy,
            Self::Eip2930(_) => TxType::Eip2930,
            Self::Eip1559(_) => TxType::Eip1559,
            Self::Eip4844(_) => TxType::Eip4844,
            Self::Eip7702(_) => TxType::Eip7702,
        }
    }

    /// Chain id of the transaction, `None` for unprotected legacy transactions.
    pub const fn chain_id(&self) -> Option<u64> {
        match self {
            Self::Legacy(tx) => tx.chain_id,
            Self::Eip2930(tx) => Some(tx.chain_id),
            Self::Eip1559(tx) => Some(tx.chain_id),
            Self::Eip4844(tx) => Some(tx.chain_id),
            Self::Eip7702(tx) => Some(tx.chain_id),
        }
    }

    /// Nonce of the sender.
    pub const fn nonce(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.nonce,
            Self::Eip2930(tx) => tx.nonce,
            Self::Eip1559(tx) => tx.nonce,
            Self::Eip4844(tx) => tx.nonce,
            Self::Eip7702(tx) => tx.nonce,
        }
    }

    /// Gas limit of the transaction.
    pub const fn gas_limit(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.gas_limit,
            Self::Eip2930(tx) => tx.gas_limit,
            Self::Eip1559(tx) => tx.gas_limit,
            Self::Eip4844(tx) => tx.gas_limit,
            Self::Eip7702(tx) => tx.gas_limit,
        }
    }

    /// Recipient or contract creation.
    pub const fn kind(&self) -> TxKind {
        match self {
            Self::Legacy(tx) => tx.to,
            Self::Eip2930(tx) => tx.to,
            Self::Eip1559(tx) => tx.to,
            Self::Eip4844(tx) => TxKind::Call(tx.to),
            Self::Eip7702(tx) => TxKind::Call(tx.to),
        }
    }

    /// Recipient, `None` for contract creations.
    pub fn to(&self) -> Option<Address> {
        self.kind().to().copied()
    }

    /// Returns true if the transaction creates a contract.
    pub const fn is_create(&self) -> bool {
        matches!(self.kind(), TxKind::Create)
    }

    /// Value transferred to the recipient.
    pub const fn value(&self) -> U256 {
        match self {
            Self::Legacy(tx) => tx.value,
            Self::Eip2930(tx) => tx.value,
            Self::Eip1559(tx) => tx.value,
            Self::Eip4844(tx) => tx.value,
            Self::Eip7702(tx) => tx.value,
        }
    }

    /// Calldata or init code.
    pub const fn input(&self) -> &Bytes {
        match self {
            Self::Legacy(tx) => &tx.input,
            Self::Eip2930(tx) => &tx.input,
            Self::Eip1559(tx) => &tx.input,
            Self::Eip4844(tx) => &tx.input,
            Self::Eip7702(tx) => &tx.input,
        }
    }

    /// Fee cap: the gas price of legacy and access list transactions, `max_fee_per_gas` otherwise.
    pub const fn max_fee_per_gas(&self) -> U256 {
        match self {
            Self::Legacy(tx) => tx.gas_price,
            Self::Eip2930(tx) => tx.gas_price,
            Self::Eip1559(tx) => tx.max_fee_per_gas,
            Self::Eip4844(tx) => tx.max_fee_per_gas,
            Self::Eip7702(tx) => tx.max_fee_per_gas,
        }
    }

    /// Tip cap: the gas price of legacy and access list transactions,
    /// `max_priority_fee_per_gas` otherwise.
    pub const fn max_priority_fee_per_gas(&self) -> U256 {
        match self {
            Self::Legacy(tx) => tx.gas_price,
            Self::Eip2930(tx) => tx.gas_price,
            Self::Eip1559(tx) => tx.max_priority_fee_per_gas,
            Self::Eip4844(tx) => tx.max_priority_fee_per_gas,
            Self::Eip7702(tx) => tx.max_priority_fee_per_gas,
        }
    }

    /// Gas price of the transaction, equal to the fee cap.
    pub const fn gas_price(&self) -> U256 {
        self.max_fee_per_gas()
    }

    /// Tip per gas paid on top of `base_fee`, `None` if the fee cap is below the base fee.
    pub fn effective_tip_per_gas(&self, base_fee: U256) -> Option<U256> {
        let fee_cap = self.max_fee_per_gas();
        let headroom = fee_cap.checked_sub(base_fee)?;
        Some(headroom.min(self.max_priority_fee_per_gas()))
    }

    /// Price per gas paid under `base_fee`: `min(fee_cap, base_fee + tip_cap)`.
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> U256 {
        match base_fee {
            Some(base_fee) => self
                .max_fee_per_gas()
                .min(base_fee.saturating_add(self.max_priority_fee_per_gas())),
            None => self.max_fee_per_gas(),
        }
    }

    /// Access list, `None` for legacy transactions.
    pub const fn access_list(&self) -> Option<&AccessList> {
        match self {
            Self::Legacy(_) => None,
            Self::Eip2930(tx) => Some(&tx.access_list),
            Self::Eip1559(tx) => Some(&tx.access_list),
            Self::Eip4844(tx) => Some(&tx.access_list),
            Self::Eip7702(tx) => Some(&tx.access_list),
        }
    }

    /// Blob versioned hashes, `None` unless this is a blob transaction.
    pub fn blob_versioned_hashes(&self) -> Option<&[B256]> {
        match self {
            Self::Eip4844(tx) => Some(&tx.blob_versioned_hashes),
            _ => None,
        }
    }

    /// Blob fee cap, `None` unless this is a blob transaction.
    pub const fn max_fee_per_blob_gas(&self) -> Option<U256> {
        match self {
            Self::Eip4844(tx) => Some(tx.max_fee_per_blob_gas),
            _ => None,
        }
    }

    /// Authorization list, `None` unless this is a set-code transaction.
    pub fn authorization_list(&self) -> Option<&[SignedAuthorization]> {
        match self {
            Self::Eip7702(tx) => Some(&tx.authorization_list),
            _ => None,
        }
    }

    /// Returns true if the transaction carries blob hashes.
    pub fn has_blobs(&self) -> bool {
        self.blob_versioned_hashes().is_some_and(|hashes| !hashes.is_empty())
    }

    /// Upper bound of the wei the sender must hold: `value + gas_limit * fee_cap` plus the blob
    /// gas cost. Saturates at `U256::MAX`.
    pub fn cost(&self) -> U256 {
        let mut cost = self
            .value()
            .saturating_add(U256::from(self.gas_limit()).saturating_mul(self.max_fee_per_gas()));
        if let Self::Eip4844(tx) = self {
            let blob_gas = U256::from(DATA_GAS_PER_BLOB)
                .saturating_mul(U256::from(tx.blob_versioned_hashes.len()));
            cost = cost.saturating_add(blob_gas.saturating_mul(tx.max_fee_per_blob_gas));
        }
        cost
    }

    /// Length of the RLP list payload of the unsigned fields.
    fn fields_len(&self) -> usize {
        match self {
            Self::Legacy(tx) => tx.fields_len(),
            Self::Eip2930(tx) => tx.fields_len(),
            Self::Eip1559(tx) => tx.fields_len(),
            Self::Eip4844(tx) => tx.fields_len(),
            Self::Eip7702(tx) => tx.fields_len(),
        }
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        match self {
            Self::Legacy(tx) => tx.encode_fields(out),
            Self::Eip2930(tx) => tx.encode_fields(out),
            Self::Eip1559(tx) => tx.encode_fields(out),
            Self::Eip4844(tx) => tx.encode_fields(out),
            Self::Eip7702(tx) => tx.encode_fields(out),
        }
    }

    /// Hash the sender signs.
    ///
    /// Legacy transactions use the (EIP-155 extended) RLP list, typed transactions
    /// `keccak256(type || rlp(fields))`.
    pub fn signature_hash(&self) -> B256 {
        if let Self::Legacy(tx) = self {
            return tx.signature_hash()
        }
        let payload_length = self.fields_len();
        let mut out = Vec::with_capacity(1 + payload_length + 4);
        out.push(self.tx_type().into());
        Header { list: true, payload_length }.encode(&mut out);
        self.encode_fields(&mut out);
        keccak256(out)
    }
}

impl From<TxLegacy> for Transaction {
    fn from(tx: TxLegacy) -> Self {
        Self::Legacy(tx)
    }
}

impl From<TxEip2930> for Transaction {
    fn from(tx: TxEip2930) -> Self {
        Self::Eip2930(tx)
    }
}

impl From<TxEip1559> for Transaction {
    fn from(tx: TxEip1559) -> Self {
        Self::Eip1559(tx)
    }
}

impl From<TxEip4844> for Transaction {
    fn from(tx: TxEip4844) -> Self {
        Self::Eip4844(tx)
    }
}

impl From<TxEip7702> for Transaction {
    fn from(tx: TxEip7702) -> Self {
        Self::Eip7702(tx)
    }
}

/// A signed transaction together with its hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionSigned {
    /// Hash of the encoded envelope.
    hash: TxHash,
    /// Raw signature values.
    signature: Signature,
    /// The unsigned transaction.
    transaction: Transaction,
}

impl TransactionSigned {
    /// Creates a signed transaction and computes its hash.
    pub fn new(transaction: Transaction, signature: Signature) -> Self {
        let mut tx = Self { hash: B256::ZERO, signature, transaction };
        tx.hash = keccak256(tx.encoded_2718());
        tx
    }

    /// Creates an internal transaction: a legacy transaction carrying the marker signature for
    /// `sender`. Internal transactions are never signed.
    pub fn new_internal(sender: Address, tx: TxLegacy) -> Self {
        Self::new(Transaction::Legacy(tx), Signature::internal(sender))
    }

    /// Hash of the transaction.
    pub const fn hash(&self) -> TxHash {
        self.hash
    }

    /// Signature values.
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The unsigned transaction.
    pub const fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Consumes the type and returns the unsigned transaction and its signature.
    pub fn into_parts(self) -> (Transaction, Signature) {
        (self.transaction, self.signature)
    }

    /// Returns true if this is an internal transaction created by the node.
    pub fn is_internal(&self) -> bool {
        self.signature.is_internal()
    }

    /// Size of the encoded envelope in bytes.
    pub fn size(&self) -> usize {
        self.encode_2718_len()
    }

    /// Length of the EIP-2718 envelope.
    pub fn encode_2718_len(&self) -> usize {
        let payload_length = self.payload_len();
        let list_len = Header { list: true, payload_length }.length() + payload_length;
        match self.transaction {
            Transaction::Legacy(_) => list_len,
            _ => 1 + list_len,
        }
    }

    fn payload_len(&self) -> usize {
        self.transaction.fields_len() + self.signature.fields_len()
    }

    /// Encodes the EIP-2718 envelope: the bare RLP list for legacy transactions, the type byte
    /// followed by the RLP list otherwise.
    pub fn encode_2718(&self, out: &mut dyn BufMut) {
        let tx_type = self.transaction.tx_type();
        if tx_type != TxType::Legacy {
            out.put_u8(tx_type.into());
        }
        Header { list: true, payload_length: self.payload_len() }.encode(out);
        self.transaction.encode_fields(out);
        self.signature.encode_fields(out);
    }

    /// Returns the encoded EIP-2718 envelope.
    pub fn encoded_2718(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encode_2718_len());
        self.encode_2718(&mut out);
        out
    }

    /// Decodes an EIP-2718 envelope.
    pub fn decode_2718(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        if first >= alloy_rlp::EMPTY_LIST_CODE {
            return decode_signed(buf, |buf| {
                TxLegacy::decode_fields(buf).map(Transaction::Legacy)
            })
            .map(|(mut transaction, signature)| {
                if let Transaction::Legacy(tx) = &mut transaction {
                    tx.chain_id = signature.legacy_chain_id();
                }
                Self::new(transaction, signature)
            })
        }

        let tx_type = TxType::try_from(first)?;
        *buf = &buf[1..];
        let (transaction, signature) = match tx_type {
            TxType::Legacy => return Err(alloy_rlp::Error::Custom("unexpected legacy type byte")),
            TxType::Eip2930 => {
                decode_signed(buf, |buf| TxEip2930::decode_fields(buf).map(Transaction::Eip2930))?
            }
            TxType::Eip1559 => {
                decode_signed(buf, |buf| TxEip1559::decode_fields(buf).map(Transaction::Eip1559))?
            }
            TxType::Eip4844 => {
                decode_signed(buf, |buf| TxEip4844::decode_fields(buf).map(Transaction::Eip4844))?
            }
            TxType::Eip7702 => {
                decode_signed(buf, |buf| TxEip7702::decode_fields(buf).map(Transaction::Eip7702))?
            }
        };
        Ok(Self::new(transaction, signature))
    }
}

impl std::ops::Deref for TransactionSigned {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

/// Decodes an RLP list holding the unsigned fields followed by `v, r, s`.
fn decode_signed(
    buf: &mut &[u8],
    decode_fields: impl FnOnce(&mut &[u8]) -> alloy_rlp::Result<Transaction>,
) -> alloy_rlp::Result<(Transaction, Signature)> {
    let header = Header::decode(buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString)
    }
    let remaining = buf.len();
    let transaction = decode_fields(buf)?;
    let signature = Signature::decode_fields(buf)?;
    let consumed = remaining - buf.len();
    if consumed != header.payload_length {
        return Err(alloy_rlp::Error::ListLengthMismatch {
            expected: header.payload_length,
            got: consumed,
        })
    }
    Ok((transaction, signature))
}
