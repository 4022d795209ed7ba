//! Commonly used types of the sonic ledger core.
//!
//! This crate contains the transaction envelope and its signature schemes, receipts, block
//! headers and the codecs, hashes and trie roots derived from them.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod constants;
mod error;
pub mod gas_price;
mod genesis;
mod header;
mod log;
pub mod proofs;
mod receipt;
mod transaction;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::GotExpected;
pub use genesis::{Genesis, GenesisAccount};
pub use header::{BlockExtra, ExtraDataError, Header, SealedBlock, Timestamp};
pub use log::IndexedLog;
pub use receipt::{ConsensusReceipt, Receipt, ReceiptStatus};
pub use transaction::{
    public_key_to_address, recover_signer, AccessList, AccessListItem, ChainSigner, SenderCache,
    Signature, SignatureError, SignedAuthorization, SignerVariant, Transaction, TransactionSigned,
    TxEip1559, TxEip2930, TxEip4844, TxEip7702, TxLegacy, TxType, DEFAULT_SENDER_CACHE_CAPACITY,
};

pub use alloy_primitives::{
    self, address, b256, bytes, keccak256, Address, BlockHash, BlockNumber, Bloom, Bytes, Log,
    LogData, TxHash, TxKind, B256, B64, U256,
};
