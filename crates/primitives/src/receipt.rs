use crate::{
    log::{decode_log, encode_log, log_rlp_length},
    IndexedLog, TxType,
};
use alloy_primitives::{Address, BlockHash, BlockNumber, Bloom, Log, TxHash};
use alloy_rlp::{BufMut, Decodable, Encodable, Header};

/// Outcome of a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReceiptStatus {
    /// Execution reverted or failed.
    #[default]
    Failed,
    /// Execution succeeded.
    Success,
}

impl ReceiptStatus {
    /// Returns true for [`ReceiptStatus::Success`].
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<bool> for ReceiptStatus {
    fn from(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failed
        }
    }
}

/// Full receipt of an executed transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Type of the transaction.
    pub tx_type: TxType,
    /// Outcome.
    pub status: ReceiptStatus,
    /// Gas used by this and all preceding transactions of the block.
    pub cumulative_gas_used: u64,
    /// Gas used by this transaction.
    pub gas_used: u64,
    /// Hash of the transaction.
    pub tx_hash: TxHash,
    /// Address of the created contract, if the transaction was a successful creation.
    pub contract_address: Option<Address>,
    /// Logs emitted by the transaction.
    pub logs: Vec<IndexedLog>,
    /// Bloom filter of the logs.
    pub logs_bloom: Bloom,
    /// Block containing the transaction.
    pub block_number: BlockNumber,
    /// Hash of that block, zero until sealed.
    pub block_hash: BlockHash,
    /// Position of the transaction in the block.
    pub transaction_index: u32,
}

impl Receipt {
    /// Computes the bloom filter of `logs`.
    pub fn bloom<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Bloom {
        let mut bloom = Bloom::ZERO;
        for log in logs {
            bloom.accrue_log(log);
        }
        bloom
    }

    /// Returns the consensus part of the receipt, the part hashed into the receipts root.
    pub fn to_consensus(&self) -> ConsensusReceipt {
        ConsensusReceipt {
            tx_type: self.tx_type,
            success: self.status.is_success(),
            cumulative_gas_used: self.cumulative_gas_used,
            logs_bloom: self.logs_bloom,
            logs: self.logs.iter().map(|log| log.inner.clone()).collect(),
        }
    }
}

/// The consensus encoded fields of a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsensusReceipt {
    /// Type of the transaction, selects the envelope.
    pub tx_type: TxType,
    /// Outcome.
    pub success: bool,
    /// Cumulative gas used in the block.
    pub cumulative_gas_used: u64,
    /// Bloom filter of the logs.
    pub logs_bloom: Bloom,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,
}

impl ConsensusReceipt {
    fn payload_len(&self) -> usize {
        let logs_payload: usize = self.logs.iter().map(log_rlp_length).sum();
        self.success.length() +
            self.cumulative_gas_used.length() +
            self.logs_bloom.length() +
            Header { list: true, payload_length: logs_payload }.length() +
            logs_payload
    }

    /// Length of the EIP-2718 envelope.
    pub fn encode_2718_len(&self) -> usize {
        let payload_length = self.payload_len();
        let len = Header { list: true, payload_length }.length() + payload_length;
        if self.tx_type == TxType::Legacy {
            len
        } else {
            len + 1
        }
    }

    /// Encodes `[status, cumulative_gas, bloom, logs]`, prefixed with the type byte for typed
    /// transactions.
    pub fn encode_2718(&self, out: &mut dyn BufMut) {
        if self.tx_type != TxType::Legacy {
            out.put_u8(self.tx_type.into());
        }
        Header { list: true, payload_length: self.payload_len() }.encode(out);
        self.success.encode(out);
        self.cumulative_gas_used.encode(out);
        self.logs_bloom.encode(out);
        let logs_payload = self.logs.iter().map(log_rlp_length).sum();
        Header { list: true, payload_length: logs_payload }.encode(out);
        for log in &self.logs {
            encode_log(log, out);
        }
    }

    /// Decodes a receipt encoded by [`ConsensusReceipt::encode_2718`].
    pub fn decode_2718(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        let tx_type = if first >= alloy_rlp::EMPTY_LIST_CODE {
            TxType::Legacy
        } else {
            *buf = &buf[1..];
            TxType::try_from(first)?
        };

        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString)
        }
        let remaining = buf.len();
        let success = Decodable::decode(buf)?;
        let cumulative_gas_used = Decodable::decode(buf)?;
        let logs_bloom = Decodable::decode(buf)?;

        let logs_header = Header::decode(buf)?;
        if !logs_header.list {
            return Err(alloy_rlp::Error::UnexpectedString)
        }
        let logs_end = buf.len().checked_sub(logs_header.payload_length).ok_or(
            alloy_rlp::Error::InputTooShort,
        )?;
        let mut logs = Vec::new();
        while buf.len() > logs_end {
            logs.push(decode_log(buf)?);
        }

        let consumed = remaining - buf.len();
        if consumed != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: consumed,
            })
        }
        Ok(Self { tx_type, success, cumulative_gas_used, logs_bloom, logs })
    }

    /// Returns the encoded EIP-2718 envelope.
    pub fn encoded_2718(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encode_2718_len());
        self.encode_2718(&mut out);
        out
    }
}
