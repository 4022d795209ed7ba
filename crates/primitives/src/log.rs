use alloy_primitives::{BlockHash, BlockNumber, Log, TxHash, B256};
use alloy_rlp::{BufMut, Decodable, Encodable, Header};

/// A log together with its position in the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IndexedLog {
    /// The emitted log.
    pub inner: Log,
    /// Block containing the emitting transaction.
    pub block_number: BlockNumber,
    /// Hash of that block, zero until the block is sealed.
    pub block_hash: BlockHash,
    /// Hash of the emitting transaction.
    pub transaction_hash: TxHash,
    /// Position of the emitting transaction in the block.
    pub transaction_index: u32,
    /// Position of the log in the block.
    pub log_index: u32,
}

/// Length of the RLP encoding of `log`: `[address, topics, data]`.
pub(crate) fn log_rlp_length(log: &Log) -> usize {
    let payload_length = log_payload_length(log);
    Header { list: true, payload_length }.length() + payload_length
}

fn topics_payload_length(log: &Log) -> usize {
    log.data.topics().iter().map(Encodable::length).sum()
}

fn log_payload_length(log: &Log) -> usize {
    let topics_length = topics_payload_length(log);
    log.address.length() +
        Header { list: true, payload_length: topics_length }.length() +
        topics_length +
        log.data.data.length()
}

/// Encodes `log` as `[address, topics, data]`.
pub(crate) fn encode_log(log: &Log, out: &mut dyn BufMut) {
    Header { list: true, payload_length: log_payload_length(log) }.encode(out);
    log.address.encode(out);
    Header { list: true, payload_length: topics_payload_length(log) }.encode(out);
    for topic in log.data.topics() {
        topic.encode(out);
    }
    log.data.data.encode(out);
}

/// Decodes a log encoded by [`encode_log`].
pub(crate) fn decode_log(buf: &mut &[u8]) -> alloy_rlp::Result<Log> {
    let header = Header::decode(buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString)
    }
    let address = Decodable::decode(buf)?;
    let topics: Vec<B256> = Decodable::decode(buf)?;
    let data = Decodable::decode(buf)?;
    Ok(Log::new_unchecked(address, topics, data))
}
