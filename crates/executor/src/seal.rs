use crate::ProcessedBlock;
use alloy_primitives::{Bloom, B256};
use sonic_evm::EvmHeader;
use sonic_primitives::{
    proofs::{calculate_receipt_root, calculate_transaction_root},
    BlockExtra, Header, Receipt, SealedBlock,
};

/// Assembles the block of `processed` on top of the state root reached by processing it.
///
/// Skipped transactions are not part of the block. The returned receipts are those of the
/// block's transactions, stamped with the block hash and with the position of their transaction
/// in the block.
pub fn seal_block(
    header: &EvmHeader,
    processed: ProcessedBlock,
    state_root: B256,
) -> (SealedBlock, Vec<Receipt>) {
    let (transactions, mut receipts): (Vec<_>, Vec<_>) = processed
        .transactions
        .into_iter()
        .zip(processed.receipts)
        .filter_map(|(tx, receipt)| Some((tx, receipt?)))
        .unzip();

    let mut logs_bloom = Bloom::ZERO;
    for receipt in &receipts {
        logs_bloom.accrue_bloom(&receipt.logs_bloom);
    }

    let extra = BlockExtra { subsec_nanos: header.time.subsec_nanos(), duration: header.duration };
    let sealed = Header {
        parent_hash: header.parent_hash,
        beneficiary: header.coinbase,
        state_root,
        transactions_root: calculate_transaction_root(&transactions),
        receipts_root: calculate_receipt_root(&receipts),
        logs_bloom,
        difficulty: Header::difficulty_for(header.prev_randao),
        number: header.number,
        gas_limit: header.gas_limit,
        gas_used: receipts.iter().map(|receipt| receipt.gas_used).sum(),
        timestamp: header.time.secs(),
        extra_data: extra.encode(),
        mix_hash: header.prev_randao,
        base_fee_per_gas: header.base_fee,
        ..Default::default()
    };
    let block = SealedBlock::new(sealed, transactions);

    for (index, receipt) in receipts.iter_mut().enumerate() {
        let index = index as u32;
        receipt.block_hash = block.hash;
        receipt.transaction_index = index;
        for log in &mut receipt.logs {
            log.block_hash = block.hash;
            log.transaction_index = index;
        }
    }
    (block, receipts)
}
