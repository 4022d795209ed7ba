//! Ordered trie roots of a block's transactions and receipts.

use crate::{Receipt, TransactionSigned};
use alloy_primitives::B256;
use alloy_trie::{HashBuilder, Nibbles};

/// Computes the root of a trie keyed by `rlp(index)` over the encoded items.
pub fn ordered_trie_root_with_encoder<T, F>(items: &[T], mut encode: F) -> B256
where
    F: FnMut(&T, &mut Vec<u8>),
{
    let mut leaves: Vec<(Vec<u8>, Vec<u8>)> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut value = Vec::new();
            encode(item, &mut value);
            (alloy_rlp::encode(index), value)
        })
        .collect();
    // the hash builder expects leaves in key order, which differs from index order past 0x7f
    leaves.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let mut hb = HashBuilder::default();
    for (key, value) in leaves {
        hb.add_leaf(Nibbles::unpack(&key), &value);
    }
    hb.root()
}

/// Root of the transaction trie over the EIP-2718 envelopes.
pub fn calculate_transaction_root(transactions: &[TransactionSigned]) -> B256 {
    ordered_trie_root_with_encoder(transactions, |tx, buf| tx.encode_2718(buf))
}

/// Root of the receipt trie over the consensus EIP-2718 encodings.
pub fn calculate_receipt_root(receipts: &[Receipt]) -> B256 {
    ordered_trie_root_with_encoder(receipts, |receipt, buf| {
        receipt.to_consensus().encode_2718(buf)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EMPTY_ROOT_HASH;
    use alloy_primitives::{hex, keccak256};

    #[test]
    fn empty_root() {
        assert_eq!(calculate_transaction_root(&[]), EMPTY_ROOT_HASH);
        assert_eq!(calculate_receipt_root(&[]), EMPTY_ROOT_HASH);
    }

    #[test]
    fn single_leaf() {
        // leaf node rlp([hex_prefix(0x80, leaf), 0x01])
        let root = ordered_trie_root_with_encoder(&[1u8], |item, buf| buf.push(*item));
        assert_eq!(root, keccak256(hex!("c482208001")));
    }

    #[test]
    fn order_matters_beyond_single_byte_keys() {
        let items: Vec<u8> = (0..=200u8).collect();
        let mut reversed = items.clone();
        reversed.reverse();
        let root = ordered_trie_root_with_encoder(&items, |item, buf| buf.push(*item));
        let reversed_root = ordered_trie_root_with_encoder(&reversed, |item, buf| buf.push(*item));
        assert_ne!(root, reversed_root);
    }
}
