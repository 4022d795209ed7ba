//! Seeded ordering of a transaction set.
//!
//! [`scramble`] groups transactions by sender, sorts every group by nonce, permutes the senders
//! with a seeded Fisher–Yates shuffle and concatenates the groups. The result depends only on
//! the set of transactions and the seed, never on the order the set was handed in.
//!
//! Within a sender, entries are ordered by ascending nonce, then descending gas price, then
//! ascending hash.

use alloy_primitives::{Address, TxHash, U256};
use sonic_primitives::{ChainSigner, TransactionSigned};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};
use tracing::trace;

/// A transaction as seen by the scrambler.
pub trait ScramblerEntry {
    /// Hash of the transaction.
    fn hash(&self) -> TxHash;

    /// Sender of the transaction.
    fn sender(&self) -> Address;

    /// Nonce of the transaction.
    fn nonce(&self) -> u64;

    /// Gas price of the transaction.
    fn gas_price(&self) -> U256;
}

/// A signed transaction with its recovered sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEntry {
    /// The transaction.
    pub transaction: TransactionSigned,
    /// Its sender.
    pub sender: Address,
}

impl ScramblerEntry for SignedEntry {
    fn hash(&self) -> TxHash {
        self.transaction.hash()
    }

    fn sender(&self) -> Address {
        self.sender
    }

    fn nonce(&self) -> u64 {
        self.transaction.nonce()
    }

    fn gas_price(&self) -> U256 {
        self.transaction.gas_price()
    }
}

/// Pairs every transaction with its sender. Transactions whose sender can't be recovered are
/// dropped.
pub fn recover_entries(
    transactions: impl IntoIterator<Item = TransactionSigned>,
    signer: &ChainSigner,
) -> Vec<SignedEntry> {
    transactions
        .into_iter()
        .filter_map(|transaction| match signer.sender_cached(&transaction) {
            Ok(sender) => Some(SignedEntry { transaction, sender }),
            Err(err) => {
                trace!(
                    target: "scheduler",
                    hash = ?transaction.hash(),
                    %err,
                    "Dropped transaction with unrecoverable sender"
                );
                None
            }
        })
        .collect()
}

/// Scrambles signed transactions, see [`scramble`].
pub fn scramble_transactions(
    transactions: impl IntoIterator<Item = TransactionSigned>,
    seed: u64,
    signer: &ChainSigner,
) -> Vec<TransactionSigned> {
    scramble(recover_entries(transactions, signer), seed)
        .into_iter()
        .map(|entry| entry.transaction)
        .collect()
}

/// Orders `entries` by sender groups in the permutation derived from `seed`.
pub fn scramble<E: ScramblerEntry>(entries: Vec<E>, seed: u64) -> Vec<E> {
    let len = entries.len();
    let mut groups = BTreeMap::<Address, Vec<E>>::new();
    for entry in entries {
        groups.entry(entry.sender()).or_default().push(entry);
    }

    // keys of the map are sorted ascending
    let mut senders = groups.keys().copied().collect::<Vec<_>>();
    shuffle(&mut senders, seed);

    let mut scrambled = Vec::with_capacity(len);
    for sender in senders {
        if let Some(mut group) = groups.remove(&sender) {
            group.sort_by(sender_order);
            scrambled.extend(group);
        }
    }
    scrambled
}

/// Returns true if `entries` is in the order [`scramble`] produces for `seed`.
///
/// Checks in one pass that the sender groups are contiguous, appear in the permuted sender
/// order and are sorted internally.
pub fn is_scrambled<E: ScramblerEntry>(entries: &[E], seed: u64) -> bool {
    let mut senders = entries
        .iter()
        .map(|entry| entry.sender())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    shuffle(&mut senders, seed);

    let mut next_group = 0;
    let mut previous: Option<&E> = None;
    for entry in entries {
        match previous {
            Some(previous) if previous.sender() == entry.sender() => {
                if sender_order(previous, entry) != Ordering::Less {
                    return false
                }
            }
            _ => {
                if senders.get(next_group) != Some(&entry.sender()) {
                    return false
                }
                next_group += 1;
            }
        }
        previous = Some(entry);
    }
    next_group == senders.len()
}

fn sender_order<E: ScramblerEntry>(a: &E, b: &E) -> Ordering {
    a.nonce()
        .cmp(&b.nonce())
        .then_with(|| b.gas_price().cmp(&a.gas_price()))
        .then_with(|| a.hash().cmp(&b.hash()))
}

/// Fisher–Yates shuffle driven by a [`XorShiftStar`] seeded with `seed`.
fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = XorShiftStar::new(seed);
    for i in (1..items.len()).rev() {
        let j = rng.next_below(i as u64 + 1) as usize;
        items.swap(i, j);
    }
}

/// The xorshift* pseudo random generator.
///
/// A zero state is replaced by one on first use.
#[derive(Debug, Clone)]
pub struct XorShiftStar {
    state: u64,
}

impl XorShiftStar {
    const MULTIPLIER: u64 = 0x2545F4914F6CDD1D;

    /// Creates a generator with initial state `seed`.
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Returns the next value.
    pub fn next_u64(&mut self) -> u64 {
        if self.state == 0 {
            self.state = 1;
        }
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(Self::MULTIPLIER)
    }

    /// Returns a uniform value in `[0, n)`, `0` if `n` is zero.
    ///
    /// Draws are rejected above the largest multiple of `n` not exceeding 2^64.
    pub fn next_below(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 0
        }
        // 2^64 mod n
        let excess = (u64::MAX % n + 1) % n;
        if excess == 0 {
            return self.next_u64() % n
        }
        let limit = 0u64.wrapping_sub(excess);
        loop {
            let value = self.next_u64();
            if value < limit {
                return value % n
            }
        }
    }
}
