use crate::scrambler::{recover_entries, scramble, SignedEntry};
use alloy_primitives::Address;
use sonic_primitives::{ChainSigner, TransactionSigned};
use std::collections::{HashSet, VecDeque};

/// A prioritized stream of transactions considered for a block.
///
/// The scheduler looks at the [`current`](Candidates::current) candidate, trial-executes it and
/// then either [`accept`](Candidates::accept)s or [`skip`](Candidates::skip)s it, which moves
/// the stream forward. Skipping lets the stream drop candidates depending on the skipped one.
pub trait Candidates {
    /// The candidate under consideration, `None` once the stream is exhausted.
    fn current(&self) -> Option<&TransactionSigned>;

    /// The current candidate was included. Moves to the next one.
    fn accept(&mut self);

    /// The current candidate was not included. Moves to the next one, dropping the candidates
    /// that depend on it.
    fn skip(&mut self);
}

/// Candidates in a fixed order without dependencies between them.
#[derive(Debug, Clone, Default)]
pub struct OrderedCandidates {
    transactions: VecDeque<TransactionSigned>,
}

impl OrderedCandidates {
    /// Creates a stream yielding `transactions` in order.
    pub fn new(transactions: impl IntoIterator<Item = TransactionSigned>) -> Self {
        Self { transactions: transactions.into_iter().collect() }
    }
}

impl Candidates for OrderedCandidates {
    fn current(&self) -> Option<&TransactionSigned> {
        self.transactions.front()
    }

    fn accept(&mut self) {
        self.transactions.pop_front();
    }

    fn skip(&mut self) {
        self.transactions.pop_front();
    }
}

/// Candidates in a fixed order, where a transaction depends on all earlier transactions of its
/// sender.
///
/// Skipping a transaction drops every later transaction of the same sender: with a nonce gap
/// none of them could execute.
#[derive(Debug, Clone, Default)]
pub struct SenderOrderedCandidates {
    entries: VecDeque<SignedEntry>,
    skipped_senders: HashSet<Address>,
}

impl SenderOrderedCandidates {
    /// Creates a stream yielding `entries` in order.
    pub fn new(entries: impl IntoIterator<Item = SignedEntry>) -> Self {
        Self { entries: entries.into_iter().collect(), skipped_senders: HashSet::new() }
    }

    /// Creates a stream yielding `transactions` in order. Transactions whose sender can't be
    /// recovered are dropped.
    pub fn from_transactions(
        transactions: impl IntoIterator<Item = TransactionSigned>,
        signer: &ChainSigner,
    ) -> Self {
        Self::new(recover_entries(transactions, signer))
    }

    /// Creates a stream yielding `transactions` in their scrambled order for `seed`.
    pub fn scrambled(
        transactions: impl IntoIterator<Item = TransactionSigned>,
        seed: u64,
        signer: &ChainSigner,
    ) -> Self {
        Self::new(scramble(recover_entries(transactions, signer), seed))
    }

    /// Sender of the current candidate.
    pub fn current_sender(&self) -> Option<Address> {
        self.entries.front().map(|entry| entry.sender)
    }

    /// Number of candidates left, including those that will be dropped.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no candidates are left.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn advance(&mut self) {
        self.entries.pop_front();
        while let Some(entry) = self.entries.front() {
            if !self.skipped_senders.contains(&entry.sender) {
                break
            }
            self.entries.pop_front();
        }
    }
}

impl Candidates for SenderOrderedCandidates {
    fn current(&self) -> Option<&TransactionSigned> {
        self.entries.front().map(|entry| &entry.transaction)
    }

    fn accept(&mut self) {
        self.advance();
    }

    fn skip(&mut self) {
        if let Some(sender) = self.current_sender() {
            self.skipped_senders.insert(sender);
        }
        self.advance();
    }
}
