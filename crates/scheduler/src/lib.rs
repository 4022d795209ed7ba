//! Ordering of transactions for block proposals.
//!
//! The [`scrambler`] turns an unordered transaction set and a seed into a deterministic order
//! that keeps every sender's nonces ascending while randomizing the interleaving of senders.
//!
//! The [`Scheduler`] trial-executes a prioritized stream of [`Candidates`] on a throwaway
//! snapshot of the latest state and returns the prefix that fits into the block gas limit.
//! Scheduling is cooperative: it polls a [`CancelToken`] between trials and returns what it has
//! found so far once cancelled.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod cancel;
mod candidates;
mod scheduler;
pub mod scrambler;
mod trial;

pub use cancel::CancelToken;
pub use candidates::{Candidates, OrderedCandidates, SenderOrderedCandidates};
pub use scheduler::{
    schedule_candidates, ScheduledTransaction, Scheduler, SchedulerConfig, DEFAULT_MIN_TX_GAS,
};
pub use trial::{EvmTrialProcessor, TrialOutcome, TrialProcessor};
