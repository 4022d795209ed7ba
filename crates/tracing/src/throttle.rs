//! Rate limiting for repetitive log lines.
//!
//! The ledger core can hit the same warning for every transaction of a block (for example an
//! absent subsidies registry). [`throttle!`](crate::throttle!) keeps such lines to one per period.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        LazyLock,
    },
    time::Instant,
};

/// Marker stored in the call site's slot before its first run.
#[doc(hidden)]
pub const NOT_YET_RUN: u64 = u64::MAX;

/// Returns true if the call site owning `last` may run again, and claims the run.
#[doc(hidden)]
pub fn should_run(epoch: &LazyLock<Instant>, last: &AtomicU64, period_millis: u64) -> bool {
    let now = epoch.elapsed().as_millis() as u64;
    let previous = last.load(Ordering::Relaxed);
    let due = previous == NOT_YET_RUN || now.saturating_sub(previous) >= period_millis;
    due && last.compare_exchange(previous, now, Ordering::Relaxed, Ordering::Relaxed).is_ok()
}

/// Evaluates the expression at most once per `period` for this call site.
///
/// ```
/// use std::time::Duration;
///
/// sonic_tracing::throttle!(Duration::from_secs(5), || {
///     sonic_tracing::tracing::warn!(target: "subsidies", "registry not deployed");
/// });
/// ```
#[macro_export]
macro_rules! throttle {
    ($period:expr, || $expr:expr) => {{
        static EPOCH: ::std::sync::LazyLock<::std::time::Instant> =
            ::std::sync::LazyLock::new(::std::time::Instant::now);
        static LAST: ::core::sync::atomic::AtomicU64 =
            ::core::sync::atomic::AtomicU64::new($crate::__private::NOT_YET_RUN);

        if $crate::__private::should_run(&EPOCH, &LAST, $period.as_millis() as u64) {
            $expr
        }
    }};
}
