//! Minimum gas prices derived from the current base fee.
//!
//! Each limit adds a fixed percentage on top of the base fee, rounding down. A missing base fee
//! counts as zero.

use alloy_primitives::U256;

/// Margin of the price suggested for new transactions.
pub const SUGGESTED_PRICE_PERCENTAGE: u64 = 10;

/// Margin of the minimum fee cap accepted into the pool.
pub const POOL_MIN_PRICE_PERCENTAGE: u64 = 5;

/// Margin of the minimum fee cap of emitted (validator created) transactions.
pub const EMITTER_MIN_PRICE_PERCENTAGE: u64 = 2;

/// Price suggested for new transactions, base fee plus 10%.
pub fn suggested_gas_price(base_fee: Option<U256>) -> U256 {
    add_percentage(base_fee.unwrap_or_default(), SUGGESTED_PRICE_PERCENTAGE)
}

/// Minimum fee cap accepted into the pool, base fee plus 5%.
pub fn pool_min_fee_cap(base_fee: Option<U256>) -> U256 {
    add_percentage(base_fee.unwrap_or_default(), POOL_MIN_PRICE_PERCENTAGE)
}

/// Minimum fee cap of emitted transactions, base fee plus 2%.
pub fn emitter_min_fee_cap(base_fee: Option<U256>) -> U256 {
    add_percentage(base_fee.unwrap_or_default(), EMITTER_MIN_PRICE_PERCENTAGE)
}

/// Computes `⌊b · (100 + p) / 100⌋` without intermediate overflow, saturating at `U256::MAX`.
pub fn add_percentage(base: U256, percentage: u64) -> U256 {
    let hundred = U256::from(100);
    let percentage = U256::from(percentage);
    // b·p/100 = (b/100)·p + (b%100)·p/100 exactly, and neither term overflows for p ≤ 100
    let (quotient, remainder) = base.div_rem(hundred);
    let surcharge =
        quotient.saturating_mul(percentage).saturating_add(remainder * percentage / hundred);
    base.saturating_add(surcharge)
}
