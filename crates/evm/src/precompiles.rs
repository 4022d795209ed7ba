//! Addresses of the precompiled contracts.
//!
//! Precompiles run inside the interpreter. The frames only need to know which addresses exist
//! without code.

use alloy_primitives::Address;
use sonic_chainspec::EvmRules;

/// `ecrecover` through `blake2f`, active since Istanbul.
const ISTANBUL: u8 = 0x09;
/// The KZG point evaluation precompile.
const CANCUN: u8 = 0x0a;
/// BLS12-381 operations of EIP-2537.
const PRAGUE: u8 = 0x11;

fn last(rules: &EvmRules) -> u8 {
    if rules.is_prague {
        PRAGUE
    } else if rules.is_cancun {
        CANCUN
    } else {
        ISTANBUL
    }
}

/// Precompiles active under `rules`.
pub fn addresses(rules: &EvmRules) -> Vec<Address> {
    (1..=last(rules)).map(Address::with_last_byte).collect()
}

/// Returns true if `address` is an active precompile.
pub fn is_precompile(address: Address, rules: &EvmRules) -> bool {
    let [prefix @ .., byte] = address.0 .0;
    prefix.iter().all(|b| *b == 0) && (1..=last(rules)).contains(&byte)
}
