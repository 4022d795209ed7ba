//! [EIP-2935](https://eips.ethereum.org/EIPS/eip-2935) system call.

use crate::{interpreter::CallInputs, Evm, TxContext};
use alloy_primitives::{address, Address, B256, U256};
use tracing::warn;

/// Caller of system contracts.
pub const SYSTEM_ADDRESS: Address = address!("fffffffffffffffffffffffffffffffffffffffe");

/// The history storage contract.
pub const HISTORY_STORAGE_ADDRESS: Address = address!("0000F90827F1C53a10cb7A02335B175320002935");

/// Number of block hashes kept by the history storage contract.
pub const HISTORY_SERVE_WINDOW: u64 = 8191;

/// Gas limit of system calls.
pub const SYSTEM_CALL_GAS: u64 = 30_000_000;

/// Stores `parent_hash` in the history storage contract.
///
/// Does nothing before the EIP-2935 rules. A failing call is logged and does not abort the
/// block, its state effects are finalised either way.
pub fn process_parent_block_hash(evm: &mut Evm<'_>, parent_hash: B256) {
    if !evm.evm_rules().is_eip2935() {
        return
    }

    evm.set_tx_context(TxContext { origin: SYSTEM_ADDRESS, ..Default::default() });
    evm.state_mut().add_address_to_access_list(HISTORY_STORAGE_ADDRESS);
    let result = evm.call(CallInputs::call(
        SYSTEM_ADDRESS,
        HISTORY_STORAGE_ADDRESS,
        parent_hash.0.into(),
        SYSTEM_CALL_GAS,
        U256::ZERO,
    ));
    if let Some(err) = result.error {
        warn!(target: "evm", %err, %parent_hash, "History storage system call failed");
    }
    evm.state_mut().finalise(true);
}
