//! System contract calls executed before the transactions of a block.

mod eip2935;

pub use eip2935::{
    process_parent_block_hash, HISTORY_SERVE_WINDOW, HISTORY_STORAGE_ADDRESS, SYSTEM_ADDRESS,
    SYSTEM_CALL_GAS,
};
