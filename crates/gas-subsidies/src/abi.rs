//! ABI of the subsidies registry.

use alloy_sol_types::sol;

sol! {
    /// Gas limits of the registry calls and the gas charged on top of a sponsored transaction.
    function getGasConfig() external view returns (uint256 chooseFundGasLimit, uint256 deductFeesGasLimit, uint256 overheadCharge);

    /// Selects the fund paying `fee` for a transaction, zero if none does.
    function chooseFund(address from, address to, uint256 value, uint256 nonce, bytes data, uint256 fee) external view returns (bytes32 fundId);

    /// Deducts `fee` from a fund. Only callable by the zero address.
    function deductFees(bytes32 fundId, uint256 fee) external;
}
