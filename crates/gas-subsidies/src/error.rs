use sonic_evm::VmError;

/// Errors of the subsidies registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SubsidyError {
    /// The registry returned nothing, it is not deployed.
    #[error("gas subsidies registry is not deployed")]
    RegistryAbsent,
    /// The registry call failed.
    #[error("gas subsidies registry call failed: {0}")]
    CallFailed(VmError),
    /// The registry returned data that does not decode.
    #[error("failed to parse gas subsidies registry result of {len} bytes")]
    ParseError {
        /// Length of the returned data.
        len: usize,
    },
    /// The fee of a sponsored transaction does not fit into 256 bits.
    #[error("sponsored transaction fee overflow")]
    FeeOverflow,
}
