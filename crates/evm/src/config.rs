/// Switches of the EVM that are not network rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmConfig {
    /// Lets messages with zero fee caps run below the base fee, and pays no tip for them.
    pub no_base_fee: bool,
}
