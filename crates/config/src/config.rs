use crate::ConfigError;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use sonic_gas_subsidies::{
    SubsidyCheckCache, SubsidyChecker, DEFAULT_CACHE_BYTES, DEFAULT_MAX_VALIDITY,
    DEFAULT_MIN_VALIDITY,
};
use sonic_primitives::{constants::TX_MAX_SIZE, SenderCache, DEFAULT_SENDER_CACHE_CAPACITY};
use sonic_scheduler::{SchedulerConfig, DEFAULT_MIN_TX_GAS};
use sonic_tracing::{LayerInfo, LogFormat};
use sonic_transaction_pool::{LocalTransactionConfig, SonicTransactionValidatorBuilder};
use std::{path::Path, str::FromStr, time::Duration};

/// Configuration of all components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Transaction pool admission.
    pub pool: PoolConfig,
    /// Caching of sponsorship checks.
    pub subsidies: SubsidiesConfig,
    /// Process wide cache of recovered senders.
    pub sender_cache: SenderCacheConfig,
    /// Block proposal scheduling.
    pub scheduler: SchedulingConfig,
    /// Logging.
    pub log: LogConfig,
}

impl Config {
    /// Loads and validates the config stored at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a TOML config.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the config to TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Checks the values that can't be enforced by their types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool.validate()?;
        self.subsidies.validate()?;
        self.scheduler.validate()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}

/// Settings of the transaction pool validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Minimum priority fee of remote transactions.
    pub min_tip: U256,
    /// Senders whose transactions are treated as local.
    pub locals: Vec<Address>,
    /// Treat all transactions as remote.
    pub no_locals: bool,
    /// Whether local transactions are propagated to peers.
    pub propagate_locals: bool,
    /// Maximum encoded size of a transaction in bytes.
    pub max_tx_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_tip: U256::ZERO,
            locals: Vec::new(),
            no_locals: false,
            propagate_locals: true,
            max_tx_size: TX_MAX_SIZE,
        }
    }
}

impl PoolConfig {
    /// The exemptions of local transactions.
    pub fn local_transactions_config(&self) -> LocalTransactionConfig {
        LocalTransactionConfig {
            no_exemptions: self.no_locals,
            local_addresses: self.locals.iter().copied().collect(),
            propagate_local_transactions: self.propagate_locals,
        }
    }

    /// Applies the settings to a validator builder.
    pub fn configure(
        &self,
        builder: SonicTransactionValidatorBuilder,
    ) -> SonicTransactionValidatorBuilder {
        builder
            .with_minimum_priority_fee(self.min_tip)
            .set_local_transactions_config(self.local_transactions_config())
            .with_max_tx_input_bytes(self.max_tx_size)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tx_size == 0 {
            return Err(ConfigError::Validation("pool.max_tx_size must be positive".to_string()))
        }
        Ok(())
    }
}

/// Settings of the [`SubsidyCheckCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubsidiesConfig {
    /// Memory budget of the cache in bytes.
    pub cache_bytes: usize,
    /// Validity of a fresh check result.
    #[serde(with = "humantime_serde")]
    pub min_validity: Duration,
    /// Upper bound of the validity of a repeatedly checked result.
    #[serde(with = "humantime_serde")]
    pub max_validity: Duration,
}

impl Default for SubsidiesConfig {
    fn default() -> Self {
        Self {
            cache_bytes: DEFAULT_CACHE_BYTES,
            min_validity: DEFAULT_MIN_VALIDITY,
            max_validity: DEFAULT_MAX_VALIDITY,
        }
    }
}

impl SubsidiesConfig {
    /// Wraps `checker` in a cache with these settings.
    pub fn cache<C: SubsidyChecker>(&self, checker: C) -> SubsidyCheckCache<C> {
        SubsidyCheckCache::new(checker, self.cache_bytes)
            .with_validity(self.min_validity, self.max_validity)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_bytes == 0 {
            return Err(ConfigError::Validation(
                "subsidies.cache_bytes must be positive".to_string(),
            ))
        }
        if self.min_validity.is_zero() {
            return Err(ConfigError::Validation(
                "subsidies.min_validity must be positive".to_string(),
            ))
        }
        if self.max_validity < self.min_validity {
            return Err(ConfigError::Validation(format!(
                "subsidies.max_validity {:?} is below min_validity {:?}",
                self.max_validity, self.min_validity
            )))
        }
        Ok(())
    }
}

/// Settings of the process wide [`SenderCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenderCacheConfig {
    /// Number of cached senders. Zero disables the cache.
    pub capacity: u32,
}

impl Default for SenderCacheConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_SENDER_CACHE_CAPACITY }
    }
}

impl SenderCacheConfig {
    /// Replaces the process wide sender cache.
    pub fn init(&self) {
        if self.capacity == 0 {
            SenderCache::teardown_global();
        } else {
            SenderCache::init_global(self.capacity);
        }
    }
}

/// Settings of the block scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulingConfig {
    /// Scheduling stops once less gas than this is left in the block.
    pub min_tx_gas: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self { min_tx_gas: DEFAULT_MIN_TX_GAS }
    }
}

impl SchedulingConfig {
    /// The [`SchedulerConfig`] of these settings.
    pub const fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig { min_tx_gas: self.min_tx_gas }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_tx_gas == 0 {
            return Err(ConfigError::Validation(
                "scheduler.min_tx_gas must be positive".to_string(),
            ))
        }
        Ok(())
    }
}

/// Settings of the stdout log layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directives, e.g. `info,executor=debug`.
    pub filter: String,
    /// Color mode: `always`, `auto` or `never`.
    pub color: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { format: LogFormat::Terminal, filter: "info".to_string(), color: None }
    }
}

impl LogConfig {
    /// The [`LayerInfo`] of the stdout layer.
    ///
    /// The first directive of the filter without a target becomes the default level.
    pub fn layer_info(&self) -> LayerInfo {
        let (default, filters): (Vec<_>, Vec<_>) = self
            .filter
            .split(',')
            .map(str::trim)
            .filter(|directive| !directive.is_empty())
            .partition(|directive| !directive.contains('='));
        let default_directive = default.first().copied().unwrap_or("info").to_string();
        LayerInfo::new(self.format, default_directive, filters.join(","), self.color.clone())
    }
}
