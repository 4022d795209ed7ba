//! Logging setup for the ledger core.
//!
//! All components log through [`tracing`] with a per-component target (`txpool`, `scheduler`,
//! `executor`, `subsidies`, `replay`, `evm`). This crate installs the global subscriber.
//!
//! ```
//! use sonic_tracing::{LayerInfo, LogFormat, SonicTracer, Tracer};
//!
//! fn main() -> eyre::Result<()> {
//!     let stdout = LayerInfo::new(
//!         LogFormat::LogFmt,
//!         "info".to_string(),
//!         "executor=debug".to_string(),
//!         None,
//!     );
//!     SonicTracer::new().with_stdout(stdout).init()?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

// Re-export tracing crates
pub use tracing;
pub use tracing_subscriber;

pub use formatter::{LogFormat, UnknownLogFormat};
pub use test_tracer::TestTracer;

mod formatter;
mod layers;
mod test_tracer;
pub mod throttle;

#[doc(hidden)]
pub mod __private {
    pub use super::throttle::{should_run, NOT_YET_RUN};
}

use crate::layers::Layers;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tracer writing to stdout.
#[derive(Debug, Clone, Default)]
pub struct SonicTracer {
    stdout: LayerInfo,
}

impl SonicTracer {
    /// Creates a tracer with the default stdout layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration of the stdout layer.
    pub fn with_stdout(mut self, config: LayerInfo) -> Self {
        self.stdout = config;
        self
    }
}

/// Configuration of a single logging layer.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    format: LogFormat,
    default_directive: String,
    filters: String,
    color: Option<String>,
}

impl LayerInfo {
    /// Creates a new layer configuration.
    ///
    /// `filters` holds additional comma separated directives such as `executor=debug`.
    pub const fn new(
        format: LogFormat,
        default_directive: String,
        filters: String,
        color: Option<String>,
    ) -> Self {
        Self { format, default_directive, filters, color }
    }

    /// Returns the configured format.
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

impl Default for LayerInfo {
    /// Terminal output at `INFO`, colored.
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            default_directive: LevelFilter::INFO.to_string(),
            filters: String::new(),
            color: Some("always".to_string()),
        }
    }
}

/// Installs a logging configuration as the global default.
pub trait Tracer {
    /// Initializes the logging configuration.
    fn init(self) -> eyre::Result<()>;
}

impl Tracer for SonicTracer {
    fn init(self) -> eyre::Result<()> {
        let mut layers = Layers::new();
        layers.stdout(
            self.stdout.format,
            self.stdout.default_directive.parse()?,
            &self.stdout.filters,
            self.stdout.color.as_deref(),
        )?;

        // fails only if a global subscriber is already installed
        let _ = tracing_subscriber::registry().with(layers.into_inner()).try_init().inspect_err(
            |err| tracing::warn!(%err, "Tracing subscriber could not be initialized"),
        );
        Ok(())
    }
}

/// Initializes a tracing subscriber for tests.
///
/// The filter is configurable via `RUST_LOG`. Silently does nothing if a subscriber is already
/// installed.
pub fn init_test_tracing() {
    let _ = TestTracer::default().init();
}
