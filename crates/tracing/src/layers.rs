use crate::formatter::LogFormat;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Directive, EnvFilter, Layer, Registry};

/// A boxed tracing [Layer].
pub(crate) type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Crates whose debug output drowns the ledger core targets.
const DEFAULT_ENV_FILTER_DIRECTIVES: [&str; 1] = ["alloy_trie=off"];

/// Collects the layers installed on the global subscriber.
#[derive(Default)]
pub(crate) struct Layers {
    inner: Vec<BoxedLayer<Registry>>,
}

impl Layers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_inner(self) -> Vec<BoxedLayer<Registry>> {
        self.inner
    }

    /// Adds the stdout layer.
    pub(crate) fn stdout(
        &mut self,
        format: LogFormat,
        default_directive: Directive,
        filters: &str,
        color: Option<&str>,
    ) -> eyre::Result<()> {
        let filter = build_env_filter(Some(default_directive), filters)?;
        self.inner.push(format.apply(filter, color));
        Ok(())
    }
}

/// Builds an [`EnvFilter`] from `RUST_LOG`, the default directive and the given comma separated
/// directives.
pub(crate) fn build_env_filter(
    default_directive: Option<Directive>,
    directives: &str,
) -> eyre::Result<EnvFilter> {
    let env_filter = if let Some(default_directive) = default_directive {
        EnvFilter::builder().with_default_directive(default_directive).from_env_lossy()
    } else {
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy()
    };

    DEFAULT_ENV_FILTER_DIRECTIVES
        .into_iter()
        .chain(directives.split(',').filter(|d| !d.is_empty()))
        .try_fold(env_filter, |env_filter, directive| {
            Ok(env_filter.add_directive(directive.parse()?))
        })
}
