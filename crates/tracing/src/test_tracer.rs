use crate::Tracer;
use tracing_subscriber::EnvFilter;

/// Tracer for tests, captured by the test harness with the filter taken from `RUST_LOG`.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct TestTracer;

impl Tracer for TestTracer {
    fn init(self) -> eyre::Result<()> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        Ok(())
    }
}
