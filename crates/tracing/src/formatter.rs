use crate::layers::BoxedLayer;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Output format of the log layer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// `key=value` pairs.
    LogFmt,
    /// Human readable output for interactive use.
    #[default]
    Terminal,
}

impl LogFormat {
    /// Builds the formatting layer for this format, filtered by `filter`.
    ///
    /// ANSI colors are enabled unless `color` is `None`, `"never"`, or `RUST_LOG_STYLE=never` is
    /// set. Targets are printed when `RUST_LOG_TARGET` is not `0`, or, if unset, when the filter
    /// enables levels more verbose than `INFO`.
    pub fn apply(&self, filter: EnvFilter, color: Option<&str>) -> BoxedLayer<Registry> {
        let ansi = color.is_some_and(|color| {
            std::env::var("RUST_LOG_STYLE").map(|val| val != "never").unwrap_or(color != "never")
        });
        let target = std::env::var("RUST_LOG_TARGET").map(|val| val != "0").unwrap_or_else(|_| {
            filter.max_level_hint().map_or(true, |max_level| max_level > tracing::Level::INFO)
        });

        match self {
            Self::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(ansi)
                .with_target(target)
                .with_filter(filter)
                .boxed(),
            Self::LogFmt => tracing_logfmt::layer().with_filter(filter).boxed(),
            Self::Terminal => tracing_subscriber::fmt::layer()
                .with_ansi(ansi)
                .with_target(target)
                .with_filter(filter)
                .boxed(),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::LogFmt => write!(f, "logfmt"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "logfmt" => Ok(Self::LogFmt),
            "terminal" => Ok(Self::Terminal),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

/// Returned when parsing an unsupported [`LogFormat`] name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLogFormat(pub String);

impl fmt::Display for UnknownLogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log format {:?}, expected one of json, logfmt, terminal", self.0)
    }
}

impl std::error::Error for UnknownLogFormat {}
