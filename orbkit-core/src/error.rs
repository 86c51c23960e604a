//! Fault types. Admission rejections are not faults and never appear here;
//! they travel as [`GateReason`](crate::components::gates::GateReason) values.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// A fault raised by a strategy hook.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy `{strategy}` hook `{hook}` failed: {message}")]
    Hook {
        strategy: String,
        hook: &'static str,
        message: String,
    },
}

/// Faults surfaced by the strategy engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("void bar at index {bar_index}: non-finite price or negative ATR")]
    VoidBar { bar_index: usize },

    #[error("malformed bar at index {bar_index}: OHLC prices are inconsistent")]
    MalformedBar { bar_index: usize },

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}
