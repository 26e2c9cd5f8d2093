/*!
Logging setup for binaries built on this crate.

All engine progress and every warning go through `tracing`. Front-ends call
[`init_tracing`] once at startup; output goes to stderr so stdout stays free
for command results.
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::{Result, ThemeError};

/// Output format of the log stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ThemeError::validation(format!(
                "unknown log format '{other}' (expected text or json)"
            ))),
        }
    }
}

/// Default filter directive: `info`, or `debug` when verbose
///
/// `RUST_LOG` takes precedence when set.
pub fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global tracing subscriber
///
/// Fails if a global subscriber was already set.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<()> {
    let filter = default_filter(verbose);

    let installed = match format {
        LogFormat::Text => {
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            set_global_default(Registry::default().with(filter).with(layer))
        }
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_current_span(false)
                .with_writer(std::io::stderr);
            set_global_default(Registry::default().with(filter).with(layer))
        }
    };

    installed.map_err(|e| {
        ThemeError::validation(format!("failed to set global tracing subscriber: {e}"))
    })?;
    tracing::debug!("Logging initialized ({format})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_tracing(false, LogFormat::Text);
        assert!(init_tracing(false, LogFormat::Json).is_err());
    }
}
