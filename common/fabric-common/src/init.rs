//! Tracing initialization
//!
//! MCP servers speak JSON-RPC on stdout, so every log line goes to stderr.

use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text without ANSI colours
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Ok(LogFormat::Text)
        }
    }
}

/// Options for [`init_tracing`]
#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Crate whose spans get the default level (e.g. `fabric_mcp`)
    pub crate_name: String,
    /// Level applied to `crate_name` unless `RUST_LOG` says otherwise
    pub level: tracing::Level,
    /// Text or JSON output
    pub format: LogFormat,
}

impl TracingOptions {
    /// Options for a crate at `info`, format taken from `LOG_FORMAT`
    pub fn for_crate(crate_name: impl Into<String>) -> Self {
        let format = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        Self {
            crate_name: crate_name.into(),
            level: tracing::Level::INFO,
            format,
        }
    }

    /// Raise the crate level from a `-v` count (1 = debug, 2+ = trace)
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.level = match verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };
        self
    }

    fn directive(&self) -> String {
        format!("{}={}", self.crate_name, self.level.as_str().to_lowercase())
    }
}

/// Initialize tracing to stderr
///
/// `RUST_LOG` filters are honoured; the crate directive from `options` is
/// appended so the server's own spans show up without extra setup.
pub fn init_tracing(options: &TracingOptions) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(options.directive().parse()?);
    let registry = tracing_subscriber::registry().with(filter);

    match options.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?,
    }

    Ok(())
}
