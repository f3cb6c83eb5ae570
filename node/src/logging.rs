//! # Logging
//!
//! One `tracing` subscriber for the whole node, installed by `run` before
//! anything else happens. Events from the alias core (`als_protocol`), the
//! node itself and the HTTP trace layer all pass through the same filter.
//!
//! Output goes to stderr. Stdout carries only what an operator must copy,
//! such as the seed of a freshly generated session key, so it can be piped
//! without log noise.
//!
//! `RUST_LOG` replaces [`DEFAULT_FILTER`] entirely when set, e.g.
//!
//! ```text
//! RUST_LOG=als_protocol=debug,als_node=info als-node run
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "als_node=info,als_protocol=info,tower_http=info";

/// Shape of each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-field lines with source locations, for a terminal.
    Pretty,
    /// One JSON object per event, for a log shipper.
    Json,
}

impl LogFormat {
    /// `json` in any case selects [`LogFormat::Json`]; anything else,
    /// including typos, falls back to [`LogFormat::Pretty`].
    pub fn from_str_lossy(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// `RUST_LOG` if it parses, otherwise `fallback`.
fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber. A second call panics, so only `run`
/// calls it.
pub fn init_logging(fallback_filter: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter(fallback_filter));

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .init(),
    }

    tracing::debug!(?format, "tracing subscriber installed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_lossy() {
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy(" json "), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy("yaml"), LogFormat::Pretty);
    }

    #[test]
    fn default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }
}
