//! Structured logging setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter when neither `RUST_LOG` nor a configured level is set.
pub const DEFAULT_DIRECTIVE: &str = "signal_engine=info";

/// Build the env filter.
///
/// `RUST_LOG` wins; otherwise the configured level applies to this crate.
#[must_use]
pub fn build_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive_for(level)))
}

fn directive_for(level: Option<&str>) -> String {
    level
        .filter(|l| !l.trim().is_empty())
        .map_or_else(|| DEFAULT_DIRECTIVE.to_string(), |l| format!("signal_engine={l}"))
}

/// Install the global fmt subscriber.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_tracing(level: Option<&str>) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_applies_to_crate() {
        assert_eq!(directive_for(Some("debug")), "signal_engine=debug");
    }

    #[test]
    fn blank_level_uses_default() {
        assert_eq!(directive_for(None), DEFAULT_DIRECTIVE);
        assert_eq!(directive_for(Some("  ")), DEFAULT_DIRECTIVE);
    }
}
