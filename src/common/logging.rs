use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

static INIT: OnceLock<()> = OnceLock::new();

/// Environment variable consulted when no explicit level is given.
pub const LOG_ENV: &str = "LAZYSORT_LOG";

/// Level used when neither the flag nor the environment sets one.
pub const DEFAULT_LEVEL: &str = "warn";

/// Resolve the filter string: explicit level, then `LAZYSORT_LOG`, then the default.
pub fn resolve_level(explicit: Option<&str>) -> String {
    if let Some(level) = explicit {
        let trimmed = level.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    match std::env::var(LOG_ENV) {
        Ok(level) if !level.trim().is_empty() => level.trim().to_string(),
        _ => DEFAULT_LEVEL.to_string(),
    }
}

/// Install the global subscriber writing to stderr. Later calls are no-ops.
pub fn init_with_level(level: &str) {
    INIT.get_or_init(|| {
        let env_filter = EnvFilter::new(level);
        let use_ansi = std::io::stderr().is_terminal();
        let _ = tracing_fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(use_ansi)
            .with_target(false)
            .with_thread_names(true)
            .try_init();
    });
}

pub fn init() {
    init_with_level(&resolve_level(None));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_level_wins() {
        assert_eq!(resolve_level(Some("debug")), "debug");
        assert_eq!(resolve_level(Some("  info ")), "info");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_with_level("warn");
        init_with_level("trace");
    }
}
