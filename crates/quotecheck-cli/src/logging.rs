use tracing_subscriber::EnvFilter;

const LOG_LEVEL_ENV: &str = "QUOTECHECK_LOG_LEVEL";

/// Logs go to stderr; stdout carries the report and id dumps.
pub fn init_logging(debug: bool) {
    let level = default_level(debug, std::env::var(LOG_LEVEL_ENV).ok());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("log_init_error: subscriber already set");
    }
}

/// `QUOTECHECK_LOG_LEVEL` beats `--debug`; `RUST_LOG` beats both.
fn default_level(debug: bool, configured: Option<String>) -> String {
    match configured {
        Some(level) if !level.trim().is_empty() => level.trim().to_string(),
        _ if debug => "debug".to_string(),
        _ => "warn".to_string(),
    }
}

pub fn env_true(key: &str) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_beats_debug_flag() {
        assert_eq!(default_level(true, Some("info".to_string())), "info");
        assert_eq!(default_level(false, Some(" trace ".to_string())), "trace");
    }

    #[test]
    fn debug_flag_applies_without_configured_level() {
        assert_eq!(default_level(true, None), "debug");
        assert_eq!(default_level(true, Some("  ".to_string())), "debug");
        assert_eq!(default_level(false, None), "warn");
    }
}
