//! Logging Module
//!
//! Compact `tracing` output for the CLI and the server. Each binary picks a
//! preset; `RUST_LOG` directives, when set, replace the preset's filter.

use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directives used when `RUST_LOG` is unset (e.g. `info`, `debug,tract_core=info`)
    pub filter: String,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to include thread IDs
    pub include_thread_ids: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            include_target: false,
            include_thread_ids: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Per-stage pipeline events; the inference runtimes stay at info
    pub fn verbose() -> Self {
        Self {
            filter: "debug,tract_core=info,tract_onnx=info,burn=info".to_string(),
            include_target: true,
            include_thread_ids: true,
            ansi_colors: true,
        }
    }

    /// Errors only, so machine-readable stdout stays clean
    pub fn quiet() -> Self {
        Self {
            filter: "error".to_string(),
            ..Self::default()
        }
    }

    /// Server logging: info level, no colors
    pub fn production() -> Self {
        Self {
            ansi_colors: false,
            ..Self::default()
        }
    }

    /// Filter from explicit directives, falling back to the preset
    fn env_filter(&self, directives: Option<&str>) -> EnvFilter {
        match directives.map(str::trim).filter(|d| !d.is_empty()) {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::new(&self.filter),
        }
    }
}

/// Initialize logging with the given configuration
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter(from_env.as_deref()))
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids)
        .compact()
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}
