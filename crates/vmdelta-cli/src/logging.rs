use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Env var selecting the log format (`json` or `human`).
pub const LOG_FORMAT_ENV: &str = "VMDELTA_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable output next to the terminal progress lines.
    #[default]
    Human,
    /// Structured JSON output (for schedulers that ship logs).
    Json,
}

impl LogFormat {
    /// Parse from an env/config string. Unknown values fall back to `Human`.
    pub fn from_str_arg(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Human,
        }
    }

    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| Self::from_str_arg(&v))
            .unwrap_or_default()
    }

    /// Filter used when `RUST_LOG` is unset. Interactive runs already get
    /// progress lines on stdout, so only warnings are logged there.
    fn default_filter(self) -> &'static str {
        match self {
            Self::Human => "warn",
            Self::Json => "vmdelta=info,warn",
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at program startup. Respects `RUST_LOG` env var for filtering.
/// Logs go to stderr; stdout carries the progress lines.
pub fn init(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format.default_filter()));

    match format {
        LogFormat::Human => {
            let subscriber = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .compact();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(subscriber)
                .init();
        }
        LogFormat::Json => {
            let subscriber = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(subscriber)
                .init();
        }
    }
}
