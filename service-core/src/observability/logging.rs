use crate::error::CoreError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event, fields flattened (default for deployed clients).
    #[default]
    Json,
    /// Human readable output for local terminals.
    Pretty,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pretty" | "text" | "compact" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. Fails if a global subscriber
/// is already installed (e.g. when called twice in one process).
pub fn init_tracing(service_name: &str, log_level: &str, format: LogFormat) -> Result<(), CoreError> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .json()
                    .flatten_event(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
    };

    result.map_err(|e| {
        eprintln!("Failed to initialize tracing for '{}': {}", service_name, e);
        CoreError::LoggingError(e.to_string())
    })?;

    tracing::debug!(service = %service_name, "Tracing initialized");
    Ok(())
}
