//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Directives used when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "info,blog_server=debug,blog_core=debug,blog_infra=debug,sea_orm=warn,sqlx=warn";

/// Log output settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// One JSON object per event instead of the human readable format.
    pub json_logs: bool,
    /// Filter directives applied when `RUST_LOG` is absent.
    pub default_directives: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            default_directives: DEFAULT_DIRECTIVES.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Read `LOG_FORMAT` (`json` or anything else) and `LOG_LEVEL`.
    pub fn from_env() -> Self {
        let default_directives = match std::env::var("LOG_LEVEL") {
            // A bare level keeps sqlx and sea-orm quiet.
            Ok(level) if !level.contains('=') && !level.is_empty() => {
                format!("{},sea_orm=warn,sqlx=warn", level)
            }
            Ok(directives) if !directives.is_empty() => directives,
            _ => DEFAULT_DIRECTIVES.to_string(),
        };

        Self {
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            default_directives,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directives))
    }
}

/// Install the global subscriber.
pub fn init_telemetry(config: &TelemetryConfig) {
    let registry = tracing_subscriber::registry().with(config.filter());

    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }

    tracing::info!(
        json_logs = config.json_logs,
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );
}
