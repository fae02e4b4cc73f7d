use toolbridge_config::LoggingConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install a global `fmt` subscriber for hosts that do not bring their own.
///
/// `RUST_LOG` takes precedence over the configured level and targets. Calling
/// this after a subscriber is already installed only logs a warning.
pub fn init_tracing(config: &LoggingConfig) {
    let filter_str = config.filter_directive();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(config.ansi);

    let init_result = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();

    match init_result {
        Ok(()) => {
            tracing::debug!(filter = %filter_str, "tracing initialized");
        }
        Err(err) => {
            tracing::warn!(
                error = %err,
                "tracing already initialized; skipping toolbridge tracing setup"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolbridge_config::TraceLevel;

    #[test]
    fn second_initialization_is_harmless() {
        let config = LoggingConfig {
            level: TraceLevel::Debug,
            ..LoggingConfig::default()
        };
        init_tracing(&config);
        init_tracing(&config);
    }
}
