//! Watch command implementation

use crate::alerts::{AlertStore, LiveMetrics};
use crate::cli::{output, WatchArgs};
use crate::config::{EdgePulseConfig, LogFormat};
use crate::notify::{Notification, NotificationLevel, Notifier};
use crate::router::MessageRouter;
use crate::stream::ConnectionManager;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load configuration from `path` (when it exists) plus environment overrides
pub fn load_config(path: &Path) -> Result<EdgePulseConfig, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        EdgePulseConfig::load(Some(path))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        EdgePulseConfig::default()
    };

    Ok(config.with_env_overrides())
}

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &WatchArgs,
) -> Result<EdgePulseConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;

    if let Some(ref url) = args.url {
        config.stream.url = url.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

/// Initialize tracing based on configuration
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
pub async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = cancel_token.cancelled() => return,
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }

    cancel_token.cancel();
}

/// Log a notification at the level it carries
fn log_notification(notification: &Notification) {
    match notification {
        Notification::Alert {
            level,
            severity,
            pop_code,
            message,
        } => match level {
            NotificationLevel::Error => {
                tracing::error!(%severity, pop = %pop_code, "{}", message)
            }
            NotificationLevel::Warning => {
                tracing::warn!(%severity, pop = %pop_code, "{}", message)
            }
            NotificationLevel::Info => {
                tracing::info!(%severity, pop = %pop_code, "{}", message)
            }
        },
        Notification::ConnectionLost { attempts } => {
            tracing::error!(attempts, "Connection to event source lost");
        }
        Notification::StateChanged { state } => {
            tracing::debug!(%state, "Connection state changed");
        }
    }
}

/// Main watch command handler
pub async fn run_watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load, merge and validate configuration
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    // 2. Initialize tracing and metrics
    init_tracing(&config.logging)?;
    crate::metrics::setup_metrics(&config.metrics)?;

    tracing::info!(url = %config.stream.url, "Starting EdgePulse watch");
    tracing::debug!(?config, "Loaded configuration");

    // 3. Wire store, router and connection
    let notifier = Notifier::new();
    let alerts = Arc::new(AlertStore::with_capacity(config.alerts.capacity));
    let live_metrics = Arc::new(LiveMetrics::new());
    let router = Arc::new(MessageRouter::new(
        Arc::clone(&alerts),
        Arc::clone(&live_metrics),
        notifier.clone(),
    ));

    let mut notifications = notifier.subscribe();
    let manager = ConnectionManager::new(config.stream.clone(), router, notifier);

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    manager.connect();

    // 4. Follow notifications until interrupted or retries are exhausted
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            received = notifications.recv() => match received {
                Ok(notification) => {
                    log_notification(&notification);
                    if matches!(notification, Notification::ConnectionLost { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification receiver lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    // 5. Release the connection, then report what we hold
    manager.shutdown().await;
    cancel_token.cancel();

    let snapshot = alerts.snapshot();
    let counts = alerts.counts();
    if args.json {
        println!(
            "{}",
            output::format_watch_json(&snapshot, counts, &live_metrics.snapshot())?
        );
    } else {
        println!("{}", output::format_alerts_table(&snapshot));
        println!("{}", output::format_counts(counts));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn watch_args(config: PathBuf) -> WatchArgs {
        WatchArgs {
            config,
            url: None,
            log_level: None,
            json: false,
        }
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/edgepulse.toml")).unwrap();
        assert_eq!(config.alerts.capacity, 50);
    }

    #[test]
    fn test_cli_overrides_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            "[stream]\nurl = \"ws://file.example.com/ws\"\n[logging]\nlevel = \"warn\"",
        )
        .unwrap();

        let mut args = watch_args(temp.path().to_path_buf());
        args.url = Some("wss://cli.example.com/ws".to_string());
        args.log_level = Some("trace".to_string());
        let config = load_config_with_overrides(&args).unwrap();
        assert_eq!(config.stream.url, "wss://cli.example.com/ws");
        assert_eq!(config.logging.level, "trace");
    }
}
