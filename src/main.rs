use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use subpub::{
    logging::{init_logging, LoggingConfig},
    Broker, Event, EventBus, PubSub, PubSubService, Settings,
};
use tracing::{error, info};

/// Внутрипроцессный pub/sub брокер.
#[derive(Parser)]
#[command(name = "subpub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "In-process publish/subscribe broker", long_about = None)]
struct Cli {
    /// Путь к файлу конфигурации
    #[arg(long, env = "CONFIG_PATH", help = "Path to the config file")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;

    let logging = init_logging(LoggingConfig::for_env(settings.env))
        .context("failed to initialize logging")?;

    let broker: Broker<Event> =
        Broker::with_config(settings.broker.clone()).context("failed to create broker")?;
    let bus: Arc<EventBus<Event, Broker<Event>>> = Arc::new(EventBus::new(broker));
    let service = PubSubService::new(Arc::clone(&bus));

    info!(
        port = settings.grpc.port,
        shards = settings.broker.shard_count,
        buffer_size = settings.broker.buffer_size,
        "subpub started"
    );

    shutdown_signal().await;
    info!("shutdown signal received");

    service.shutdown();
    if let Err(e) = bus.close(Some(deadline(settings.timeout))) {
        error!(error = %e, "failed to close broker");
    }

    logging.shutdown();
    Ok(())
}

fn deadline(timeout: Duration) -> Instant {
    Instant::now() + timeout
}

/// Ждёт Ctrl+C или SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_config_path_from_env() {
        std::env::set_var("CONFIG_PATH", "/etc/subpub/config.yaml");
        let cli = Cli::try_parse_from(["subpub"]);
        std::env::remove_var("CONFIG_PATH");

        assert_eq!(
            cli.unwrap().config,
            Some(PathBuf::from("/etc/subpub/config.yaml"))
        );
    }

    /// Флаг важнее переменной окружения.
    #[test]
    #[serial]
    fn test_config_flag_wins_over_env() {
        std::env::set_var("CONFIG_PATH", "/from/env.yaml");
        let cli = Cli::try_parse_from(["subpub", "--config", "/from/flag.yaml"]);
        std::env::remove_var("CONFIG_PATH");

        assert_eq!(cli.unwrap().config, Some(PathBuf::from("/from/flag.yaml")));
    }

    #[test]
    #[serial]
    fn test_config_path_absent() {
        std::env::remove_var("CONFIG_PATH");
        let cli = Cli::try_parse_from(["subpub"]).unwrap();
        assert!(cli.config.is_none());
    }
}
