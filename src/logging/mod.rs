//! Журнал процесса на `tracing`.
//!
//! dev: JSON в stdout, уровень `debug`. prod: JSON в `logs/app.log` через
//! неблокирующий писатель, уровень `info`. `RUST_LOG` перекрывает уровень.

pub mod config;
mod filters;
pub mod handle;
pub mod sinks;

pub use config::LoggingConfig;
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{config::Env, error::LoggingError};

/// Устанавливает глобальный subscriber. Вызывается один раз при старте.
pub fn init_logging(config: LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    let env_filter = filters::build_filter_from_config(&config)?;

    let (layer, file_guard) = match config.env {
        Env::Dev => (sinks::console::layer(), None),
        Env::Prod => {
            let (layer, guard) = sinks::file::layer(&config)?;
            (layer, Some(guard))
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = ?config.env,
        level = config.level(),
        file = file_guard.is_some(),
        "logging initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
