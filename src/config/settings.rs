use std::{path::Path, time::Duration};

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use super::duration;
use crate::{error::ConfigError, pubsub::BrokerConfig};

/// Префикс переменных окружения: `SUBPUB__GRPC__PORT=50051`.
const ENV_PREFIX: &str = "SUBPUB";

/// Окружение запуска. Определяет уровень и назначение журнала.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    /// Журнал в stdout, уровень `debug`.
    #[default]
    Dev,
    /// Журнал в `logs/app.log`, уровень `info`.
    Prod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrpcConfig {
    pub port: u16,
}

/// Настройки процесса.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub env: Env,
    /// Сколько ждать при остановке.
    #[serde(with = "duration")]
    pub timeout: Duration,
    pub grpc: GrpcConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
}

impl Settings {
    /// Загружает настройки из файла и переменных окружения.
    ///
    /// Переменные окружения перекрывают значения из файла.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => return Err(ConfigError::EmptyPath),
        };
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let cfg = Config::builder()
            // Значения по умолчанию
            .set_default("env", "dev")?
            .set_default("timeout", "5s")?
            .set_default("grpc.port", 44044)?
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.broker.validate()?;
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Env::Dev,
            timeout: Duration::from_secs(5),
            grpc: GrpcConfig { port: 44044 },
            broker: BrokerConfig::default(),
        }
    }
}
