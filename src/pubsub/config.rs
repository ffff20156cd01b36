use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{config::duration, PubSubError};

/// Кол-во шардов реестра по умолчанию.
pub const DEFAULT_SHARD_COUNT: usize = 32;
/// Ёмкость очереди подписчика по умолчанию.
pub const DEFAULT_BUFFER_SIZE: usize = 100;
/// Сколько ждать обработчик одного сообщения.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

/// Максимальное количество шардов.
const MAX_SHARDS: usize = 4096;

/// Параметры брокера, фиксируются при создании.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Кол-во независимо блокируемых шардов реестра.
    pub shard_count: usize,
    /// Ёмкость очереди каждого подписчика.
    pub buffer_size: usize,
    /// Мягкий таймаут на вызов обработчика.
    #[serde(with = "duration")]
    pub handler_timeout: Duration,
}

impl BrokerConfig {
    pub fn with_shard_count(
        mut self,
        shard_count: usize,
    ) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_buffer_size(
        mut self,
        buffer_size: usize,
    ) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_handler_timeout(
        mut self,
        handler_timeout: Duration,
    ) -> Self {
        self.handler_timeout = handler_timeout;
        self
    }

    /// Проверяет, что из конфигурации можно собрать брокер.
    pub fn validate(&self) -> Result<(), PubSubError> {
        if self.shard_count == 0 || self.shard_count > MAX_SHARDS {
            return Err(PubSubError::InvalidConfig {
                reason: format!(
                    "shard_count must be in 1..={MAX_SHARDS}, got {}",
                    self.shard_count
                ),
            });
        }
        // tokio::sync::mpsc не умеет канал нулевой ёмкости
        if self.buffer_size == 0 {
            return Err(PubSubError::InvalidConfig {
                reason: "buffer_size must be positive".to_string(),
            });
        }
        if self.handler_timeout.is_zero() {
            return Err(PubSubError::InvalidConfig {
                reason: "handler_timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = BrokerConfig::default();
        assert_eq!(cfg.shard_count, 32);
        assert_eq!(cfg.buffer_size, 100);
        assert_eq!(cfg.handler_timeout, Duration::from_secs(5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_values() {
        assert!(BrokerConfig::default()
            .with_shard_count(0)
            .validate()
            .is_err());
        assert!(BrokerConfig::default()
            .with_buffer_size(0)
            .validate()
            .is_err());
        assert!(BrokerConfig::default()
            .with_handler_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_rejects_too_many_shards() {
        let err = BrokerConfig::default()
            .with_shard_count(MAX_SHARDS + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, PubSubError::InvalidConfig { .. }));
    }

    /// Незаданные поля берутся из значений по умолчанию.
    #[test]
    fn test_deserialize_partial() {
        let cfg: BrokerConfig =
            serde_json::from_str(r#"{"buffer_size": 8, "handler_timeout": "250ms"}"#).unwrap();
        assert_eq!(cfg.shard_count, DEFAULT_SHARD_COUNT);
        assert_eq!(cfg.buffer_size, 8);
        assert_eq!(cfg.handler_timeout, Duration::from_millis(250));
    }
}
