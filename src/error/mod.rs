//! Ошибки процесса: загрузка настроек и запуск журнала.
//!
//! Ошибки брокера и сервисного слоя живут в крейте `subpub-error` и
//! переэкспортируются отсюда.

use std::{io, path::PathBuf};

use thiserror::Error;

pub use subpub_error::*;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config path is empty")]
    EmptyPath,

    #[error("config file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("config reading error: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid broker settings: {0}")]
    Broker(#[from] PubSubError),
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", .path.display())]
    LogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid log filter '{directive}': {reason}")]
    Filter { directive: String, reason: String },

    #[error("failed to install global subscriber: {0}")]
    Init(String),
}
