//! Настройки процесса: файл конфигурации и переменные окружения.

pub mod duration;
pub mod settings;

pub use settings::{Env, GrpcConfig, Settings};
