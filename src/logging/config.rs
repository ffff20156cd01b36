use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{config::Env, error::LoggingError};

/// Каталог журнала в окружении `prod`.
pub const DEFAULT_LOG_DIR: &str = "logs";
/// Имя файла журнала в окружении `prod`.
pub const DEFAULT_LOG_FILE: &str = "app.log";

/// Параметры журнала.
///
/// Куда писать и с каким уровнем определяется окружением; `RUST_LOG`
/// перекрывает уровень.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub env: Env,
    /// Явный уровень вместо уровня окружения.
    pub level: Option<String>,
    pub log_dir: PathBuf,
    pub file_name: String,
}

impl LoggingConfig {
    pub fn for_env(env: Env) -> Self {
        Self {
            env,
            level: None,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: DEFAULT_LOG_FILE.to_string(),
        }
    }

    pub fn with_level(
        mut self,
        level: impl Into<String>,
    ) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_log_dir(
        mut self,
        dir: impl AsRef<Path>,
    ) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Уровень по умолчанию: `debug` для dev, `info` для prod.
    pub fn level(&self) -> &str {
        match (&self.level, self.env) {
            (Some(level), _) => level,
            (None, Env::Dev) => "debug",
            (None, Env::Prod) => "info",
        }
    }

    /// Директива для `EnvFilter`.
    pub fn build_filter_directive(&self) -> String {
        self.level().to_string()
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.file_name)
    }

    /// Создаёт каталог журнала, если пишем в файл.
    pub fn ensure_log_dir(&self) -> Result<(), LoggingError> {
        if self.env == Env::Dev {
            return Ok(());
        }
        fs::create_dir_all(&self.log_dir).map_err(|source| LoggingError::LogDir {
            path: self.log_dir.clone(),
            source,
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_env(Env::default())
    }
}
