use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{registry::LookupSpan, Layer};

use super::json_layer;
use crate::{error::LoggingError, logging::config::LoggingConfig};

/// JSON в файл через неблокирующий писатель (окружение prod).
///
/// Файл не ротируется и дописывается при перезапуске. Guard нужно держать,
/// пока журнал используется.
pub fn layer<S>(
    config: &LoggingConfig
) -> Result<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard), LoggingError>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    config.ensure_log_dir()?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&config.file_name)
        .build(&config.log_dir)
        .map_err(|e| LoggingError::LogFile {
            path: config.log_path(),
            source: std::io::Error::other(e),
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    Ok((json_layer(writer, false), guard))
}
