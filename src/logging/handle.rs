use tracing_appender::non_blocking::WorkerGuard;

/// Управляет временем жизни журнала.
///
/// Держит guard фонового писателя файла; пока handle жив, записи из
/// неблокирующего буфера доходят до файла.
#[must_use = "dropping the handle stops the background log writer"]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    /// Пишет ли журнал в файл через фоновый поток.
    pub fn has_file_writer(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Сбрасывает буферы и останавливает фоновый писатель.
    pub fn shutdown(mut self) {
        tracing::info!(file = self.has_file_writer(), "logging shutdown");
        // drop guard-а дожидается записи оставшихся сообщений
        drop(self.file_guard.take());
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("file_writer", &self.has_file_writer())
            .finish()
    }
}
