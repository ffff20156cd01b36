use std::fmt;

/// Коды статуса, которые выдают брокер и сервисный слой.
///
/// # Диапазоны:
/// - 1xxx: Вызов и внутренние ошибки
/// - 4xxx: Переполнение очередей
/// - 5xxx: Жизненный цикл
/// - 6xxx: Время
/// - 7xxx: Конфигурация
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    // === 1xxx ===
    Internal = 1003,
    InvalidArgs = 1004,

    // === 4xxx ===
    QueueFull = 4000,

    // === 5xxx ===
    Closed = 5000,

    // === 6xxx ===
    DeadlineExceeded = 6002,

    // === 7xxx ===
    InvalidConfig = 7000,
}

/// Уровень журнала, с которым стоит писать ошибку.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Рекомендуемый уровень логирования для данного кода.
    ///
    /// Ошибки вызывающего кода и обращения к закрытому брокеру штатны,
    /// переполнение означает потерю сообщений.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::InvalidArgs | Self::Closed => LogLevel::Info,
            Self::QueueFull | Self::DeadlineExceeded => LogLevel::Warn,
            Self::Internal | Self::InvalidConfig => LogLevel::Error,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
