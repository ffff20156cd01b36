use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибки операций брокера.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubSubError {
    /// Пустой subject и т.п. Вызов надо исправить, повтор не поможет.
    InvalidInput { reason: &'static str },
    /// Брокер закрыт; состояние необратимо.
    Closed,
    /// Часть подписчиков не получила сообщение: их очередь полна.
    /// Остальным сообщение доставлено.
    Overflow {
        subject: String,
        dropped: usize,
        attempted: usize,
    },
    /// `close` вызван с уже истёкшим дедлайном.
    DeadlineExceeded,
    /// Некорректные параметры брокера.
    InvalidConfig { reason: String },
}

impl PubSubError {
    /// Сокращение для пустого subject.
    pub const fn empty_subject() -> Self {
        Self::InvalidInput {
            reason: "subject cannot be empty",
        }
    }
}

impl std::fmt::Display for PubSubError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::InvalidInput { reason } => write!(f, "{reason}"),
            Self::Closed => write!(f, "subpub is closed"),
            Self::Overflow {
                dropped, attempted, ..
            } => write!(
                f,
                "some subscribers dropped messages due to full buffer ({dropped} of {attempted})"
            ),
            Self::DeadlineExceeded => write!(f, "context deadline exceeded"),
            Self::InvalidConfig { reason } => write!(f, "invalid broker config: {reason}"),
        }
    }
}

impl std::error::Error for PubSubError {}

impl ErrorExt for PubSubError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::InvalidArgs,
            Self::Closed => StatusCode::Closed,
            Self::Overflow { .. } => StatusCode::QueueFull,
            Self::DeadlineExceeded => StatusCode::DeadlineExceeded,
            Self::InvalidConfig { .. } => StatusCode::InvalidConfig,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
