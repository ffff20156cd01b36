use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибки сервисного слоя (subscribe/publish по ключу).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Обязательное поле запроса пустое.
    InvalidArgument { field: &'static str },
    /// Ошибка брокера, пробрасываемая клиенту как внутренняя.
    Internal { reason: String },
}

impl ServiceError {
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::InvalidArgument { field } => write!(f, "{field} is required"),
            Self::Internal { reason } => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ErrorExt for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
            Self::Internal { .. } => StatusCode::Internal,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
