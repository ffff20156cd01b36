//! Расширение `Result` для приклеивания контекста к ошибке.

use crate::StackError;

/// `.context(...)` превращает ошибку в [`StackError`] и добавляет к ней
/// имя операции.
pub trait ResultExt<T> {
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, StackError>
    where
        C: Into<String>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<StackError>,
{
    #[track_caller]
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, StackError>
    where
        C: Into<String>,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(ctx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PubSubError, StatusCode};

    fn closed() -> Result<(), PubSubError> {
        Err(PubSubError::Closed)
    }

    #[test]
    fn test_context_wraps_typed_error() {
        let err = closed().context("eventbus.publish").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Closed);
        assert_eq!(err.contexts().len(), 1);
        assert_eq!(err.contexts()[0].message, "eventbus.publish");
    }

    /// Контекст добавляется и к уже обёрнутой ошибке.
    #[test]
    fn test_context_on_stack_error() {
        let err = closed()
            .context("broker.publish")
            .context("eventbus.publish")
            .unwrap_err();
        assert_eq!(err.to_string(), "eventbus.publish: broker.publish: subpub is closed");
    }

    /// Место вызова указывает на вызывающий код, а не на `context`.
    #[test]
    fn test_location_points_at_caller() {
        let err = closed().context("op").unwrap_err();
        assert!(err.contexts()[0].location.file().ends_with("macros.rs"));
    }
}
