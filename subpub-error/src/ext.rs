use std::{any::Any, error::Error};

use crate::StatusCode;

/// Общий интерфейс ошибок брокера и сервиса (object-safe).
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Статус ошибки. По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Возвращает ошибку как [`Any`], чтобы можно было выполнить downcast.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct Opaque;

    impl fmt::Display for Opaque {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            f.write_str("opaque")
        }
    }

    impl Error for Opaque {}

    impl ErrorExt for Opaque {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_default_status_code_is_internal() {
        assert_eq!(Opaque.status_code(), StatusCode::Internal);
    }

    #[test]
    fn test_as_any_downcast() {
        let err: &dyn ErrorExt = &Opaque;
        assert!(err.as_any().downcast_ref::<Opaque>().is_some());
    }
}
