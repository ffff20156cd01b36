//! Интерфейс (порт) брокера сообщений.
//!
//! Через этот трейт брокер видят декоратор логирования и сервисный слой:
//! - `subscribe` — подписать обработчик на subject.
//! - `publish` — опубликовать сообщение.
//! - `close` — закрыть брокер с необязательным дедлайном.

use std::time::Instant;

use crate::pubsub::Handler;

/// Дескриптор подписки, который умеет её отменять.
pub trait Unsubscribe {
    /// Отменяет подписку. Повторные вызовы ничего не делают.
    fn unsubscribe(&self);
}

pub trait PubSub<M>: Send + Sync + 'static {
    type Subscription: Unsubscribe + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Подписать обработчик на subject.
    fn subscribe(
        &self,
        subject: &str,
        handler: Handler<M>,
    ) -> Result<Self::Subscription, Self::Error>;
    /// Опубликовать сообщение всем подписчикам subject.
    fn publish(
        &self,
        subject: &str,
        msg: M,
    ) -> Result<(), Self::Error>;
    /// Закрыть брокер.
    fn close(
        &self,
        deadline: Option<Instant>,
    ) -> Result<(), Self::Error>;
}
