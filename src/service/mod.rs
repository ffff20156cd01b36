//! Сервисный слой: подписка по ключу с выдачей потока событий и
//! публикация строковых данных.
//!
//! Сетевой транспорт сюда не входит; сервис работает поверх любого
//! [`PubSub<Event>`] и может быть подключён к нему снаружи.

mod event;
mod stream;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::{
    runtime::Handle,
    sync::{mpsc, watch, Notify},
};
use tracing::debug;

pub use event::Event;
pub use stream::EventStream;

use crate::{
    application::{PubSub, Unsubscribe},
    pubsub::Handler,
    ServiceError,
};

/// Ёмкость канала пересылки в поток по умолчанию.
pub const DEFAULT_FORWARD_CAPACITY: usize = 64;

/// Сервис подписок и публикаций по ключу.
pub struct PubSubService<P> {
    bus: Arc<P>,
    shutdown: watch::Sender<bool>,
    forward_capacity: usize,
    active: Arc<AtomicUsize>,
    runtime: Handle,
}

/// Будит наблюдателя потока, когда брокер отпускает обработчик.
struct SourceGuard(Arc<Notify>);

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<P: PubSub<Event>> PubSubService<P> {
    /// Создаёт сервис. Должен вызываться внутри рантайма Tokio.
    pub fn new(bus: Arc<P>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            bus,
            shutdown,
            forward_capacity: DEFAULT_FORWARD_CAPACITY,
            active: Arc::new(AtomicUsize::new(0)),
            runtime: Handle::current(),
        }
    }

    pub fn with_forward_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.forward_capacity = capacity.max(1);
        self
    }

    /// Подписывается на `key` и возвращает поток событий.
    ///
    /// Подписка в брокере отменяется, когда поток уничтожен, когда
    /// пересылка в него не удалась или когда сервис остановлен. Поток
    /// заканчивается и после закрытия брокера.
    pub fn subscribe(
        &self,
        key: &str,
    ) -> Result<EventStream, ServiceError> {
        if key.is_empty() {
            return Err(ServiceError::InvalidArgument { field: "key" });
        }

        let (tx, rx) = mpsc::channel(self.forward_capacity);
        let ended = Arc::new(Notify::new());

        let forward = tx.clone();
        let guard = SourceGuard(Arc::clone(&ended));
        // обработчик работает в собственном потоке брокера; брокер отпускает
        // его при отписке и закрытии, и тогда guard будит наблюдателя
        let handler: Handler<Event> = Arc::new(move |event| {
            if forward.blocking_send(event).is_err() {
                guard.0.notify_one();
            }
        });

        let sub = self
            .bus
            .subscribe(key, handler)
            .map_err(|err| ServiceError::internal(format!("failed to subscribe: {err}")))?;

        self.active.fetch_add(1, Ordering::Relaxed);
        let active = Arc::clone(&self.active);
        let mut shutdown = self.shutdown.subscribe();
        let watched_key = key.to_string();

        self.runtime.spawn(async move {
            tokio::select! {
                _ = tx.closed() => debug!(key = %watched_key, "stream dropped by consumer"),
                _ = ended.notified() => debug!(key = %watched_key, "stream source ended"),
                _ = shutdown.wait_for(|stop| *stop) => debug!(key = %watched_key, "service shutdown"),
            }
            sub.unsubscribe();
            active.fetch_sub(1, Ordering::Relaxed);
        });

        Ok(EventStream::new(key, rx))
    }

    /// Публикует `data` в `key` в конверте [`Event`].
    pub fn publish(
        &self,
        key: &str,
        data: &str,
    ) -> Result<(), ServiceError> {
        if key.is_empty() {
            return Err(ServiceError::InvalidArgument { field: "key" });
        }
        if data.is_empty() {
            return Err(ServiceError::InvalidArgument { field: "data" });
        }

        self.bus
            .publish(key, Event::new(data))
            .map_err(|err| ServiceError::internal(format!("failed to publish: {err}")))
    }

    /// Останавливает все открытые потоки.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Кол-во потоков, подписка которых ещё не отменена.
    pub fn active_streams(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn bus(&self) -> &Arc<P> {
        &self.bus
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.0.notify_one();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
