use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use parking_lot::RwLock;
use tokio::{runtime::Handle, sync::watch};
use tracing::{debug, info, trace};

use super::{
    shard::{shard_index, Shard},
    stats::{BrokerStats, Metrics},
    subscriber::{Delivery, Handler, Subscriber, Subscription},
    BrokerConfig,
};
use crate::{
    application::{PubSub, Unsubscribe},
    PubSubError,
};

/// Внутрипроцессный брокер сообщений по subject.
///
/// Поддерживает:
/// - Подписку обработчика на точное имя subject
/// - Неблокирующую публикацию с отбрасыванием при переполнении очереди
/// - Мягкий таймаут на обработку одного сообщения
/// - Однократное закрытие с широковещательным сигналом остановки
///
/// Клонирование дешёвое: клоны разделяют одно состояние.
pub struct Broker<M> {
    inner: Arc<BrokerInner<M>>,
}

/// Общее состояние брокера.
///
/// Блокировки берутся только в порядке «флаг закрытия → один шард».
pub(crate) struct BrokerInner<M> {
    shards: Box<[Shard<M>]>,
    /// `true` после `close`. Под этой же блокировкой взводится `shutdown`.
    closed: RwLock<bool>,
    shutdown: watch::Sender<bool>,
    config: BrokerConfig,
    metrics: Arc<Metrics>,
    next_id: AtomicU64,
    runtime: Handle,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<M: Clone + Send + 'static> Broker<M> {
    /// Брокер с параметрами по умолчанию.
    ///
    /// # Panics
    ///
    /// Как и `tokio::spawn`, паникует вне контекста рантайма Tokio.
    pub fn new() -> Self {
        Self::build(BrokerConfig::default(), Handle::current())
    }

    /// Брокер с заданными параметрами. Должен вызываться внутри рантайма.
    pub fn with_config(config: BrokerConfig) -> Result<Self, PubSubError> {
        config.validate()?;
        Ok(Self::build(config, Handle::current()))
    }

    /// Брокер, задачи подписчиков которого запускаются на `runtime`.
    ///
    /// Годится для создания вне контекста Tokio.
    pub fn with_runtime(
        config: BrokerConfig,
        runtime: Handle,
    ) -> Result<Self, PubSubError> {
        config.validate()?;
        Ok(Self::build(config, runtime))
    }

    fn build(
        config: BrokerConfig,
        runtime: Handle,
    ) -> Self {
        let shards = (0..config.shard_count).map(|_| Shard::new()).collect();
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(BrokerInner {
                shards,
                closed: RwLock::new(false),
                shutdown,
                config,
                metrics: Arc::new(Metrics::default()),
                next_id: AtomicU64::new(1),
                runtime,
            }),
        }
    }

    /// Подписывает обработчик на `subject`.
    pub fn subscribe<F>(
        &self,
        subject: &str,
        handler: F,
    ) -> Result<Subscription<M>, PubSubError>
    where
        F: Fn(M) + Send + Sync + 'static,
    {
        self.subscribe_handler(subject, Arc::new(handler))
    }

    /// То же, что [`subscribe`](Self::subscribe), для уже упакованного
    /// обработчика.
    ///
    /// Флаг закрытия удерживается на чтение до запуска задачи, поэтому
    /// `close` не может проскочить между проверкой и регистрацией: каждая
    /// зарегистрированная задача увидит сигнал остановки.
    pub fn subscribe_handler(
        &self,
        subject: &str,
        handler: Handler<M>,
    ) -> Result<Subscription<M>, PubSubError> {
        if subject.is_empty() {
            return Err(PubSubError::empty_subject());
        }

        let closed = self.inner.closed.read();
        if *closed {
            return Err(PubSubError::Closed);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (subscriber, worker) = Subscriber::new(
            id,
            Arc::from(subject),
            handler,
            self.inner.config.buffer_size,
            self.inner.shutdown.subscribe(),
            self.inner.config.handler_timeout,
            Arc::clone(&self.inner.metrics),
        );
        self.inner.shard_for(subject).insert(Arc::clone(&subscriber));
        self.inner.runtime.spawn(worker.run());
        drop(closed);

        debug!(subject, id, "subscriber registered");
        Ok(Subscription::new(subscriber, Arc::downgrade(&self.inner)))
    }

    /// Публикует сообщение всем подписчикам `subject`.
    ///
    /// Никогда не блокируется. Если у части подписчиков очередь полна,
    /// сообщение для них отбрасывается, остальным оно доставлено, а
    /// вызывающему возвращается одна сводная [`PubSubError::Overflow`].
    pub fn publish(
        &self,
        subject: &str,
        msg: M,
    ) -> Result<(), PubSubError> {
        if subject.is_empty() {
            return Err(PubSubError::empty_subject());
        }

        let closed = self.inner.closed.read();
        if *closed {
            return Err(PubSubError::Closed);
        }

        let subscribers = self.inner.shard_for(subject).snapshot(subject);
        self.inner.metrics.record_publish();

        let attempted = subscribers.len();
        let mut dropped = 0;
        for subscriber in &subscribers {
            match subscriber.try_deliver(msg.clone()) {
                Delivery::Queued => self.inner.metrics.record_delivered(),
                Delivery::Full => {
                    self.inner.metrics.record_dropped();
                    dropped += 1;
                }
                Delivery::Gone => {}
            }
        }
        drop(closed);

        trace!(subject, attempted, dropped, "message published");
        if dropped > 0 {
            debug!(subject, dropped, attempted, "subscriber queues overflowed");
            return Err(PubSubError::Overflow {
                subject: subject.to_string(),
                dropped,
                attempted,
            });
        }
        Ok(())
    }
}

impl<M> Broker<M> {
    /// Закрывает брокер.
    ///
    /// Первый вызов запрещает новые подписки и публикации, очищает реестр и
    /// рассылает сигнал остановки всем задачам подписчиков. Завершения задач
    /// не ждёт. Повторный вызов сразу возвращает `Ok(())`.
    ///
    /// Если `deadline` уже истёк к моменту вызова, брокер всё равно
    /// закрывается, но возвращается [`PubSubError::DeadlineExceeded`].
    pub fn close(
        &self,
        deadline: Option<Instant>,
    ) -> Result<(), PubSubError> {
        let mut closed = self.inner.closed.write();
        if *closed {
            return Ok(());
        }
        *closed = true;
        self.inner.shutdown.send_replace(true);
        let removed: usize = self.inner.shards.iter().map(Shard::clear).sum();
        drop(closed);

        info!(removed, "broker closed");
        match deadline {
            Some(deadline) if Instant::now() >= deadline => Err(PubSubError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.read()
    }

    /// Кол-во подписчиков на `subject`.
    pub fn subscriber_count(
        &self,
        subject: &str,
    ) -> usize {
        self.inner.shard_for(subject).subscriber_count(subject)
    }

    /// Кол-во subject, на которые есть хотя бы одна подписка.
    pub fn subject_count(&self) -> usize {
        self.inner.shards.iter().map(Shard::subject_count).sum()
    }

    /// Снимок счётчиков брокера.
    pub fn stats(&self) -> BrokerStats {
        let active = self
            .inner
            .shards
            .iter()
            .map(Shard::total_subscribers)
            .sum();
        self.inner.metrics.snapshot(active)
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }
}

impl<M> BrokerInner<M> {
    fn shard_for(
        &self,
        subject: &str,
    ) -> &Shard<M> {
        &self.shards[shard_index(subject, self.shards.len())]
    }

    /// Снимает подписчика с учёта и останавливает его задачу.
    ///
    /// После закрытия брокера ничего не делает: задачи уже остановлены
    /// общим сигналом.
    pub(crate) fn unregister(
        &self,
        subscriber: &Arc<Subscriber<M>>,
    ) {
        let closed = self.closed.read();
        if *closed {
            return;
        }
        let subject = subscriber.subject();
        if self.shard_for(subject).remove(subscriber) {
            subscriber.stop();
            debug!(subject = %subject, id = subscriber.id(), "subscriber removed");
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl<M: Clone + Send + 'static> Default for Broker<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for Broker<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> fmt::Debug for Broker<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Broker")
            .field("config", &self.inner.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<M: Clone + Send + 'static> PubSub<M> for Broker<M> {
    type Subscription = Subscription<M>;
    type Error = PubSubError;

    fn subscribe(
        &self,
        subject: &str,
        handler: Handler<M>,
    ) -> Result<Self::Subscription, Self::Error> {
        self.subscribe_handler(subject, handler)
    }

    fn publish(
        &self,
        subject: &str,
        msg: M,
    ) -> Result<(), Self::Error> {
        Broker::publish(self, subject, msg)
    }

    fn close(
        &self,
        deadline: Option<Instant>,
    ) -> Result<(), Self::Error> {
        Broker::close(self, deadline)
    }
}

impl<M> Unsubscribe for Subscription<M> {
    fn unsubscribe(&self) {
        Subscription::unsubscribe(self)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
