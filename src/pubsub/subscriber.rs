use std::{
    fmt,
    ops::ControlFlow,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    thread,
    time::Duration,
};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot, watch,
};
use tracing::{debug, error, trace, warn};

use super::{broker::BrokerInner, stats::Metrics};

/// Обработчик сообщений подписчика.
///
/// Каждый вызов идёт в собственном потоке ОС, поэтому обработчик может спать
/// или выполнять блокирующий ввод-вывод, не мешая другим подписчикам.
/// Зависший вызов держит только свой поток.
pub type Handler<M> = Arc<dyn Fn(M) + Send + Sync + 'static>;

/// Результат попытки положить сообщение в очередь подписчика.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Queued,
    /// Очередь полна, сообщение отброшено для этого подписчика.
    Full,
    /// Задача подписчика уже завершилась.
    Gone,
}

/// Почему задача подписчика остановилась.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Unsubscribed,
    Shutdown,
    QueueClosed,
}

/// Регистрация обработчика на subject: сторона производителя.
///
/// Живёт в реестре шарда и в [`Subscription`]; сам обработчик принадлежит
/// задаче [`Worker`].
pub(crate) struct Subscriber<M> {
    id: u64,
    subject: Arc<str>,
    queue: mpsc::Sender<M>,
    done: watch::Sender<bool>,
}

/// Задача обработки сообщений одного подписчика.
pub(crate) struct Worker<M> {
    id: u64,
    subject: Arc<str>,
    handler: Handler<M>,
    queue: mpsc::Receiver<M>,
    done: watch::Receiver<bool>,
    shutdown: watch::Receiver<bool>,
    handler_timeout: Duration,
    metrics: Arc<Metrics>,
}

/// Дескриптор подписки, возвращаемый `subscribe`.
///
/// Падение дескриптора подписку не отменяет: она живёт до явного
/// [`unsubscribe`](Subscription::unsubscribe) или закрытия брокера.
pub struct Subscription<M> {
    subscriber: Arc<Subscriber<M>>,
    broker: Weak<BrokerInner<M>>,
    unsubscribed: AtomicBool,
}

////////////////////////////////////////////////////////////////////////////////
// Subscriber
////////////////////////////////////////////////////////////////////////////////

impl<M> Subscriber<M> {
    /// Создаёт пару (подписчик, задача). Задачу запускает брокер.
    pub(crate) fn new(
        id: u64,
        subject: Arc<str>,
        handler: Handler<M>,
        capacity: usize,
        shutdown: watch::Receiver<bool>,
        handler_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> (Arc<Self>, Worker<M>) {
        let (queue_tx, queue_rx) = mpsc::channel(capacity);
        let (done_tx, done_rx) = watch::channel(false);

        let subscriber = Arc::new(Self {
            id,
            subject: subject.clone(),
            queue: queue_tx,
            done: done_tx,
        });
        let worker = Worker {
            id,
            subject,
            handler,
            queue: queue_rx,
            done: done_rx,
            shutdown,
            handler_timeout,
            metrics,
        };
        (subscriber, worker)
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn subject(&self) -> &Arc<str> {
        &self.subject
    }

    /// Неблокирующая постановка в очередь.
    pub(crate) fn try_deliver(
        &self,
        msg: M,
    ) -> Delivery {
        match self.queue.try_send(msg) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Gone,
        }
    }

    /// Взводит done-сигнал. Повторный вызов ничего не меняет.
    pub(crate) fn stop(&self) {
        self.done.send_replace(true);
    }
}

////////////////////////////////////////////////////////////////////////////////
// Worker
////////////////////////////////////////////////////////////////////////////////

impl<M: Send + 'static> Worker<M> {
    /// Основной цикл: сообщение, done или shutdown — что наступит первым.
    ///
    /// Сигналы остановки проверяются раньше очереди, поэтому после отписки
    /// или закрытия брокера недоставленные сообщения отбрасываются.
    pub(crate) async fn run(mut self) {
        debug!(subject = %self.subject, id = self.id, "subscriber started");

        let reason = loop {
            let msg = tokio::select! {
                biased;
                _ = signalled(&mut self.done) => break StopReason::Unsubscribed,
                _ = signalled(&mut self.shutdown) => break StopReason::Shutdown,
                msg = self.queue.recv() => match msg {
                    Some(msg) => msg,
                    None => break StopReason::QueueClosed,
                },
            };

            if let ControlFlow::Break(reason) = self.dispatch(msg).await {
                break reason;
            }
        };

        // Больше ничего не принимаем; оставшееся в очереди отбрасывается.
        self.queue.close();
        debug!(
            subject = %self.subject,
            id = self.id,
            reason = ?reason,
            discarded = self.queue.len(),
            "subscriber stopped"
        );
    }

    /// Вызывает обработчик в отдельном потоке и ждёт его не дольше
    /// `handler_timeout`.
    ///
    /// По таймауту обработчик не прерывается: его поток продолжает работу
    /// сам по себе, а задача переходит к следующему сообщению.
    async fn dispatch(
        &mut self,
        msg: M,
    ) -> ControlFlow<StopReason> {
        let handler = Arc::clone(&self.handler);
        let (finished_tx, mut finished_rx) = oneshot::channel();

        let spawned = thread::Builder::new()
            .name(format!("subpub-handler-{}", self.id))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(msg)));
                // получатель пропадает, если задача уже ушла по таймауту
                let _ = finished_tx.send(outcome.is_ok());
            });
        if let Err(err) = spawned {
            error!(
                subject = %self.subject,
                id = self.id,
                error = %err,
                "failed to spawn handler thread"
            );
            return ControlFlow::Continue(());
        }

        let deadline = tokio::time::sleep(self.handler_timeout);

        tokio::select! {
            biased;
            res = &mut finished_rx => {
                // без ответа поток мог завершиться только паникой
                if !res.unwrap_or(false) {
                    self.metrics.record_panic();
                    error!(subject = %self.subject, id = self.id, "handler panicked");
                }
                trace!(subject = %self.subject, id = self.id, "message handled");
                ControlFlow::Continue(())
            }
            _ = deadline => {
                self.metrics.record_timeout();
                warn!(
                    subject = %self.subject,
                    id = self.id,
                    timeout = ?self.handler_timeout,
                    "handler timed out"
                );
                ControlFlow::Continue(())
            }
            _ = signalled(&mut self.done) => ControlFlow::Break(StopReason::Unsubscribed),
            _ = signalled(&mut self.shutdown) => ControlFlow::Break(StopReason::Shutdown),
        }
    }
}

/// Ждёт, пока сигнал станет `true`. Пропавший отправитель тоже считается
/// сигналом: брокер или подписчик уже уничтожены.
async fn signalled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|fired| *fired).await;
}

////////////////////////////////////////////////////////////////////////////////
// Subscription
////////////////////////////////////////////////////////////////////////////////

impl<M> Subscription<M> {
    pub(crate) fn new(
        subscriber: Arc<Subscriber<M>>,
        broker: Weak<BrokerInner<M>>,
    ) -> Self {
        Self {
            subscriber,
            broker,
            unsubscribed: AtomicBool::new(false),
        }
    }

    /// Subject, на который оформлена подписка.
    pub fn subject(&self) -> &str {
        self.subscriber.subject()
    }

    /// Уникальный в пределах брокера номер подписки.
    pub fn id(&self) -> u64 {
        self.subscriber.id()
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.unsubscribed.load(Ordering::Acquire)
    }

    /// Удаляет подписчика из реестра и останавливает его задачу.
    ///
    /// Выполняется ровно один раз; повторные вызовы ничего не делают. Если
    /// брокер уже закрыт, задача и так остановлена его сигналом.
    pub fn unsubscribe(&self) {
        if self.unsubscribed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(broker) = self.broker.upgrade() {
            broker.unregister(&self.subscriber);
        }
    }
}

impl<M> fmt::Debug for Subscription<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .field("subject", &self.subject())
            .field("unsubscribed", &self.is_unsubscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::timeout;
    use tracing::instrument::WithSubscriber;
    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;
    use crate::logging::sinks::{json_layer, BufferWriter};

    fn noop<M>() -> Handler<M> {
        Arc::new(|_| {})
    }

    fn subscriber_with(
        capacity: usize,
        handler: Handler<u32>,
        handler_timeout: Duration,
    ) -> (Arc<Subscriber<u32>>, Worker<u32>, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (sub, worker) = Subscriber::new(
            1,
            Arc::from("test"),
            handler,
            capacity,
            shutdown_rx,
            handler_timeout,
            Arc::new(Metrics::default()),
        );
        (sub, worker, shutdown_tx)
    }

    /// Тест проверяет, что при полной очереди сообщение отбрасывается,
    /// а не блокирует отправителя.
    #[test]
    fn test_try_deliver_full_queue() {
        let (sub, _worker, _shutdown) = subscriber_with(2, noop(), Duration::from_secs(1));
        assert_eq!(sub.try_deliver(1), Delivery::Queued);
        assert_eq!(sub.try_deliver(2), Delivery::Queued);
        assert_eq!(sub.try_deliver(3), Delivery::Full);
    }

    /// После завершения задачи очередь закрыта для производителей.
    #[tokio::test]
    async fn test_try_deliver_after_worker_stopped() {
        let (sub, worker, _shutdown) = subscriber_with(2, noop(), Duration::from_secs(1));
        sub.stop();
        worker.run().await;
        assert_eq!(sub.try_deliver(1), Delivery::Gone);
    }

    /// Сообщения, поставленные до остановки, отбрасываются: сигнал
    /// проверяется раньше очереди.
    #[tokio::test]
    async fn test_stop_discards_queued_messages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_handler = seen.clone();
        let handler: Handler<u32> = Arc::new(move |m| seen_handler.lock().unwrap().push(m));

        let (sub, worker, _shutdown) = subscriber_with(8, handler, Duration::from_secs(1));
        for i in 0..5 {
            assert_eq!(sub.try_deliver(i), Delivery::Queued);
        }
        sub.stop();

        timeout(Duration::from_secs(1), worker.run())
            .await
            .expect("worker must stop promptly");
        assert!(seen.lock().unwrap().is_empty());
    }

    /// Задача останавливается по сигналу shutdown брокера.
    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let (_sub, worker, shutdown) = subscriber_with(4, noop(), Duration::from_secs(1));
        let task = tokio::spawn(worker.run());
        shutdown.send_replace(true);
        timeout(Duration::from_secs(1), task)
            .await
            .expect("worker must observe shutdown")
            .unwrap();
    }

    /// Пропажа отправителя shutdown-сигнала тоже останавливает задачу.
    #[tokio::test]
    async fn test_worker_stops_when_shutdown_sender_dropped() {
        let (_sub, worker, shutdown) = subscriber_with(4, noop(), Duration::from_secs(1));
        drop(shutdown);
        timeout(Duration::from_secs(1), worker.run())
            .await
            .expect("worker must stop");
    }

    /// Паника обработчика учитывается, но задача продолжает работу.
    #[tokio::test]
    async fn test_handler_panic_does_not_stop_worker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler: Handler<u32> = Arc::new(move |m| {
            if m == 0 {
                panic!("boom");
            }
            let _ = tx.send(m);
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let metrics = Arc::new(Metrics::default());
        let (sub, worker) = Subscriber::new(
            7,
            Arc::from("panics"),
            handler,
            4,
            shutdown_rx,
            Duration::from_secs(1),
            metrics.clone(),
        );
        let task = tokio::spawn(worker.run());

        sub.try_deliver(0);
        sub.try_deliver(1);
        let got = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("second message must arrive");
        assert_eq!(got, Some(1));
        assert_eq!(metrics.snapshot(0).handler_panics, 1);

        shutdown_tx.send_replace(true);
        task.await.unwrap();
    }

    /// Таймаут обработчика пишется в журнал как длительность целиком.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_logged_with_duration() {
        let buffer = BufferWriter::default();
        let subscriber = Registry::default().with(json_layer(buffer.clone(), false));

        let handler: Handler<u32> = Arc::new(|_| std::thread::sleep(Duration::from_millis(200)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let metrics = Arc::new(Metrics::default());
        let (sub, worker) = Subscriber::new(
            3,
            Arc::from("slow"),
            handler,
            4,
            shutdown_rx,
            Duration::from_millis(20),
            metrics.clone(),
        );
        let task = tokio::spawn(worker.run().with_subscriber(subscriber));

        sub.try_deliver(1);
        timeout(Duration::from_secs(2), async {
            while metrics.snapshot(0).handler_timeouts == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("handler did not time out");

        shutdown_tx.send_replace(true);
        task.await.unwrap();

        let lines = buffer.lines();
        let line = lines
            .iter()
            .find(|line| line["fields"]["message"] == "handler timed out")
            .expect("timeout was not logged");
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["fields"]["timeout"], "20ms");
        assert_eq!(line["fields"]["subject"], "slow");
    }
}
