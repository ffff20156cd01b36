use std::sync::atomic::{AtomicU64, Ordering};

/// Счётчики брокера. Все операции `Relaxed`: значения приблизительные
/// и нужны только для наблюдения.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    handler_timeouts: AtomicU64,
    handler_panics: AtomicU64,
}

/// Снимок статистики брокера.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Успешные вызовы `publish` (включая частично переполненные).
    pub published: u64,
    /// Сообщения, поставленные в очереди подписчиков.
    pub delivered: u64,
    /// Сообщения, отброшенные из-за полной очереди.
    pub dropped: u64,
    /// Обработчики, не уложившиеся в таймаут.
    pub handler_timeouts: u64,
    /// Обработчики, завершившиеся паникой.
    pub handler_panics: u64,
    /// Подписчики, зарегистрированные в реестре.
    pub active_subscribers: usize,
}

impl Metrics {
    pub(crate) fn record_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.handler_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panic(&self) {
        self.handler_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        active_subscribers: usize,
    ) -> BrokerStats {
        BrokerStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            handler_timeouts: self.handler_timeouts.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
            active_subscribers,
        }
    }
}
