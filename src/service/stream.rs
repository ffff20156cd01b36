use tokio::sync::mpsc::{self, error::TryRecvError};

use super::Event;

/// Поток событий одной подписки сервисного слоя.
///
/// Падение потока отменяет подписку в брокере. Поток заканчивается
/// (`recv` возвращает `None`), когда сервис останавливается или брокер
/// закрывается.
#[derive(Debug)]
pub struct EventStream {
    key: String,
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    pub(crate) fn new(
        key: impl Into<String>,
        rx: mpsc::Receiver<Event>,
    ) -> Self {
        Self {
            key: key.into(),
            rx,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Следующее событие или `None`, если поток завершён.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.rx.try_recv()
    }
}
