//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Внутрипроцессный брокер: производители публикуют сообщения с
//! subject-строкой, подписчики получают их асинхронно, каждый в своей
//! задаче и со своей ограниченной очередью.
//!
//! - `broker`: реестр, публикация, закрытие.
//! - `config`: параметры брокера.
//! - `shard` (приватный): фрагменты реестра и выбор шарда по хэшу subject.
//! - `stats`: счётчики и их снимок.
//! - `subscriber`: задача обработки сообщений и дескриптор подписки.

pub mod broker;
pub mod config;
mod shard;
pub mod stats;
pub mod subscriber;

pub use broker::Broker;
pub use config::*;
pub use stats::BrokerStats;
pub use subscriber::{Handler, Subscription};
