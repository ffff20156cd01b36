//! Прикладной слой: порт pub/sub и декораторы над ним.

pub mod eventbus;
pub mod pubsub_port;

pub use eventbus::{EventBus, LoggedSubscription};
pub use pubsub_port::{PubSub, Unsubscribe};
