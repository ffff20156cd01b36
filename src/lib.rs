/// Port traits and the logging decorator over the broker.
pub mod application;
/// Process settings: config file, environment overrides, durations.
pub mod config;
/// Process-level errors plus re-exports of the `subpub-error` crate.
pub mod error;
/// Logging setup (JSON layers, filters, file writer).
pub mod logging;
/// Pub/Sub: Broker, Subscription, shards and subscriber tasks.
pub mod pubsub;
/// Key-based subscribe/publish service over any broker.
pub mod service;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Broker port and decorator.
pub use application::{EventBus, LoggedSubscription, PubSub, Unsubscribe};
/// Settings.
pub use config::{Env, Settings};
/// Operation errors and result types.
pub use error::{
    ConfigError, ErrorExt, LogLevel, LoggingError, PubSubError, ResultExt, ServiceError,
    StackError, StatusCode,
};
/// Pub/Sub API.
pub use pubsub::{Broker, BrokerConfig, BrokerStats, Handler, Subscription};
/// Service layer.
pub use service::{Event, EventStream, PubSubService};
