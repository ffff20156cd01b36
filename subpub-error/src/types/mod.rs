pub mod pubsub;
pub mod service;

// Публичный экспорт всех типов ошибок из вложенных модулей.
pub use pubsub::*;
pub use service::*;
