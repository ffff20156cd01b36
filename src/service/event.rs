use serde::{Deserialize, Serialize};

/// Конверт сообщения сервисного слоя.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub data: String,
}

impl Event {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}
