use std::io::{self, Stdout};

use tracing_subscriber::{registry::LookupSpan, Layer};

use super::json_layer;

/// JSON в stdout (окружение dev).
pub fn layer<S>() -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    json_layer(io::stdout as fn() -> Stdout, false)
}
