//! Декоратор логирования над брокером.
//!
//! Оборачивает любой [`PubSub`], пишет в журнал каждую подписку, публикацию
//! и закрытие, а ошибки поднимает в [`StackError`] с именем операции в
//! контексте.

use std::{
    fmt,
    marker::PhantomData,
    sync::{Arc, Once},
    time::Instant,
};

use tracing::{debug, error, info, warn};

use super::{PubSub, Unsubscribe};
use crate::{pubsub::Handler, ErrorExt, LogLevel, PubSubError, ResultExt, StackError};

const OP_SUBSCRIBE: &str = "eventbus.subscribe";
const OP_PUBLISH: &str = "eventbus.publish";
const OP_CLOSE: &str = "eventbus.close";
const OP_UNSUBSCRIBE: &str = "eventbus.unsubscribe";

/// Брокер с журналированием операций.
pub struct EventBus<M, P> {
    inner: P,
    _message: PhantomData<fn(M)>,
}

/// Подписка, отмена которой попадает в журнал ровно один раз.
pub struct LoggedSubscription<S> {
    inner: S,
    subject: Arc<str>,
    once: Once,
}

impl<M, P> EventBus<M, P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            _message: PhantomData,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<S> LoggedSubscription<S> {
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl<M, P> PubSub<M> for EventBus<M, P>
where
    M: 'static,
    P: PubSub<M>,
    P::Error: ErrorExt,
{
    type Subscription = LoggedSubscription<P::Subscription>;
    type Error = StackError;

    fn subscribe(
        &self,
        subject: &str,
        handler: Handler<M>,
    ) -> Result<Self::Subscription, Self::Error> {
        if subject.is_empty() {
            return Err(PubSubError::empty_subject()).context(OP_SUBSCRIBE);
        }

        match self.inner.subscribe(subject, handler) {
            Ok(sub) => {
                info!(op = OP_SUBSCRIBE, subject, "subscribe created");
                Ok(LoggedSubscription {
                    inner: sub,
                    subject: Arc::from(subject),
                    once: Once::new(),
                })
            }
            Err(err) => {
                log_failure(OP_SUBSCRIBE, Some(subject), &err);
                Err(err).context(OP_SUBSCRIBE)
            }
        }
    }

    fn publish(
        &self,
        subject: &str,
        msg: M,
    ) -> Result<(), Self::Error> {
        if subject.is_empty() {
            return Err(PubSubError::empty_subject()).context(OP_PUBLISH);
        }

        if let Err(err) = self.inner.publish(subject, msg) {
            log_failure(OP_PUBLISH, Some(subject), &err);
            return Err(err).context(OP_PUBLISH);
        }
        debug!(op = OP_PUBLISH, subject, "message published");
        Ok(())
    }

    fn close(
        &self,
        deadline: Option<Instant>,
    ) -> Result<(), Self::Error> {
        info!(op = OP_CLOSE, "starting shutdown");
        let res = self.inner.close(deadline);
        if let Err(err) = &res {
            log_failure(OP_CLOSE, None, err);
        }
        info!(op = OP_CLOSE, "shutdown completed");
        res.context(OP_CLOSE)
    }
}

impl<S: Unsubscribe> Unsubscribe for LoggedSubscription<S> {
    fn unsubscribe(&self) {
        self.once.call_once(|| {
            info!(op = OP_UNSUBSCRIBE, subject = %self.subject, "starting unsubscribe");
            self.inner.unsubscribe();
            info!(op = OP_UNSUBSCRIBE, subject = %self.subject, "unsubscribe completed");
        });
    }
}

/// Пишет отказ операции с уровнем по статус-коду ошибки.
fn log_failure<E: ErrorExt>(
    op: &'static str,
    subject: Option<&str>,
    err: &E,
) {
    let code = err.status_code().code();
    match err.status_code().log_level() {
        LogLevel::Info => info!(op, subject, code, error = %err, "operation failed"),
        LogLevel::Warn => warn!(op, subject, code, error = %err, "operation failed"),
        LogLevel::Error => error!(op, subject, code, error = %err, "operation failed"),
    }
}

impl<M, P: fmt::Debug> fmt::Debug for EventBus<M, P> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("EventBus").field("inner", &self.inner).finish()
    }
}

impl<S> fmt::Debug for LoggedSubscription<S> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("LoggedSubscription")
            .field("subject", &self.subject)
            .field("unsubscribed", &self.once.is_completed())
            .finish()
    }
}
