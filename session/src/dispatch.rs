//! Two-tier envelope dispatch.
//!
//! Subscribers register per [`MessageType`] and are invoked in registration
//! order. A single optional global handler (owned by the connection
//! manager) sees every envelope first. Handlers are cloned out of the lock
//! before they run, so a handler may freely subscribe or unsubscribe
//! without deadlocking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use shared::envelope::{Envelope, MessageType};

pub type EnvelopeHandler = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Disposer token returned by `subscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct Inner {
    next_id: u64,
    by_type: HashMap<MessageType, Vec<(HandlerId, EnvelopeHandler)>>,
}

#[derive(Default)]
pub struct Dispatcher {
    inner: Mutex<Inner>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self, message_type: MessageType, handler: EnvelopeHandler) -> HandlerId {
        let mut inner = self.locked();
        inner.next_id += 1;
        let id = HandlerId(inner.next_id);
        inner.by_type.entry(message_type).or_default().push((id, handler));
        id
    }

    /// Idempotent: unsubscribing an unknown or already-removed id is a no-op.
    pub fn unsubscribe(&self, id: HandlerId) {
        let mut inner = self.locked();
        for handlers in inner.by_type.values_mut() {
            handlers.retain(|(h, _)| *h != id);
        }
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.locked().by_type.clear();
    }

    /// Invoke all subscribers for the envelope's type, in registration order.
    pub fn dispatch(&self, envelope: &Envelope) {
        let handlers: Vec<EnvelopeHandler> = {
            let inner = self.locked();
            inner
                .by_type
                .get(&envelope.body.message_type())
                .map(|hs| hs.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            handler(envelope);
        }
    }
}
