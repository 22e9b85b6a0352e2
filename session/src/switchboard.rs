//! In-memory rendezvous service.
//!
//! The production system talks to a hosted broker that only does two
//! things: assign a session identity and notify a peer of an inbound
//! channel. This switchboard implements exactly that capability over
//! process-local channels, which is enough to exercise the whole session
//! stack without a network. Test controls (`black_hole`, `set_online`,
//! `drop_peer`, `refuse_registrations`) simulate the broker's failure
//! modes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use shared::codes::generate_id;
use shared::SessionId;

/// One end of an open channel. Text frames only; the connection manager
/// speaks JSON envelopes over it.
pub struct Link {
    pub tx: mpsc::UnboundedSender<String>,
    pub rx: mpsc::UnboundedReceiver<String>,
}

/// Events delivered to a registered peer.
pub enum SwitchEvent {
    /// A remote peer opened a channel to us.
    Incoming { from: SessionId, link: Link },
    /// The signaling relationship itself was severed.
    Dropped,
}

struct PeerEntry {
    events: mpsc::UnboundedSender<SwitchEvent>,
    online: bool,
    black_holed: bool,
}

#[derive(Default)]
struct Inner {
    peers: HashMap<SessionId, PeerEntry>,
    refuse_registrations: bool,
}

#[derive(Clone, Default)]
pub struct Switchboard {
    inner: Arc<Mutex<Inner>>,
}

enum Reach {
    Deliver(mpsc::UnboundedSender<SwitchEvent>),
    Silent,
    Unreachable,
}

impl Switchboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Assign a fresh session identity and the event stream it will receive
    /// inbound channels on.
    pub fn register(&self) -> Result<(SessionId, mpsc::UnboundedReceiver<SwitchEvent>), String> {
        let mut inner = self.locked();
        if inner.refuse_registrations {
            return Err("registration refused".into());
        }
        let id = generate_id(&mut rand::thread_rng());
        let (tx, rx) = mpsc::unbounded_channel();
        inner.peers.insert(
            id.clone(),
            PeerEntry {
                events: tx,
                online: true,
                black_holed: false,
            },
        );
        Ok((id, rx))
    }

    pub fn deregister(&self, id: &str) {
        self.locked().peers.remove(id);
    }

    /// Open a channel from `from` to `to`, handing the caller its half once
    /// the target has been notified. Returns `None` for unknown or offline
    /// targets. A black-holed target never answers at all, so callers must
    /// race this future against a timeout.
    pub async fn open(&self, from: &SessionId, to: &str) -> Option<Link> {
        let reach = {
            let inner = self.locked();
            match inner.peers.get(to) {
                Some(entry) if entry.black_holed => Reach::Silent,
                Some(entry) if entry.online => Reach::Deliver(entry.events.clone()),
                _ => Reach::Unreachable,
            }
        };
        let target = match reach {
            Reach::Deliver(target) => target,
            Reach::Unreachable => return None,
            Reach::Silent => {
                let () = std::future::pending().await;
                return None;
            }
        };

        let (caller_tx, target_rx) = mpsc::unbounded_channel();
        let (target_tx, caller_rx) = mpsc::unbounded_channel();
        target
            .send(SwitchEvent::Incoming {
                from: from.clone(),
                link: Link {
                    tx: target_tx,
                    rx: target_rx,
                },
            })
            .ok()?;
        Some(Link {
            tx: caller_tx,
            rx: caller_rx,
        })
    }

    /// Mark a peer unreachable (or reachable again) for future opens.
    pub fn set_online(&self, id: &str, online: bool) {
        if let Some(entry) = self.locked().peers.get_mut(id) {
            entry.online = online;
        }
    }

    /// Make opens toward this peer hang forever instead of failing fast.
    pub fn black_hole(&self, id: &str) {
        if let Some(entry) = self.locked().peers.get_mut(id) {
            entry.black_holed = true;
        }
    }

    /// Sever the signaling relationship with a peer, as a broker outage
    /// would. The peer is told before its registration is discarded.
    pub fn drop_peer(&self, id: &str) {
        let entry = self.locked().peers.remove(id);
        if let Some(entry) = entry {
            let _ = entry.events.send(SwitchEvent::Dropped);
        }
    }

    /// Refuse all future `register` calls, simulating a broker outage.
    pub fn refuse_registrations(&self, refuse: bool) {
        self.locked().refuse_registrations = refuse;
    }
}
