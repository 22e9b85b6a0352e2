//! Connection lifecycle and message transport.
//!
//! A [`ConnectionManager`] owns the local session identity, the map of
//! open channels keyed by remote identity, and the dispatcher that routes
//! inbound envelopes. It is an explicitly constructed object, not a
//! singleton: tests run several isolated managers against one switchboard.
//!
//! Signaling loss triggers a bounded reconnection loop (delay grows
//! linearly with the attempt number). Channel loss only removes that one
//! channel and fires `on_disconnection`; the rest of the manager keeps
//! running.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use shared::envelope::{Envelope, Message, MessageType};
use shared::SessionId;

use crate::dispatch::{Dispatcher, EnvelopeHandler, HandlerId};
use crate::switchboard::{Link, SwitchEvent, Switchboard};

/// Reconnection gives up for good after this many attempts.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RECONNECT_BASE: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum SessionError {
    /// The rendezvous service failed us.
    Signaling(String),
    /// An outbound connect went unanswered within the timeout.
    ConnectionTimeout(SessionId),
    /// The target is unknown to the rendezvous service or offline.
    PeerUnreachable(SessionId),
    /// The manager has no session identity yet.
    NotInitialized,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Signaling(msg) => write!(f, "signaling failure: {msg}"),
            SessionError::ConnectionTimeout(peer) => {
                write!(f, "connection to {peer} timed out")
            }
            SessionError::PeerUnreachable(peer) => write!(f, "peer {peer} is unreachable"),
            SessionError::NotInitialized => write!(f, "session is not initialized"),
        }
    }
}

impl Error for SessionError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

pub type PeerCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&SessionError) + Send + Sync>;

/// Lifecycle callbacks handed to [`ConnectionManager::initialize`].
#[derive(Clone, Default)]
pub struct SessionHandlers {
    /// Session identity obtained (also fires after a successful reconnect).
    pub on_open: Option<PeerCallback>,
    /// A channel to a peer opened, inbound or outbound.
    pub on_connection: Option<PeerCallback>,
    /// A channel to a peer closed.
    pub on_disconnection: Option<PeerCallback>,
    /// Unrecoverable failures that do not reject a pending call.
    pub on_error: Option<ErrorCallback>,
    /// Sees every inbound envelope before the per-type subscribers.
    pub on_envelope: Option<EnvelopeHandler>,
}

struct PeerLink {
    tx: mpsc::UnboundedSender<String>,
    /// Guards reader tasks against acting for a superseded channel.
    generation: u64,
}

struct Inner {
    state: ManagerState,
    session_id: Option<SessionId>,
    peers: HashMap<SessionId, PeerLink>,
    handlers: SessionHandlers,
    /// Bumped by `initialize` and `cleanup`; stale pump and reconnect
    /// tasks compare against it and bail out.
    epoch: u64,
    next_generation: u64,
}

pub struct ConnectionManager {
    switchboard: Switchboard,
    dispatcher: Dispatcher,
    inner: Mutex<Inner>,
    connect_timeout: Duration,
    reconnect_base: Duration,
}

impl ConnectionManager {
    pub fn new(switchboard: Switchboard) -> Arc<Self> {
        Self::with_timings(switchboard, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_BASE)
    }

    pub fn with_timings(
        switchboard: Switchboard,
        connect_timeout: Duration,
        reconnect_base: Duration,
    ) -> Arc<Self> {
        Arc::new(ConnectionManager {
            switchboard,
            dispatcher: Dispatcher::new(),
            inner: Mutex::new(Inner {
                state: ManagerState::Disconnected,
                session_id: None,
                peers: HashMap::new(),
                handlers: SessionHandlers::default(),
                epoch: 0,
                next_generation: 0,
            }),
            connect_timeout,
            reconnect_base,
        })
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> ManagerState {
        self.locked().state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.locked().session_id.clone()
    }

    fn epoch(&self) -> u64 {
        self.locked().epoch
    }

    /// Open peer identities, for diagnostics and tests.
    pub fn connected_peers(&self) -> Vec<SessionId> {
        self.locked().peers.keys().cloned().collect()
    }

    /// Obtain a session identity. Idempotent: when already connected the
    /// existing identity is returned and nothing is re-negotiated. A fresh
    /// call cancels any reconnection loop still pending.
    pub async fn initialize(
        self: &Arc<Self>,
        handlers: SessionHandlers,
    ) -> Result<SessionId, SessionError> {
        let epoch = {
            let mut inner = self.locked();
            if inner.state == ManagerState::Connected {
                if let Some(id) = inner.session_id.clone() {
                    return Ok(id);
                }
            }
            inner.handlers = handlers;
            inner.epoch += 1;
            inner.state = ManagerState::Connecting;
            inner.epoch
        };

        let (id, events) = match self.switchboard.register() {
            Ok(registered) => registered,
            Err(err) => {
                self.locked().state = ManagerState::Error;
                return Err(SessionError::Signaling(err));
            }
        };

        let on_open = {
            let mut inner = self.locked();
            inner.session_id = Some(id.clone());
            inner.state = ManagerState::Connected;
            inner.handlers.on_open.clone()
        };
        self.spawn_event_pump(events, epoch);
        info!("session established as {id}");
        if let Some(cb) = on_open {
            cb(&id);
        }
        Ok(id)
    }

    /// Replace the lifecycle handlers without touching connections.
    pub fn set_handlers(&self, handlers: SessionHandlers) {
        self.locked().handlers = handlers;
    }

    /// Replace only the disconnection hook, keeping the other callbacks.
    pub fn set_on_disconnection(&self, handler: Option<PeerCallback>) {
        self.locked().handlers.on_disconnection = handler;
    }

    /// Open a channel to `remote`. A no-op success if one is already open.
    pub async fn connect_to_peer(self: &Arc<Self>, remote: &str) -> Result<(), SessionError> {
        let my_id = {
            let inner = self.locked();
            if inner.state != ManagerState::Connected {
                return Err(SessionError::NotInitialized);
            }
            if inner.peers.contains_key(remote) {
                return Ok(());
            }
            inner
                .session_id
                .clone()
                .ok_or(SessionError::NotInitialized)?
        };

        let open = self.switchboard.open(&my_id, remote);
        match tokio::time::timeout(self.connect_timeout, open).await {
            Err(_) => Err(SessionError::ConnectionTimeout(remote.to_string())),
            Ok(None) => Err(SessionError::PeerUnreachable(remote.to_string())),
            Ok(Some(link)) => {
                self.adopt_link(remote.to_string(), link);
                Ok(())
            }
        }
    }

    /// Send one message to one peer. Returns false, never throws, when no
    /// open channel exists; the caller decides whether that is fatal.
    pub fn send(&self, remote: &str, body: Message) -> bool {
        let (tx, envelope) = {
            let inner = self.locked();
            let Some(id) = inner.session_id.clone() else {
                return false;
            };
            let Some(link) = inner.peers.get(remote) else {
                return false;
            };
            (link.tx.clone(), Envelope::new(body, id))
        };
        match serde_json::to_string(&envelope) {
            Ok(text) => tx.send(text).is_ok(),
            Err(err) => {
                warn!("unserializable outbound message: {err}");
                false
            }
        }
    }

    /// Best-effort fan-out to every open channel except `exclude`.
    pub fn broadcast(&self, body: Message, exclude: Option<&str>) {
        let (targets, envelope) = {
            let inner = self.locked();
            let Some(id) = inner.session_id.clone() else {
                return;
            };
            let targets: Vec<_> = inner
                .peers
                .iter()
                .filter(|(peer, _)| exclude != Some(peer.as_str()))
                .map(|(_, link)| link.tx.clone())
                .collect();
            (targets, Envelope::new(body, id))
        };
        let text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(err) => {
                warn!("unserializable broadcast: {err}");
                return;
            }
        };
        for tx in targets {
            let _ = tx.send(text.clone());
        }
    }

    /// Subscribe to one message type. Multiple independent subscribers per
    /// type are supported; the returned id unsubscribes.
    pub fn on_message<F>(&self, message_type: MessageType, handler: F) -> HandlerId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(message_type, Arc::new(handler))
    }

    pub fn off(&self, id: HandlerId) {
        self.dispatcher.unsubscribe(id);
    }

    /// Close the channel to one peer. Fires `on_disconnection` if a channel
    /// actually existed.
    pub fn disconnect_peer(&self, remote: &str) {
        let on_disconnection = {
            let mut inner = self.locked();
            if inner.peers.remove(remote).is_none() {
                return;
            }
            inner.handlers.on_disconnection.clone()
        };
        debug!("closed channel to {remote}");
        if let Some(cb) = on_disconnection {
            cb(remote);
        }
    }

    /// Release the identity and all channels. The manager can be
    /// re-initialized afterwards; message subscriptions survive.
    pub fn cleanup(&self) {
        let id = {
            let mut inner = self.locked();
            inner.epoch += 1;
            inner.state = ManagerState::Disconnected;
            inner.peers.clear();
            inner.session_id.take()
        };
        if let Some(id) = id {
            self.switchboard.deregister(&id);
        }
    }

    /// `cleanup` plus dropping every handler registration.
    pub fn destroy(&self) {
        self.cleanup();
        self.dispatcher.clear();
        self.locked().handlers = SessionHandlers::default();
    }

    fn spawn_event_pump(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<SwitchEvent>,
        epoch: u64,
    ) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if manager.epoch() != epoch {
                    return;
                }
                match event {
                    SwitchEvent::Incoming { from, link } => {
                        debug!("inbound channel from {from}");
                        manager.adopt_link(from, link);
                    }
                    SwitchEvent::Dropped => {
                        warn!("signaling connection lost, scheduling reconnect");
                        manager.handle_signaling_drop(epoch);
                        return;
                    }
                }
            }
        });
    }

    /// Register a freshly opened channel and start its reader. Duplicate
    /// opens keep the existing channel.
    fn adopt_link(self: &Arc<Self>, peer: SessionId, link: Link) {
        let Link { tx, rx } = link;
        let (generation, on_connection) = {
            let mut inner = self.locked();
            if inner.peers.contains_key(&peer) {
                debug!("duplicate channel to {peer} ignored");
                return;
            }
            inner.next_generation += 1;
            let generation = inner.next_generation;
            inner.peers.insert(peer.clone(), PeerLink { tx, generation });
            (generation, inner.handlers.on_connection.clone())
        };
        self.spawn_reader(peer.clone(), rx, generation);
        if let Some(cb) = on_connection {
            cb(&peer);
        }
    }

    fn spawn_reader(
        self: &Arc<Self>,
        peer: SessionId,
        mut rx: mpsc::UnboundedReceiver<String>,
        generation: u64,
    ) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if !manager.link_is_current(&peer, generation) {
                    return;
                }
                match serde_json::from_str::<Envelope>(&text) {
                    Ok(envelope) => manager.dispatch_envelope(&envelope),
                    Err(err) => warn!("dropping malformed envelope from {peer}: {err}"),
                }
            }
            manager.reader_closed(&peer, generation);
        });
    }

    fn link_is_current(&self, peer: &str, generation: u64) -> bool {
        self.locked().peers.get(peer).map(|l| l.generation) == Some(generation)
    }

    fn dispatch_envelope(&self, envelope: &Envelope) {
        let global = self.locked().handlers.on_envelope.clone();
        if let Some(cb) = global {
            cb(envelope);
        }
        self.dispatcher.dispatch(envelope);
    }

    fn reader_closed(&self, peer: &str, generation: u64) {
        let on_disconnection = {
            let mut inner = self.locked();
            if inner.peers.get(peer).map(|l| l.generation) != Some(generation) {
                return;
            }
            inner.peers.remove(peer);
            inner.handlers.on_disconnection.clone()
        };
        debug!("channel to {peer} closed by remote");
        if let Some(cb) = on_disconnection {
            cb(peer);
        }
    }

    fn handle_signaling_drop(self: &Arc<Self>, epoch: u64) {
        {
            let mut inner = self.locked();
            if inner.epoch != epoch {
                return;
            }
            inner.state = ManagerState::Disconnected;
            inner.session_id = None;
        }
        self.spawn_reconnect(epoch);
    }

    fn spawn_reconnect(self: &Arc<Self>, epoch: u64) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
                tokio::time::sleep(manager.reconnect_base * attempt).await;
                if manager.epoch() != epoch {
                    return;
                }
                match manager.switchboard.register() {
                    Ok((id, events)) => {
                        let on_open = {
                            let mut inner = manager.locked();
                            if inner.epoch != epoch {
                                return;
                            }
                            inner.session_id = Some(id.clone());
                            inner.state = ManagerState::Connected;
                            inner.handlers.on_open.clone()
                        };
                        manager.spawn_event_pump(events, epoch);
                        info!("reconnected as {id} after {attempt} attempt(s)");
                        if let Some(cb) = on_open {
                            cb(&id);
                        }
                        return;
                    }
                    Err(err) => debug!("reconnect attempt {attempt} failed: {err}"),
                }
            }
            error!("giving up after {MAX_RECONNECT_ATTEMPTS} reconnect attempts");
            let on_error = manager.locked().handlers.on_error.clone();
            if let Some(cb) = on_error {
                cb(&SessionError::Signaling(
                    "reconnect attempts exhausted".into(),
                ));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_manager(board: &Switchboard) -> Arc<ConnectionManager> {
        ConnectionManager::with_timings(
            board.clone(),
            Duration::from_millis(50),
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let board = Switchboard::new();
        let manager = fast_manager(&board);
        let first = manager.initialize(SessionHandlers::default()).await.unwrap();
        let second = manager.initialize(SessionHandlers::default()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.state(), ManagerState::Connected);
    }

    #[tokio::test]
    async fn send_without_a_channel_returns_false() {
        let board = Switchboard::new();
        let manager = fast_manager(&board);
        manager.initialize(SessionHandlers::default()).await.unwrap();
        assert!(!manager.send("nobody", Message::Ping {}));
    }

    #[tokio::test]
    async fn connect_to_a_black_holed_peer_times_out() {
        let board = Switchboard::new();
        let manager = fast_manager(&board);
        manager.initialize(SessionHandlers::default()).await.unwrap();

        let other = fast_manager(&board);
        let other_id = other.initialize(SessionHandlers::default()).await.unwrap();
        board.black_hole(&other_id);

        let err = manager.connect_to_peer(&other_id).await.unwrap_err();
        assert!(matches!(err, SessionError::ConnectionTimeout(_)));
    }

    #[tokio::test]
    async fn messages_reach_type_subscribers_on_the_remote_side() {
        let board = Switchboard::new();
        let alice = fast_manager(&board);
        let bob = fast_manager(&board);
        alice.initialize(SessionHandlers::default()).await.unwrap();
        let bob_id = bob.initialize(SessionHandlers::default()).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        bob.on_message(MessageType::Chat, move |env| {
            let _ = tx.send(env.clone());
        });

        alice.connect_to_peer(&bob_id).await.unwrap();
        assert!(alice.send(
            &bob_id,
            Message::Chat {
                nickname: "Alice".into(),
                text: "hello".into(),
            },
        ));

        let env = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(env.sender_id, alice.session_id().unwrap());
    }

    #[tokio::test]
    async fn malformed_frames_do_not_stall_the_reader() {
        let board = Switchboard::new();
        let bob = fast_manager(&board);
        let bob_id = bob.initialize(SessionHandlers::default()).await.unwrap();

        let (raw_id, _events) = board.register().unwrap();
        let link = board.open(&raw_id, &bob_id).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        bob.on_message(MessageType::Ping, move |env| {
            let _ = tx.send(env.timestamp);
        });

        link.tx.send("this is not json".into()).unwrap();
        let good = Envelope::new(Message::Ping {}, raw_id.clone());
        link.tx.send(serde_json::to_string(&good).unwrap()).unwrap();

        let stamp = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stamp, good.timestamp);
    }

    #[tokio::test]
    async fn signaling_drop_triggers_reconnect_with_a_fresh_identity() {
        let board = Switchboard::new();
        let manager = fast_manager(&board);

        let opens = Arc::new(AtomicUsize::new(0));
        let handlers = SessionHandlers {
            on_open: Some({
                let opens = Arc::clone(&opens);
                Arc::new(move |_| {
                    opens.fetch_add(1, Ordering::SeqCst);
                })
            }),
            ..SessionHandlers::default()
        };
        let first = manager.initialize(handlers).await.unwrap();
        board.drop_peer(&first);

        tokio::time::timeout(Duration::from_secs(1), async {
            while opens.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        let second = manager.session_id().unwrap();
        assert_ne!(first, second);
        assert_eq!(manager.state(), ManagerState::Connected);
    }

    #[tokio::test]
    async fn swapping_the_disconnection_hook_keeps_the_other_handlers() {
        let board = Switchboard::new();
        let manager = fast_manager(&board);

        let opens = Arc::new(AtomicUsize::new(0));
        let handlers = SessionHandlers {
            on_open: Some({
                let opens = Arc::clone(&opens);
                Arc::new(move |_| {
                    opens.fetch_add(1, Ordering::SeqCst);
                })
            }),
            ..SessionHandlers::default()
        };
        let first = manager.initialize(handlers).await.unwrap();

        let drops = Arc::new(AtomicUsize::new(0));
        manager.set_on_disconnection(Some({
            let drops = Arc::clone(&drops);
            Arc::new(move |_| {
                drops.fetch_add(1, Ordering::SeqCst);
            })
        }));

        let other = fast_manager(&board);
        let other_id = other.initialize(SessionHandlers::default()).await.unwrap();
        manager.connect_to_peer(&other_id).await.unwrap();
        manager.disconnect_peer(&other_id);
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        // The open hook installed at initialize still fires on reconnect.
        board.drop_peer(&first);
        tokio::time::timeout(Duration::from_secs(1), async {
            while opens.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn cleanup_cancels_a_pending_reconnect() {
        let board = Switchboard::new();
        let manager = fast_manager(&board);
        let id = manager.initialize(SessionHandlers::default()).await.unwrap();
        board.drop_peer(&id);
        manager.cleanup();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.state(), ManagerState::Disconnected);
        assert!(manager.session_id().is_none());
    }
}
