//! Peer session layer: signaling bootstrap, connection lifecycle, typed
//! message dispatch and the host-authoritative room coordinator.
//!
//! The stack is layered bottom-up. [`switchboard::Switchboard`] plays the
//! rendezvous service: it assigns session identities and brokers channel
//! opens. [`connection::ConnectionManager`] owns the local identity and the
//! per-peer channels. [`dispatch::Dispatcher`] routes inbound envelopes to
//! subscribers. [`room::HostRoom`] and [`room::GuestRoom`] implement the
//! lobby protocol on top.

pub mod connection;
pub mod dispatch;
pub mod room;
pub mod switchboard;

pub use connection::{ConnectionManager, ManagerState, SessionError, SessionHandlers};
pub use dispatch::HandlerId;
pub use room::{GuestRoom, HostRoom, PlayerProfile, RoomEvent};
pub use switchboard::{Link, SwitchEvent, Switchboard};
