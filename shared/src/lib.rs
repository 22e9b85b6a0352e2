pub mod codes;
pub mod envelope;
pub mod game;
pub mod games;
pub mod room;

/// Ephemeral address assigned to a running client by the rendezvous service.
/// Opaque to everything except the switchboard that minted it.
pub type SessionId = String;
