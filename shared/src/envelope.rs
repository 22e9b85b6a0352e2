//! Wire protocol for peer-to-peer messaging.
//!
//! Every message travels as an [`Envelope`]: a JSON object with keys
//! `type`, `senderId`, `timestamp` and `payload`. The body is the
//! adjacently-tagged [`Message`] enum, which gives a closed vocabulary of
//! message types with a concrete payload schema per type, so inbound
//! handling is exhaustiveness-checked at compile time.
//!
//! The timestamp is a display/ordering hint stamped at send time, never a
//! trust boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codes::timestamp_millis;
use crate::room::{Room, RoomPlayer};
use crate::SessionId;

/// Closed set of message types, used as the dispatch key for subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    JoinRequest,
    JoinAccepted,
    JoinRejected,
    PlayerJoined,
    PlayerLeft,
    PlayerReady,
    PlayerUnready,
    GameStart,
    GameState,
    GameAction,
    Chat,
    Ping,
    Pong,
    Kick,
    RoomUpdate,
    SyncRequest,
    SyncResponse,
}

/// A typed message body. Serializes as `"type"` + `"payload"` on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Message {
    /// Guest asks the host for a seat. `od_id` is the durable identity used
    /// for dedup and rejoin; the ephemeral peer id rides on the envelope.
    JoinRequest {
        #[serde(rename = "odId")]
        od_id: String,
        nickname: String,
        avatar: String,
    },
    /// Host grants a seat and hands over the full room snapshot.
    JoinAccepted { room: Room },
    /// Host refuses a seat.
    JoinRejected { reason: String },
    /// Informational: a player took a seat (roster sync follows as `room_update`).
    PlayerJoined { player: RoomPlayer },
    /// Guest announces a voluntary leave.
    PlayerLeft {
        #[serde(rename = "odId")]
        od_id: String,
    },
    PlayerReady {
        #[serde(rename = "odId")]
        od_id: String,
    },
    PlayerUnready {
        #[serde(rename = "odId")]
        od_id: String,
    },
    /// Host starts the game, carrying the initial authoritative state.
    GameStart { room: Room, state: Value },
    /// Authoritative game state after a validated move.
    GameState { state: Value },
    /// Move intent from a player. The host validates before applying.
    GameAction { action: Value },
    Chat { nickname: String, text: String },
    Ping {},
    Pong {},
    Kick {
        #[serde(rename = "odId")]
        od_id: String,
        reason: String,
    },
    /// Full room snapshot; non-host peers replace their cache wholesale.
    RoomUpdate { room: Room },
    /// Reconnecting guest asks for a full resync.
    SyncRequest {},
    SyncResponse {
        room: Room,
        state: Option<Value>,
    },
}

impl Message {
    /// Dispatch key for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::JoinRequest { .. } => MessageType::JoinRequest,
            Message::JoinAccepted { .. } => MessageType::JoinAccepted,
            Message::JoinRejected { .. } => MessageType::JoinRejected,
            Message::PlayerJoined { .. } => MessageType::PlayerJoined,
            Message::PlayerLeft { .. } => MessageType::PlayerLeft,
            Message::PlayerReady { .. } => MessageType::PlayerReady,
            Message::PlayerUnready { .. } => MessageType::PlayerUnready,
            Message::GameStart { .. } => MessageType::GameStart,
            Message::GameState { .. } => MessageType::GameState,
            Message::GameAction { .. } => MessageType::GameAction,
            Message::Chat { .. } => MessageType::Chat,
            Message::Ping {} => MessageType::Ping,
            Message::Pong {} => MessageType::Pong,
            Message::Kick { .. } => MessageType::Kick,
            Message::RoomUpdate { .. } => MessageType::RoomUpdate,
            Message::SyncRequest {} => MessageType::SyncRequest,
            Message::SyncResponse { .. } => MessageType::SyncResponse,
        }
    }
}

/// The wire wrapper around every message. Immutable once sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub body: Message,
    #[serde(rename = "senderId")]
    pub sender_id: SessionId,
    /// Send time in epoch milliseconds.
    pub timestamp: u64,
}

impl Envelope {
    /// Wrap a body, stamping the sender identity and the current time.
    pub fn new(body: Message, sender_id: SessionId) -> Self {
        Envelope {
            body,
            sender_id,
            timestamp: timestamp_millis(),
        }
    }
}
