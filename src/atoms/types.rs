// ── Readbot Atoms: Shared Types ────────────────────────────────────────────
// Lifecycle events, inbound message metadata and session descriptors.

use serde::{Deserialize, Serialize};

// ── Lifecycle Events ───────────────────────────────────────────────────────

/// Pairing material issued by the backend while the account is unlinked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingCode {
    /// Raw pairing payload (the string encoded in the QR code).
    pub payload: String,
    /// Pre-rendered QR image as a `data:image/...` URI, when the backend sends one.
    pub image: Option<String>,
}

/// An inbound WhatsApp message, reduced to what the bot needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Backend message ID (needed to mark it as read).
    pub id: String,
    /// Chat JID the message arrived in (`...@s.whatsapp.net` or `...@g.us`).
    pub chat_id: String,
    /// Sender phone number, without the JID suffix.
    pub sender: String,
    pub push_name: Option<String>,
    /// Group subject, when the backend provides it.
    pub chat_name: Option<String>,
    pub body: String,
    pub from_me: bool,
}

impl InboundMessage {
    pub fn is_group(&self) -> bool {
        self.chat_id.ends_with("@g.us")
    }
}

/// Closed set of lifecycle notifications the supervisor reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    PairingIssued(PairingCode),
    Authenticated,
    Ready,
    AuthFailed(String),
    Disconnected(String),
    MessageReceived(InboundMessage),
}

impl LifecycleEvent {
    /// Short tag used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::PairingIssued(_) => "pairing_issued",
            LifecycleEvent::Authenticated => "authenticated",
            LifecycleEvent::Ready => "ready",
            LifecycleEvent::AuthFailed(_) => "auth_failed",
            LifecycleEvent::Disconnected(_) => "disconnected",
            LifecycleEvent::MessageReceived(_) => "message_received",
        }
    }
}

// ── Session Descriptors ────────────────────────────────────────────────────

/// Identity of the linked account, fetched once the session is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Profile display name ("pushname" in WhatsApp terms).
    pub pushname: Option<String>,
    /// Connected phone number (the user part of the account JID).
    pub wid: String,
}

/// Coarse lifecycle phase of the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotPhase {
    Starting,
    PairingRequired,
    Authenticated,
    Ready,
    AuthFailed,
    Disconnected,
}
