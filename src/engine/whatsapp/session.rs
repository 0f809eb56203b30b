// WhatsApp Bridge — Session Handle
// WhatsAppSession trait, EventSink

use crate::atoms::error::EngineResult;
use crate::atoms::types::{InboundMessage, LifecycleEvent, SessionInfo};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Channel the session uses to report lifecycle events to the supervisor.
pub type EventSink = mpsc::UnboundedSender<LifecycleEvent>;

/// A live connection to the messaging backend.
///
/// Pairing, encryption and credential storage all happen behind this trait.
/// Events that arrive asynchronously (QR refreshes, connection changes,
/// messages) are pushed into the `EventSink` handed to `initialize`.
#[async_trait]
pub trait WhatsAppSession: Send + Sync {
    /// Start a fresh session. May emit `PairingIssued` before returning.
    async fn initialize(&self, events: EventSink) -> EngineResult<()>;

    /// Tear the session down.
    async fn destroy(&self) -> EngineResult<()>;

    /// Mark the chat a message arrived in as read.
    async fn mark_seen(&self, message: &InboundMessage) -> EngineResult<()>;

    /// Identity of the linked account.
    async fn session_info(&self) -> EngineResult<SessionInfo>;

    /// Number of chats visible to the session.
    async fn chat_count(&self) -> EngineResult<usize>;
}

// ── Test double ────────────────────────────────────────────────────────
