// WhatsApp Bridge (via Evolution API)
//
// Module layout:
//   config        — WhatsAppConfig (backend URL, key, instance, webhook URL)
//   session       — WhatsAppSession trait, EventSink
//   evolution_api — EvolutionSession: create/delete instance, mark read, identity probe
//   webhook       — receive_webhook handler, translate_webhook
//   lifecycle     — BridgeAction, transition (the state machine)
//   messages      — mark_seen_with_retry
//   bridge        — Supervisor, spawn_heartbeat

pub mod config;
pub mod session;
pub mod evolution_api;
pub mod webhook;
pub mod lifecycle;
pub(crate) mod messages;
pub mod bridge;

// ── Re-exports ─────────────────────────────────────────────────────────

pub use bridge::{spawn_heartbeat, Supervisor};
pub use config::WhatsAppConfig;
pub use evolution_api::EvolutionSession;
pub use session::{EventSink, WhatsAppSession};
