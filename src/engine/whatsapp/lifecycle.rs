// WhatsApp Bridge — Lifecycle State Machine
// BridgeAction, transition
//
//   starting → pairing-required → authenticated → ready
//   auth-failed / disconnected are reachable from every phase.

use crate::atoms::constants::*;
use crate::atoms::types::{BotPhase, InboundMessage, LifecycleEvent, PairingCode};
use crate::engine::state::{BotState, PendingPairing};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::time::Duration;

/// Side effects requested by a transition. The supervisor executes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeAction {
    /// Hand the pairing code to the display channel.
    DisplayPairing(PairingCode),
    /// Query the session for its identity (logging only).
    FetchSessionInfo,
    /// Mark the message's chat as read, with one retry.
    MarkSeen(InboundMessage),
    /// Tear the session down after `delay` and initialize a fresh one.
    ScheduleRestart(Duration),
}

/// Apply one lifecycle event to the status record.
pub fn transition(state: &mut BotState, event: &LifecycleEvent, now: DateTime<Utc>) -> Vec<BridgeAction> {
    match event {
        LifecycleEvent::PairingIssued(code) => {
            info!("[whatsapp] QR code generated — waiting for scan");
            state.pairing = Some(PendingPairing { code: code.clone(), issued_at: now });
            state.ready = false;
            state.phase = BotPhase::PairingRequired;
            state.status = STATUS_PAIRING.into();
            vec![BridgeAction::DisplayPairing(code.clone())]
        }
        LifecycleEvent::Authenticated => {
            info!("[whatsapp] Authentication successful");
            state.pairing = None;
            state.phase = BotPhase::Authenticated;
            state.status = STATUS_AUTHENTICATED.into();
            vec![]
        }
        LifecycleEvent::Ready => {
            info!("[whatsapp] Bot is ready");
            state.ready = true;
            state.pairing = None;
            state.phase = BotPhase::Ready;
            state.status = STATUS_ONLINE.into();
            vec![BridgeAction::FetchSessionInfo]
        }
        LifecycleEvent::AuthFailed(reason) => {
            warn!("[whatsapp] Authentication failed: {}", reason);
            state.ready = false;
            state.pairing = None;
            state.phase = BotPhase::AuthFailed;
            state.status = STATUS_AUTH_FAILED.into();
            vec![BridgeAction::ScheduleRestart(AUTH_FAILURE_RESTART_DELAY)]
        }
        LifecycleEvent::Disconnected(reason) => {
            warn!("[whatsapp] Disconnected: {}", reason);
            state.ready = false;
            state.pairing = None;
            state.phase = BotPhase::Disconnected;
            state.status = format!("{STATUS_DISCONNECTED_PREFIX}{reason}");
            vec![BridgeAction::ScheduleRestart(DISCONNECT_RESTART_DELAY)]
        }
        LifecycleEvent::MessageReceived(message) => {
            if message.from_me {
                return vec![];
            }
            if !state.ready {
                debug!("[whatsapp] Ignoring message {} — session not ready", message.id);
                return vec![];
            }
            state.message_count += 1;
            state.last_message_at = Some(now);

            let chat = message.chat_name.as_deref().unwrap_or("Private Chat");
            let body: String = message.body.chars().take(LOG_BODY_MAX_CHARS).collect();
            info!("[whatsapp] New message from {} in {}: {}", message.sender, chat, body);

            vec![BridgeAction::MarkSeen(message.clone())]
        }
    }
}
