// WhatsApp Bridge — Webhook Ingress
// receive_webhook (axum handler), translate_webhook, parse_inbound_messages

use crate::atoms::types::{InboundMessage, LifecycleEvent, PairingCode};
use super::session::EventSink;
use axum::body::Bytes;
use axum::extract::State;
use log::{debug, info, warn};
use serde_json::Value;

/// POST /webhook/whatsapp — Evolution API posts every instance event here.
/// Always answers 200 so the backend never retries; bad payloads are dropped.
pub async fn receive_webhook(State(events): State<EventSink>, body: Bytes) -> &'static str {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("[whatsapp] Ignoring malformed webhook body: {}", e);
            return "OK";
        }
    };

    for event in translate_webhook(&payload) {
        if events.send(event).is_err() {
            warn!("[whatsapp] Supervisor is gone — dropping webhook event");
            break;
        }
    }
    "OK"
}

/// Map one backend webhook payload to lifecycle events.
///
/// Event names arrive as `qrcode.updated` or `QRCODE_UPDATED` depending on the
/// backend version; both are accepted.
pub fn translate_webhook(payload: &Value) -> Vec<LifecycleEvent> {
    let event = payload["event"].as_str().unwrap_or("").to_lowercase().replace('_', ".");
    let data = &payload["data"];

    match event.as_str() {
        "qrcode.updated" => {
            let qr = &data["qrcode"];
            let image = qr["base64"].as_str()
                .or_else(|| qr.as_str())
                .filter(|s| s.starts_with("data:"))
                .map(String::from);
            let payload = qr["code"].as_str()
                .filter(|s| !s.is_empty())
                .map(String::from)
                .or_else(|| image.clone());
            match payload {
                Some(payload) => vec![LifecycleEvent::PairingIssued(PairingCode { payload, image })],
                None => vec![],
            }
        }
        "connection.update" => {
            let state = data["state"].as_str().unwrap_or("");
            let reason = status_reason(data);
            match state {
                "open" | "connected" => {
                    info!("[whatsapp] Connection confirmed via webhook");
                    vec![LifecycleEvent::Authenticated, LifecycleEvent::Ready]
                }
                "close" => vec![LifecycleEvent::Disconnected(reason.unwrap_or_else(|| "close".into()))],
                "refused" => vec![LifecycleEvent::AuthFailed(reason.unwrap_or_else(|| "refused".into()))],
                other => {
                    debug!("[whatsapp] Connection state '{}'", other);
                    vec![]
                }
            }
        }
        "logout.instance" => vec![LifecycleEvent::Disconnected("LOGOUT".into())],
        "messages.upsert" => parse_inbound_messages(data)
            .into_iter()
            .map(LifecycleEvent::MessageReceived)
            .collect(),
        _ => vec![],
    }
}

fn status_reason(data: &Value) -> Option<String> {
    match &data["statusReason"] {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// `messages.upsert` carries one message object or an array of them.
pub(crate) fn parse_inbound_messages(data: &Value) -> Vec<InboundMessage> {
    let items: Vec<&Value> = match data.as_array() {
        Some(arr) => arr.iter().collect(),
        None => vec![data],
    };

    items.into_iter().filter_map(|msg| {
        let key = &msg["key"];
        let id = key["id"].as_str()?.to_string();
        let chat_id = key["remoteJid"].as_str()?.to_string();
        // Skip broadcast status updates.
        if chat_id == "status@broadcast" {
            return None;
        }
        let participant = key["participant"].as_str().unwrap_or(&chat_id);
        let sender = participant.split('@').next().unwrap_or(participant).to_string();

        let content = &msg["message"];
        let body = content["conversation"].as_str()
            .or_else(|| content["extendedTextMessage"]["text"].as_str())
            .or_else(|| content["imageMessage"]["caption"].as_str())
            .or_else(|| content["videoMessage"]["caption"].as_str())
            .unwrap_or("")
            .to_string();

        Some(InboundMessage {
            id,
            sender,
            push_name: msg["pushName"].as_str().map(String::from),
            chat_name: msg["chatName"].as_str().map(String::from),
            body,
            from_me: key["fromMe"].as_bool().unwrap_or(false),
            chat_id,
        })
    }).collect()
}
