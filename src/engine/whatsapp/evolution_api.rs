// WhatsApp Bridge — Evolution API Session
// EvolutionSession (create/delete instance, mark read, fetch identity, count chats),
// extract_pairing_from_response

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{InboundMessage, LifecycleEvent, PairingCode, SessionInfo};
use super::config::WhatsAppConfig;
use super::session::{EventSink, WhatsAppSession};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::{json, Value};
use std::time::Duration;

/// `WhatsAppSession` backed by a self-hosted Evolution API (v1.x REST).
///
/// Every initialize creates a fresh instance; teardown logs out and deletes
/// it, so each restart pairs again from scratch.
pub struct EvolutionSession {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl EvolutionSession {
    pub fn new(config: WhatsAppConfig) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(EvolutionSession { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    fn create_body(&self) -> Value {
        // Unique token per instance to avoid "Token already exists" collisions.
        let token = format!("wa-{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
        json!({
            "instanceName": self.config.instance_name,
            "token": token,
            "qrcode": true,
            "webhook": self.config.webhook_url,
        })
    }

    async fn post_create(&self) -> EngineResult<(reqwest::StatusCode, String)> {
        let resp = self.client.post(self.url("/instance/create"))
            .header("apikey", &self.config.api_key)
            .json(&self.create_body())
            .send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        info!("[whatsapp] Instance create response [{}]: {}", status, truncate(&text, 300));
        Ok((status, text))
    }

    async fn delete_instance(&self) -> EngineResult<()> {
        let url = self.url(&format!("/instance/delete/{}", self.config.instance_name));
        let resp = self.client.delete(&url)
            .header("apikey", &self.config.api_key)
            .send().await?;
        let status = resp.status();
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::session("delete_instance", format!("{}: {}", status, truncate(&text, 200))));
        }
        Ok(())
    }
}

#[async_trait]
impl WhatsAppSession for EvolutionSession {
    async fn initialize(&self, events: EventSink) -> EngineResult<()> {
        info!("[whatsapp] Creating instance '{}'", self.config.instance_name);
        let (mut status, mut text) = self.post_create().await?;

        if !status.is_success() {
            // Instance with this name already exists — delete it and retry once
            let lower = text.to_lowercase();
            let is_instance_exists = lower.contains("instance") && (lower.contains("already") || lower.contains("exists"));
            let is_name_in_use = lower.contains("already in use");
            let is_token_exists = lower.contains("token") && lower.contains("already");
            if !(is_instance_exists || is_name_in_use || is_token_exists) {
                return Err(EngineError::session("initialize", format!("{}: {}", status, truncate(&text, 300))));
            }

            info!("[whatsapp] Instance/token conflict, deleting instance and recreating...");
            self.delete_instance().await?;
            (status, text) = self.post_create().await?;
            if !status.is_success() {
                return Err(EngineError::session(
                    "initialize",
                    format!("create failed after delete ({}): {}", status, truncate(&text, 300)),
                ));
            }
        }

        let resp: Value = serde_json::from_str(&text)?;
        if let Some(code) = extract_pairing_from_response(&resp) {
            let _ = events.send(LifecycleEvent::PairingIssued(code));
        }
        Ok(())
    }

    async fn destroy(&self) -> EngineResult<()> {
        let logout = self.url(&format!("/instance/logout/{}", self.config.instance_name));
        match self.client.delete(&logout).header("apikey", &self.config.api_key).send().await {
            Ok(resp) if !resp.status().is_success() => {
                info!("[whatsapp] Logout returned {} (instance may not be connected)", resp.status());
            }
            Ok(_) => {}
            Err(e) => warn!("[whatsapp] Logout failed: {}", e),
        }
        self.delete_instance().await
    }

    async fn mark_seen(&self, message: &InboundMessage) -> EngineResult<()> {
        let url = self.url(&format!("/chat/markMessageAsRead/{}", self.config.instance_name));
        let body = json!({
            "read_messages": [{
                "remoteJid": message.chat_id,
                "fromMe": false,
                "id": message.id,
            }]
        });
        let resp = self.client.put(&url)
            .header("apikey", &self.config.api_key)
            .json(&body)
            .send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::session("mark_seen", format!("{}: {}", status, truncate(&text, 200))));
        }
        Ok(())
    }

    async fn session_info(&self) -> EngineResult<SessionInfo> {
        let resp = self.client.get(self.url("/instance/fetchInstances"))
            .query(&[("instanceName", self.config.instance_name.as_str())])
            .header("apikey", &self.config.api_key)
            .send().await?;
        if !resp.status().is_success() {
            return Err(EngineError::session("session_info", resp.status().to_string()));
        }
        let body: Value = resp.json().await?;
        parse_session_info(&body).ok_or_else(|| EngineError::session("session_info", "instance has no owner yet"))
    }

    async fn chat_count(&self) -> EngineResult<usize> {
        let url = self.url(&format!("/chat/findChats/{}", self.config.instance_name));
        let resp = self.client.get(&url)
            .header("apikey", &self.config.api_key)
            .send().await?;
        if !resp.status().is_success() {
            return Err(EngineError::session("chat_count", resp.status().to_string()));
        }
        let body: Value = resp.json().await?;
        body.as_array()
            .map(Vec::len)
            .ok_or_else(|| EngineError::session("chat_count", "unexpected response shape"))
    }
}

// ── Response parsing ───────────────────────────────────────────────────

/// Extract the pairing code from create/connect responses.
///   create:  { "qrcode": { "code": "2@...", "base64": "data:image/..." } }
///   connect: { "code": "2@...", "base64": "data:image/..." }
pub(crate) fn extract_pairing_from_response(resp: &Value) -> Option<PairingCode> {
    let qr = if resp["qrcode"].is_object() { &resp["qrcode"] } else { resp };

    let image = qr["base64"].as_str()
        .or_else(|| resp["qrcode"].as_str())
        .filter(|s| s.starts_with("data:"))
        .map(String::from);
    let payload = qr["code"].as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| image.clone());

    match payload {
        Some(payload) => {
            info!("[whatsapp] QR code extracted ({} chars)", payload.len());
            Some(PairingCode { payload, image })
        }
        None => {
            warn!("[whatsapp] No QR code in response (instance may already be paired)");
            None
        }
    }
}

/// `fetchInstances` returns either a list or a single object, wrapped in `instance`.
fn parse_session_info(body: &Value) -> Option<SessionInfo> {
    let entry = match body.as_array() {
        Some(list) => list.first()?,
        None => body,
    };
    let instance = if entry["instance"].is_object() { &entry["instance"] } else { entry };

    let owner = instance["owner"].as_str().filter(|s| !s.is_empty())?;
    let wid = owner.split('@').next().unwrap_or(owner).to_string();
    let pushname = instance["profileName"].as_str().map(String::from);
    Some(SessionInfo { pushname, wid })
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
