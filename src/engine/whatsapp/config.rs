// WhatsApp Bridge — Configuration
// WhatsAppConfig, from_lookup

use crate::atoms::constants::{DEFAULT_EVOLUTION_API_URL, DEFAULT_INSTANCE_NAME, WEBHOOK_PATH};
use crate::atoms::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Evolution API base URL
    pub api_url: String,
    /// Evolution API key (sent as the `apikey` header)
    pub api_key: String,
    /// Instance name for Evolution API (default: "wa-bot")
    pub instance_name: String,
    /// URL the Evolution API posts webhooks to
    pub webhook_url: String,
}

// Manual Debug so the API key never reaches a log line.
impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("instance_name", &self.instance_name)
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

impl WhatsAppConfig {
    /// Build from a variable lookup. `port` is the dashboard port, used for the
    /// default webhook URL.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>, port: u16) -> EngineResult<Self> {
        let api_key = lookup("EVOLUTION_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| EngineError::Config("EVOLUTION_API_KEY is not set".into()))?;

        let api_url = lookup("EVOLUTION_API_URL")
            .unwrap_or_else(|| DEFAULT_EVOLUTION_API_URL.into())
            .trim_end_matches('/')
            .to_string();

        let instance_name = lookup("WA_INSTANCE_NAME").unwrap_or_else(|| DEFAULT_INSTANCE_NAME.into());
        if instance_name.is_empty() || instance_name.contains('/') {
            return Err(EngineError::Config(format!("Invalid WA_INSTANCE_NAME '{}'", instance_name)));
        }

        let webhook_url = lookup("WA_WEBHOOK_URL")
            .unwrap_or_else(|| format!("http://host.docker.internal:{}{}", port, WEBHOOK_PATH));

        Ok(WhatsAppConfig { api_url, api_key, instance_name, webhook_url })
    }
}
