// engine/config.rs — Process configuration loaded from environment variables.

use crate::atoms::constants::DEFAULT_PORT;
use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::whatsapp::WhatsAppConfig;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Dashboard listen port (`PORT`, default 3000)
    pub port: u16,
    pub whatsapp: WhatsAppConfig,
}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| EngineError::Config(format!("Invalid PORT '{}'", raw)))?,
            None => DEFAULT_PORT,
        };
        let whatsapp = WhatsAppConfig::from_lookup(&lookup, port)?;
        Ok(BotConfig { port, whatsapp })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = BotConfig::from_lookup(lookup(&[("EVOLUTION_API_KEY", "secret")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.whatsapp.api_url, "http://127.0.0.1:8085");
        assert_eq!(config.whatsapp.instance_name, "wa-bot");
        assert_eq!(config.whatsapp.webhook_url, "http://host.docker.internal:3000/webhook/whatsapp");
    }

    #[test]
    fn overrides_are_honoured() {
        let config = BotConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("EVOLUTION_API_KEY", "secret"),
            ("EVOLUTION_API_URL", "http://evolution:8080/"),
            ("WA_INSTANCE_NAME", "reader"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.whatsapp.api_url, "http://evolution:8080");
        assert_eq!(config.whatsapp.instance_name, "reader");
        assert_eq!(config.whatsapp.webhook_url, "http://host.docker.internal:8080/webhook/whatsapp");
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let err = BotConfig::from_lookup(lookup(&[("PORT", "http"), ("EVOLUTION_API_KEY", "k")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let err = BotConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("EVOLUTION_API_KEY"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = BotConfig::from_lookup(lookup(&[("EVOLUTION_API_KEY", "super-secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
