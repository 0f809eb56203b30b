// ── Readbot Atoms: Constants ───────────────────────────────────────────────
// All named constants for the crate live here.

use std::time::Duration;

// ── Restart policy ─────────────────────────────────────────────────────────
// Fixed delays, unlimited attempts. A restart waits the failure-specific delay,
// tears the session down, then waits REINIT_DELAY before initializing again.
pub const AUTH_FAILURE_RESTART_DELAY: Duration = Duration::from_secs(10);
pub const DISCONNECT_RESTART_DELAY: Duration = Duration::from_secs(15);
pub const REINIT_DELAY: Duration = Duration::from_secs(5);

// ── Inbound messages ───────────────────────────────────────────────────────
/// A failed mark-as-seen is retried once after this delay, then dropped.
pub const MARK_SEEN_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Message bodies are truncated to this many characters in log lines.
pub const LOG_BODY_MAX_CHARS: usize = 100;

// ── Heartbeat ──────────────────────────────────────────────────────────────
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(300);

// ── Dashboard ──────────────────────────────────────────────────────────────
pub const DASHBOARD_REFRESH_SECS: u32 = 30;
pub const QR_PAGE_REFRESH_SECS: u32 = 10;

// ── Status labels ──────────────────────────────────────────────────────────
pub const STATUS_STARTING: &str = "Starting...";
pub const STATUS_INITIALIZING: &str = "Initializing...";
pub const STATUS_PAIRING: &str = "QR Code Ready - Please Scan";
pub const STATUS_AUTHENTICATED: &str = "Authenticated - Starting...";
pub const STATUS_ONLINE: &str = "Online - Reading Messages";
pub const STATUS_AUTH_FAILED: &str = "Auth Failed - Retrying...";
pub const STATUS_DISCONNECTED_PREFIX: &str = "Disconnected: ";

// ── Configuration defaults ─────────────────────────────────────────────────
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_EVOLUTION_API_URL: &str = "http://127.0.0.1:8085";
pub const DEFAULT_INSTANCE_NAME: &str = "wa-bot";
pub const WEBHOOK_PATH: &str = "/webhook/whatsapp";
