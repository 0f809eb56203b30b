// engine/state.rs — The shared bot status record.
//
// One `BotState` per process, created with "starting" defaults, written only by
// the lifecycle supervisor and read (as cloned snapshots) by the dashboard.

use crate::atoms::constants::{STATUS_INITIALIZING, STATUS_STARTING};
use crate::atoms::types::{BotPhase, PairingCode, SessionInfo};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A pairing code that has been issued and not yet consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingPairing {
    pub code: PairingCode,
    pub issued_at: DateTime<Utc>,
}

/// Invariants:
///   • `pairing` is `Some` only while `phase == PairingRequired`
///   • `ready` implies `pairing.is_none()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotState {
    pub ready: bool,
    pub status: String,
    pub phase: BotPhase,
    pub pairing: Option<PendingPairing>,
    pub message_count: u64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub connected_as: Option<SessionInfo>,
}

impl Default for BotState {
    fn default() -> Self {
        BotState {
            ready: false,
            status: STATUS_STARTING.into(),
            phase: BotPhase::Starting,
            pairing: None,
            message_count: 0,
            last_message_at: None,
            connected_as: None,
        }
    }
}

impl BotState {
    pub fn has_qr(&self) -> bool {
        self.pairing.is_some()
    }

    /// Reset to the starting phase for a fresh session. Counters survive.
    pub fn mark_initializing(&mut self) {
        self.ready = false;
        self.pairing = None;
        self.phase = BotPhase::Starting;
        self.status = STATUS_INITIALIZING.into();
    }
}

// ── Shared accessor ────────────────────────────────────────────────────

/// Cheaply clonable handle to the process-wide `BotState`.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Mutex<BotState>>,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        SharedState {
            inner: Arc::new(Mutex::new(BotState::default())),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Clone of the current record. The lock is released before returning.
    pub fn snapshot(&self) -> BotState {
        self.inner.lock().clone()
    }

    /// Apply a mutation under the lock and return its result.
    pub fn update<R>(&self, f: impl FnOnce(&mut BotState) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
