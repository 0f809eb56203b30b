// WhatsApp Bridge — Connection Lifecycle Supervisor
// Supervisor (initialize, run, handle_event, schedule_restart, shutdown), spawn_heartbeat

use crate::atoms::constants::{HEARTBEAT_INTERVAL, REINIT_DELAY};
use crate::atoms::types::LifecycleEvent;
use crate::engine::state::{BotState, SharedState};
use super::lifecycle::{transition, BridgeAction};
use super::messages::mark_seen_with_retry;
use super::session::{EventSink, WhatsAppSession};
use chrono::Utc;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Owns the session handle and is the only writer of the status record.
///
/// Events are applied one at a time by `run`. Slow work (mark-as-read,
/// identity lookups, restarts) is spawned so the event loop never blocks on
/// the backend.
pub struct Supervisor {
    session: Arc<dyn WhatsAppSession>,
    state: SharedState,
    events: EventSink,
    initialized: AtomicBool,
    /// At most one pending restart. Scheduling a new one supersedes the old one
    /// while it is still waiting out its delay.
    restart_slot: Mutex<Option<JoinHandle<()>>>,
    restart_generation: AtomicU64,
    /// Set once a restart has started tearing down; cleared before it reinitializes.
    restarting: AtomicBool,
}

impl Supervisor {
    pub fn new(
        session: Arc<dyn WhatsAppSession>,
        state: SharedState,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let supervisor = Arc::new(Supervisor {
            session,
            state,
            events,
            initialized: AtomicBool::new(false),
            restart_slot: Mutex::new(None),
            restart_generation: AtomicU64::new(0),
            restarting: AtomicBool::new(false),
        });
        (supervisor, rx)
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn session(&self) -> Arc<dyn WhatsAppSession> {
        self.session.clone()
    }

    pub fn event_sink(&self) -> EventSink {
        self.events.clone()
    }

    pub fn restart_pending(&self) -> bool {
        self.restart_slot.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    // ── Session control ────────────────────────────────────────────────

    /// Initialize the session unless it already is. A failed initialize is
    /// reported as a disconnect so it goes through the normal restart path.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("[whatsapp] Session already initialized — skipping");
            return;
        }

        info!("[whatsapp] Initializing WhatsApp session...");
        self.state.update(BotState::mark_initializing);

        if let Err(e) = self.session.initialize(self.events.clone()).await {
            error!("[whatsapp] Session initialize failed: {}", e);
            self.initialized.store(false, Ordering::SeqCst);
            let _ = self.events.send(LifecycleEvent::Disconnected(format!("INIT_FAILED: {e}")));
        }
    }

    async fn teardown(&self) {
        info!("[whatsapp] Tearing down session");
        if let Err(e) = self.session.destroy().await {
            warn!("[whatsapp] Session teardown failed: {}", e);
        }
        self.initialized.store(false, Ordering::SeqCst);
    }

    /// Wait `delay`, tear down, wait `REINIT_DELAY`, initialize.
    ///
    /// Once the delay has elapsed the restart runs to completion. Failures
    /// reported while it tears down (the logout itself closes the connection)
    /// are ignored.
    fn schedule_restart(self: &Arc<Self>, delay: Duration) {
        let mut slot = self.restart_slot.lock();
        if self.restarting.load(Ordering::SeqCst) {
            info!("[whatsapp] Restart already in progress, ignoring");
            return;
        }
        let generation = self.restart_generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = slot.take() {
            if !previous.is_finished() {
                info!("[whatsapp] Replacing pending restart");
                previous.abort();
            }
        }

        info!("[whatsapp] Restarting session in {:?}", delay);
        let this = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let _slot = this.restart_slot.lock();
                if this.restart_generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                this.restarting.store(true, Ordering::SeqCst);
            }
            this.teardown().await;
            tokio::time::sleep(REINIT_DELAY).await;
            this.restarting.store(false, Ordering::SeqCst);
            this.initialize().await;
        }));
    }

    /// Cancel any pending restart and make one best-effort teardown.
    pub async fn shutdown(&self) {
        if let Some(pending) = self.restart_slot.lock().take() {
            pending.abort();
        }
        self.teardown().await;
        info!("[whatsapp] Supervisor stopped");
    }

    // ── Event loop ─────────────────────────────────────────────────────

    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<LifecycleEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        debug!("[whatsapp] Event channel closed");
    }

    /// Apply one event and launch the actions it produced.
    pub fn handle_event(self: &Arc<Self>, event: LifecycleEvent) {
        debug!("[whatsapp] Event: {}", event.kind());
        let actions = self.state.update(|s| transition(s, &event, Utc::now()));
        for action in actions {
            self.execute(action);
        }
    }

    fn execute(self: &Arc<Self>, action: BridgeAction) {
        match action {
            BridgeAction::DisplayPairing(code) => {
                info!("[whatsapp] Scan the pairing code at /qr-image ({} chars{})",
                    code.payload.len(),
                    if code.image.is_some() { ", image available" } else { "" });
                debug!("[whatsapp] Pairing payload: {}", code.payload);
            }
            BridgeAction::FetchSessionInfo => {
                let session = self.session.clone();
                let state = self.state.clone();
                tokio::spawn(async move {
                    match session.session_info().await {
                        Ok(info) => {
                            info!("[whatsapp] Connected as: {} ({})",
                                info.pushname.as_deref().unwrap_or("Unknown"), info.wid);
                            state.update(|s| s.connected_as = Some(info));
                        }
                        Err(e) => warn!("[whatsapp] Could not fetch bot info: {}", e),
                    }
                });
            }
            BridgeAction::MarkSeen(message) => {
                tokio::spawn(mark_seen_with_retry(self.session.clone(), message));
            }
            BridgeAction::ScheduleRestart(delay) => self.schedule_restart(delay),
        }
    }
}

/// Log the current status every `HEARTBEAT_INTERVAL`.
pub fn spawn_heartbeat(state: SharedState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            info!("[whatsapp] {}", heartbeat_line(&state.snapshot()));
        }
    })
}

fn heartbeat_line(state: &BotState) -> String {
    format!("Heartbeat - Status: {}", state.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{BotPhase, InboundMessage, SessionInfo};
    use crate::engine::whatsapp::session::fake::FakeSession;
    use std::sync::atomic::Ordering;

    fn supervisor(session: Arc<FakeSession>) -> Arc<Supervisor> {
        let (sup, rx) = Supervisor::new(session, SharedState::new());
        tokio::spawn(sup.clone().run(rx));
        sup
    }

    /// Let spawned tasks run without advancing the paused clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_is_guarded() {
        let session = Arc::new(FakeSession::default());
        let sup = supervisor(session.clone());

        sup.initialize().await;
        sup.initialize().await;
        assert_eq!(FakeSession::count(&session.initialize_calls), 1);
        assert_eq!(sup.state().snapshot().status, "Initializing...");
    }

    #[tokio::test(start_paused = true)]
    async fn pairing_code_from_initialize_reaches_state() {
        let session = Arc::new(FakeSession::default());
        *session.pairing_code.lock() = Some("ABC123".into());
        let sup = supervisor(session.clone());

        sup.initialize().await;
        settle().await;

        let state = sup.state().snapshot();
        assert_eq!(state.phase, BotPhase::PairingRequired);
        assert_eq!(state.pairing.unwrap().code.payload, "ABC123");
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_restarts_after_fixed_delays() {
        let session = Arc::new(FakeSession::default());
        let sup = supervisor(session.clone());
        sup.initialize().await;
        sup.handle_event(LifecycleEvent::Ready);

        sup.handle_event(LifecycleEvent::Disconnected("NAVIGATION".into()));
        let state = sup.state().snapshot();
        assert_eq!(state.status, "Disconnected: NAVIGATION");
        assert!(!state.ready);
        assert!(sup.restart_pending());

        tokio::time::sleep(Duration::from_millis(14_900)).await;
        assert_eq!(FakeSession::count(&session.destroy_calls), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(FakeSession::count(&session.destroy_calls), 1);
        assert_eq!(FakeSession::count(&session.initialize_calls), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(FakeSession::count(&session.initialize_calls), 2);
        let state = sup.state().snapshot();
        assert_eq!(state.phase, BotPhase::Starting);
        assert_eq!(state.status, "Initializing...");
        assert!(!sup.restart_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_restarts_after_ten_seconds() {
        let session = Arc::new(FakeSession::default());
        let sup = supervisor(session.clone());
        sup.initialize().await;

        sup.handle_event(LifecycleEvent::AuthFailed("restore failed".into()));
        assert_eq!(sup.state().snapshot().status, "Auth Failed - Retrying...");

        tokio::time::sleep(Duration::from_millis(10_100)).await;
        assert_eq!(FakeSession::count(&session.destroy_calls), 1);
        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(FakeSession::count(&session.initialize_calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_failures_restart_once() {
        let session = Arc::new(FakeSession::default());
        let sup = supervisor(session.clone());
        sup.initialize().await;

        sup.handle_event(LifecycleEvent::Disconnected("CONFLICT".into()));
        tokio::time::sleep(Duration::from_secs(3)).await;
        sup.handle_event(LifecycleEvent::Disconnected("NAVIGATION".into()));

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(FakeSession::count(&session.destroy_calls), 1);
        assert_eq!(FakeSession::count(&session.initialize_calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_disconnect_does_not_cancel_restart() {
        let session = Arc::new(FakeSession::default());
        session.disconnect_on_destroy.store(true, Ordering::SeqCst);
        let sup = supervisor(session.clone());
        sup.initialize().await;

        sup.handle_event(LifecycleEvent::Disconnected("NAVIGATION".into()));
        tokio::time::sleep(Duration::from_secs(600)).await;
        settle().await;

        assert_eq!(FakeSession::count(&session.destroy_calls), 1);
        assert_eq!(FakeSession::count(&session.initialize_calls), 2);
        let state = sup.state().snapshot();
        assert_eq!(state.phase, BotPhase::Starting);
        assert_eq!(state.status, "Initializing...");
        assert!(!sup.restart_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_after_reinitialize_restarts_again() {
        let session = Arc::new(FakeSession::default());
        let sup = supervisor(session.clone());
        sup.initialize().await;

        sup.handle_event(LifecycleEvent::Disconnected("NAVIGATION".into()));
        tokio::time::sleep(Duration::from_secs(21)).await;
        settle().await;
        assert_eq!(FakeSession::count(&session.initialize_calls), 2);

        sup.handle_event(LifecycleEvent::AuthFailed("restore failed".into()));
        assert!(sup.restart_pending());
        tokio::time::sleep(Duration::from_secs(16)).await;
        settle().await;
        assert_eq!(FakeSession::count(&session.destroy_calls), 2);
        assert_eq!(FakeSession::count(&session.initialize_calls), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_initialize_goes_through_restart() {
        let session = Arc::new(FakeSession::default());
        session.fail_initialize.store(true, Ordering::SeqCst);
        let sup = supervisor(session.clone());

        sup.initialize().await;
        settle().await;
        let state = sup.state().snapshot();
        assert_eq!(state.phase, BotPhase::Disconnected);
        assert!(state.status.starts_with("Disconnected: INIT_FAILED"));

        session.fail_initialize.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(21)).await;
        settle().await;
        assert_eq!(FakeSession::count(&session.initialize_calls), 2);
        assert_eq!(sup.state().snapshot().phase, BotPhase::Starting);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_records_connected_identity() {
        let session = Arc::new(FakeSession::default());
        *session.info.lock() = Some(SessionInfo { pushname: Some("Reader".into()), wid: "15550001111".into() });
        let sup = supervisor(session.clone());

        sup.handle_event(LifecycleEvent::Ready);
        settle().await;
        assert_eq!(sup.state().snapshot().connected_as.unwrap().wid, "15550001111");
    }

    #[tokio::test(start_paused = true)]
    async fn ready_survives_identity_lookup_failure() {
        let session = Arc::new(FakeSession::default());
        let sup = supervisor(session.clone());

        sup.handle_event(LifecycleEvent::Ready);
        settle().await;
        let state = sup.state().snapshot();
        assert!(state.ready);
        assert!(state.connected_as.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_message_is_marked_seen() {
        let session = Arc::new(FakeSession::default());
        let sup = supervisor(session.clone());
        sup.handle_event(LifecycleEvent::Ready);

        sup.handle_event(LifecycleEvent::MessageReceived(InboundMessage {
            id: "ABCD".into(),
            chat_id: "15551234567@s.whatsapp.net".into(),
            sender: "15551234567".into(),
            push_name: None,
            chat_name: None,
            body: "ping".into(),
            from_me: false,
        }));
        settle().await;
        assert_eq!(sup.state().snapshot().message_count, 1);
        assert_eq!(FakeSession::count(&session.mark_seen_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_keeps_running_past_interval() {
        let state = SharedState::new();
        let heartbeat = spawn_heartbeat(state.clone());

        tokio::time::sleep(HEARTBEAT_INTERVAL * 2 + Duration::from_secs(1)).await;
        settle().await;
        assert!(!heartbeat.is_finished());

        state.update(|s| s.status = "Online - Reading Messages".into());
        tokio::time::sleep(HEARTBEAT_INTERVAL).await;
        settle().await;
        assert!(!heartbeat.is_finished());
        assert_eq!(heartbeat_line(&state.snapshot()), "Heartbeat - Status: Online - Reading Messages");

        heartbeat.abort();
        let _ = heartbeat.await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_restart() {
        let session = Arc::new(FakeSession::default());
        let sup = supervisor(session.clone());
        sup.initialize().await;

        sup.handle_event(LifecycleEvent::Disconnected("LOGOUT".into()));
        sup.shutdown().await;
        assert_eq!(FakeSession::count(&session.destroy_calls), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(FakeSession::count(&session.destroy_calls), 1);
        assert_eq!(FakeSession::count(&session.initialize_calls), 1);
    }
}
