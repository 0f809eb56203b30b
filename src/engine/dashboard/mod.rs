// Dashboard — Status/QR Reporting Surface
//
// Read-only HTTP facade over the shared status record:
//   GET  /            → HTML dashboard (auto-refresh)
//   GET  /qr-image    → HTML page with the pending pairing QR
//   GET  /health      → liveness JSON, always 200
//   GET  /api/status  → status record summary
//   GET  /api/qr      → raw pending pairing payload
//   GET  /api/test    → live probe of the session
//   POST /webhook/whatsapp → backend webhook ingress (forwards to the supervisor)

mod html;

pub use html::{escape_html, format_uptime};

use crate::atoms::constants::WEBHOOK_PATH;
use crate::atoms::error::EngineResult;
use crate::engine::state::SharedState;
use crate::engine::whatsapp::webhook::receive_webhook;
use crate::engine::whatsapp::{EventSink, Supervisor, WhatsAppSession};
use axum::extract::{FromRef, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use log::{error, info, warn};
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

// ── Router state ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub state: SharedState,
    pub session: Arc<dyn WhatsAppSession>,
    pub events: EventSink,
}

impl AppState {
    pub fn from_supervisor(supervisor: &Supervisor) -> Self {
        AppState {
            state: supervisor.state().clone(),
            session: supervisor.session(),
            events: supervisor.event_sink(),
        }
    }
}

impl FromRef<AppState> for EventSink {
    fn from_ref(app: &AppState) -> Self {
        app.events.clone()
    }
}

pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/qr-image", get(qr_image))
        .route("/health", get(health))
        .route("/api/status", get(api_status))
        .route("/api/qr", get(api_qr))
        .route("/api/test", get(api_test))
        .route(WEBHOOK_PATH, post(receive_webhook))
        .layer(CorsLayer::permissive())
        .with_state(app)
}

// ── Server ─────────────────────────────────────────────────────────────

pub async fn bind(addr: SocketAddr) -> EngineResult<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Bind {} failed: {}", addr, e))?;
    info!("[server] Listening on http://{}", addr);
    Ok(listener)
}

pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> EngineResult<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Serve until `shutdown` resolves or the server fails, then tear the session
/// down. The server's error, if any, is returned after the teardown.
pub async fn serve_supervised(
    listener: TcpListener,
    supervisor: Arc<Supervisor>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> EngineResult<()> {
    let app = router(AppState::from_supervisor(&supervisor));
    let served = serve(listener, app, shutdown).await;
    if let Err(e) = &served {
        error!("[server] HTTP server failed: {}", e);
    }
    info!("[server] Shutting down gracefully...");
    supervisor.shutdown().await;
    served
}

// ── Handlers ───────────────────────────────────────────────────────────

async fn dashboard(State(app): State<AppState>) -> Html<String> {
    Html(html::render_dashboard(&app.state.snapshot(), app.state.uptime()))
}

async fn qr_image(State(app): State<AppState>) -> Html<String> {
    Html(html::render_qr_page(app.state.snapshot().pairing.as_ref()))
}

async fn health(State(app): State<AppState>) -> Json<Value> {
    let s = app.state.snapshot();
    Json(json!({
        "status": "healthy",
        "bot_status": s.status,
        "bot_ready": s.ready,
        "has_qr": s.has_qr(),
        "uptime_seconds": app.state.uptime().as_secs(),
        "messages_processed": s.message_count,
        "last_message": s.last_message_at,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn api_status(State(app): State<AppState>) -> Json<Value> {
    let s = app.state.snapshot();
    Json(json!({
        "ready": s.ready,
        "status": s.status,
        "phase": s.phase,
        "has_qr": s.has_qr(),
        "qr_generated_at": s.pairing.as_ref().map(|p| p.issued_at),
        "messages_processed": s.message_count,
        "last_message": s.last_message_at,
        "uptime_seconds": app.state.uptime().as_secs(),
        "started_at": app.state.started_at(),
        "connected_as": s.connected_as,
    }))
}

async fn api_qr(State(app): State<AppState>) -> Json<Value> {
    let pairing = app.state.snapshot().pairing;
    Json(json!({
        "qr": pairing.as_ref().map(|p| p.code.payload.clone()),
        "available": pairing.is_some(),
        "generated_at": pairing.as_ref().map(|p| p.issued_at),
    }))
}

/// Best-effort live probe. Failures are reported in the body, never as 5xx.
async fn api_test(State(app): State<AppState>) -> Json<Value> {
    let s = app.state.snapshot();
    if !s.ready {
        return Json(json!({
            "success": false,
            "error": "Bot not ready",
            "status": s.status,
        }));
    }

    let probe = async {
        let info = app.session.session_info().await?;
        let chats = app.session.chat_count().await?;
        EngineResult::Ok((info, chats))
    };
    match probe.await {
        Ok((info, chats)) => Json(json!({
            "success": true,
            "bot_info": {
                "pushname": info.pushname,
                "wid": info.wid,
            },
            "chats_count": chats,
        })),
        Err(e) => {
            warn!("[dashboard] Session probe failed: {}", e);
            Json(json!({
                "success": false,
                "error": e.to_string(),
                "status": s.status,
            }))
        }
    }
}
