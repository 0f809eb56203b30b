use log::{error, info, warn};
use std::sync::Arc;
use wa_readbot::atoms::error::EngineResult;
use wa_readbot::engine::config::BotConfig;
use wa_readbot::engine::dashboard;
use wa_readbot::engine::state::SharedState;
use wa_readbot::engine::whatsapp::{spawn_heartbeat, EvolutionSession, Supervisor};

#[tokio::main]
async fn main() -> EngineResult<()> {
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!("[server] Could not load .env: {}", e);
        }
    }

    let config = BotConfig::from_env().inspect_err(|e| error!("[server] {}", e))?;
    info!("[server] Starting WhatsApp read bot (instance '{}', backend {})",
        config.whatsapp.instance_name, config.whatsapp.api_url);

    let session = Arc::new(EvolutionSession::new(config.whatsapp.clone())?);
    let (supervisor, events) = Supervisor::new(session, SharedState::new());
    let event_loop = tokio::spawn(supervisor.clone().run(events));
    let heartbeat = spawn_heartbeat(supervisor.state().clone());

    // Bind before initializing so early webhooks are not lost.
    let listener = dashboard::bind(config.bind_addr()).await?;

    let init = supervisor.clone();
    tokio::spawn(async move { init.initialize().await });

    let served = dashboard::serve_supervised(listener, supervisor, shutdown_signal()).await;
    heartbeat.abort();
    event_loop.abort();
    served
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("[server] Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("[server] Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("[server] Received SIGINT"),
        _ = terminate => info!("[server] Received SIGTERM"),
    }
}
