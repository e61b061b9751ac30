use std::{net::SocketAddr, sync::Arc};

use anyhow::{bail, Context};
use http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use epack_api::{
    app_router,
    config::{self, AppConfig, CorsPolicy},
    db, events, handlers, AppState,
};

fn cors_layer(cfg: &AppConfig) -> anyhow::Result<CorsLayer> {
    match cfg.cors_policy() {
        CorsPolicy::Origins(origins) => {
            let origins = origins
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .with_context(|| format!("invalid CORS origin {origin:?}"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_credentials(cfg.cors_allow_credentials))
        }
        CorsPolicy::Permissive => {
            warn!(environment = %cfg.environment, "CORS allows any origin");
            Ok(CorsLayer::permissive())
        }
        CorsPolicy::Unconfigured => {
            bail!("set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    handlers::health::init_start_time();

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("connecting to the database")?;
    if cfg.auto_migrate {
        db::run_migrations(&pool)
            .await
            .context("running migrations")?;
    }

    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    tokio::spawn(events::process_events(event_rx));

    let state = AppState::new(
        Arc::new(pool),
        cfg.clone(),
        Some(events::EventSender::new(event_tx)),
    );
    let app = app_router(state).layer(cors_layer(&cfg)?);

    let ip: std::net::IpAddr = cfg.host.parse().context("parsing host")?;
    let addr = SocketAddr::from((ip, cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, environment = %cfg.environment, "epack-api listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("epack-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, draining connections"),
        _ = terminate => info!("SIGTERM received, draining connections"),
    }
}
