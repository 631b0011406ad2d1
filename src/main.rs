//! Clash Back binary entrypoint wiring the bracket engine, file persistence, REST and
//! WebSocket layers.

use std::{env, net::SocketAddr, path::Path, sync::Arc};

use anyhow::Context;
use axum::Router;
use clash_back::{
    config::AppConfig,
    dao::{
        content::ContentLibrary,
        tournament_store::{FileTournamentStore, TournamentStore},
    },
    routes,
    services::tournament_service,
    state::SharedState,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::load());
    let content = ContentLibrary::load(config.content_dir()).context("loading challenge content")?;
    if content.is_empty() {
        warn!(
            dir = %config.content_dir().display(),
            "no challenges loaded; theme commands will fail until content is added"
        );
    }

    let file_store = FileTournamentStore::new(config.state_path());
    info!(path = %file_store.path().display(), "tournament file store ready");
    let store: Arc<dyn TournamentStore> = Arc::new(file_store);
    let app_state = tournament_service::bootstrap(Arc::clone(&config), Arc::new(content), store)
        .await
        .context("bootstrapping tournament")?;

    let app = build_router(Arc::clone(&app_state), config.frontend_dir());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(app_state))
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, frontend_dir: Option<&Path>) -> Router<()> {
    let mut router = routes::router(state);

    if let Some(dir) = frontend_dir {
        info!(dir = %dir.display(), "serving frontend");
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        router = router.fallback_service(spa);
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM, then close viewer sockets so the server can drain.
async fn shutdown_signal(state: SharedState) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    let closed = state.close_viewers();
    info!(closed, "shutdown signal received; closing viewer sockets");
}
