//! Scoreboard Back binary entrypoint wiring REST, SSE and the participant table backend.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scoreboard_back::{
    config::{AppConfig, StoreKind},
    dao::{
        participant_table::{ParticipantTable, memory::MemoryParticipantTable},
        storage::StorageError,
    },
    routes,
    services::{reveal_service, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = config.store();
    let app_state = AppState::new(config);

    let status_broadcaster = storage_supervisor::spawn_status_broadcaster(&app_state);
    let reveal_broadcaster = reveal_service::spawn_broadcaster(&app_state);
    let supervisor = tokio::spawn(run_storage_supervisor(app_state.clone(), store));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, store = store.as_str(), "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    // Dropping the supervisor future drops its sync handle, which unsubscribes the feed.
    supervisor.abort();
    status_broadcaster.abort();
    reveal_broadcaster.abort();
    info!("participant sync stopped");

    Ok(())
}

/// Run the storage supervisor against the configured backend.
async fn run_storage_supervisor(state: SharedState, store: StoreKind) {
    match store {
        StoreKind::Memory => {
            let table = MemoryParticipantTable::new();
            storage_supervisor::run(state, move || {
                let table: Arc<dyn ParticipantTable> = Arc::new(table.clone());
                async move { Ok::<_, StorageError>(table) }
            })
            .await
        }
        #[cfg(feature = "couch-store")]
        StoreKind::Couch => {
            use scoreboard_back::dao::participant_table::couchdb::{
                CouchConfig, CouchParticipantTable,
            };

            storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env().map_err(StorageError::from)?;
                let table = CouchParticipantTable::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok::<_, StorageError>(Arc::new(table) as Arc<dyn ParticipantTable>)
            })
            .await
        }
        #[cfg(feature = "mongo-store")]
        StoreKind::Mongo => {
            use scoreboard_back::dao::participant_table::mongodb::{
                MongoConfig, MongoParticipantTable,
            };

            storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
                let table = MongoParticipantTable::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok::<_, StorageError>(Arc::new(table) as Arc<dyn ParticipantTable>)
            })
            .await
        }
        #[allow(unreachable_patterns)]
        other => {
            warn!(
                store = other.as_str(),
                "backend not compiled into this binary; staying in degraded mode"
            );
            drop(state);
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
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

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
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
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
