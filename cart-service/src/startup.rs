//! Application startup and lifecycle management.

use crate::config::CartConfig;
use crate::handlers;
use crate::services::{CartService, MongoCartStore, MongoDb};
use axum::{
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<dyn CartService>,
}

impl AppState {
    pub fn new(carts: Arc<dyn CartService>) -> Self {
        Self { carts }
    }
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/carts", post(handlers::create_cart))
        .route("/carts/:cart_id", get(handlers::view_cart))
        .route("/carts/:cart_id/items", post(handlers::add_to_cart))
        .route(
            "/carts/:cart_id/items/:item_id",
            delete(handlers::remove_from_cart),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    shutdown_grace_period: Duration,
}

impl Application {
    /// Connects to MongoDB and binds the listener. A failed connection is fatal.
    pub async fn build(config: CartConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(&config.mongodb).await?;
        let store = MongoCartStore::new(&db, &config.mongodb.collection);

        Self::with_store(&config, Arc::new(store)).await
    }

    /// Binds the listener in front of an already constructed store.
    pub async fn with_store(
        config: &CartConfig,
        carts: Arc<dyn CartService>,
    ) -> Result<Self, AppError> {
        let router = build_router(AppState::new(carts), config.request_timeout);

        // Port 0 binds a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
            shutdown_grace_period: config.shutdown_grace_period,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serves until SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        self.run_with_shutdown(shutdown_signal()).await
    }

    pub async fn run_with_shutdown<F>(self, signal: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send,
    {
        serve_with_shutdown(
            self.listener,
            self.router,
            self.shutdown_grace_period,
            signal,
        )
        .await
    }
}

/// Serves `router` on `listener` until `signal` resolves.
///
/// After the signal no new connections are accepted and every open
/// connection is asked to finish its current request. Connections still
/// open when `grace_period` runs out are dropped and an error is returned.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    router: Router,
    grace_period: Duration,
    signal: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send,
{
    let draining = CancellationToken::new();
    let mut connections = JoinSet::new();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, remote_addr)) => {
                    connections.spawn(serve_connection(
                        stream,
                        remote_addr,
                        router.clone(),
                        draining.clone(),
                    ));
                }
                Err(e) => {
                    // Usually EMFILE; back off instead of spinning
                    tracing::warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("Connection task failed: {}", e);
                }
            }
            _ = &mut signal => break,
        }
    }

    drop(listener);
    tracing::info!(
        grace_period = ?grace_period,
        open_connections = connections.len(),
        "Server shutting down"
    );
    draining.cancel();

    let drained = tokio::time::timeout(grace_period, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        let open_connections = connections.len();
        connections.shutdown().await;
        tracing::error!(
            grace_period = ?grace_period,
            open_connections,
            "Connections still open after grace period, closed them"
        );
        return Err(AppError::InternalError(anyhow::anyhow!(
            "server did not stop within {:?}",
            grace_period
        )));
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    router: Router,
    draining: CancellationToken,
) {
    let conn = http1::Builder::new()
        .timer(TokioTimer::new())
        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(router));
    tokio::pin!(conn);

    let mut closing = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(%remote_addr, "Connection closed with error: {}", e);
                }
                break;
            }
            _ = draining.cancelled(), if !closing => {
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
