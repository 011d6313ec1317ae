//! Listener bootstrap
//!
//! Builds the application and metrics routers, binds one TCP listener for
//! each and serves them on independent tasks. Either listener failing ends
//! [`Server::serve`] with an error; there is no retry and no fallback port.

use axum::{Router, middleware, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers;
use crate::metrics::{self, AppMetrics, HostMetrics};
use crate::middleware::request_id::request_id_middleware;
use crate::sampler::SystemSampler;

const APP_LISTENER: &str = "application";
const METRICS_LISTENER: &str = "metrics";

/// Router for the application listener: every path and method is counted
pub fn app_router(app_metrics: AppMetrics) -> Router {
    Router::new()
        .fallback(handlers::app::handler)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(app_metrics)
}

/// Router for the metrics listener: only `GET /metrics`
pub fn metrics_router(host_metrics: HostMetrics) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics::handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(host_metrics)
}

/// Both listeners, bound and ready to serve
pub struct Server {
    app_listener: TcpListener,
    app_addr: SocketAddr,
    app_router: Router,
    metrics_listener: TcpListener,
    metrics_addr: SocketAddr,
    metrics_router: Router,
}

impl Server {
    /// Bind the application and metrics listeners
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Bind`] naming the listener that could not bind.
    pub async fn bind(
        config: &Config,
        app_metrics: AppMetrics,
        host_metrics: HostMetrics,
    ) -> AppResult<Self> {
        let (app_listener, app_addr) = bind_listener(APP_LISTENER, config.app_addr()?).await?;
        let (metrics_listener, metrics_addr) =
            bind_listener(METRICS_LISTENER, config.metrics_addr()?).await?;

        Ok(Self {
            app_listener,
            app_addr,
            app_router: app_router(app_metrics),
            metrics_listener,
            metrics_addr,
            metrics_router: metrics_router(host_metrics),
        })
    }

    /// Address the application listener is bound to
    pub fn app_addr(&self) -> SocketAddr {
        self.app_addr
    }

    /// Address the metrics listener is bound to
    pub fn metrics_addr(&self) -> SocketAddr {
        self.metrics_addr
    }

    /// Serve both listeners until one of them fails
    ///
    /// Each listener runs on its own spawned task. This future only
    /// completes when a listener stops, and always with an error.
    pub async fn serve(self) -> AppResult<()> {
        tracing::info!("App server listening on {}", self.app_addr);
        tracing::info!(
            "Hardware metrics server listening on {} (scrape http://{}/metrics)",
            self.metrics_addr,
            self.metrics_addr
        );

        let app_task = tokio::spawn(serve_listener(
            APP_LISTENER,
            self.app_listener,
            self.app_router,
        ));
        let metrics_task = tokio::spawn(serve_listener(
            METRICS_LISTENER,
            self.metrics_listener,
            self.metrics_router,
        ));

        let result = tokio::select! {
            joined = app_task => flatten_join(APP_LISTENER, joined),
            joined = metrics_task => flatten_join(METRICS_LISTENER, joined),
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, "Listener failed, shutting down");
        }
        result
    }
}

/// Build both registries from configuration, bind and serve forever
///
/// Registration and binding happen before any request is accepted, so a
/// duplicate metric name or an unavailable port fails start-up.
pub async fn run(config: Config) -> AppResult<()> {
    let app_metrics = AppMetrics::new()?;

    let sampler = SystemSampler::new(&config.host.disk_mount_point);
    tracing::debug!(
        disk_mount_point = %sampler.disk_mount_point().display(),
        "Host sampler ready"
    );
    let host_metrics = HostMetrics::new(Arc::new(sampler))?;

    metrics::ensure_disjoint(&app_metrics, &host_metrics)?;

    let server = Server::bind(&config, app_metrics, host_metrics).await?;
    server.serve().await
}

async fn bind_listener(
    listener: &'static str,
    addr: SocketAddr,
) -> AppResult<(TcpListener, SocketAddr)> {
    let bind_error = |source| AppError::Bind {
        listener,
        addr,
        source,
    };

    let tcp = TcpListener::bind(addr).await.map_err(bind_error)?;
    let local = tcp.local_addr().map_err(bind_error)?;
    Ok((tcp, local))
}

async fn serve_listener(
    listener: &'static str,
    tcp: TcpListener,
    router: Router,
) -> AppResult<()> {
    axum::serve(tcp, router)
        .await
        .map_err(|source| AppError::Serve { listener, source })?;

    Err(AppError::Internal(format!(
        "{} listener stopped serving",
        listener
    )))
}

fn flatten_join(listener: &'static str, joined: Result<AppResult<()>, JoinError>) -> AppResult<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(AppError::Internal(format!(
            "{} listener task aborted: {}",
            listener, e
        ))),
    }
}
