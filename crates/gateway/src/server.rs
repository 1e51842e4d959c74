use std::net::{IpAddr, SocketAddr};

use {
    axum::{Json, Router, extract::State, response::IntoResponse, routing::get},
    tokio::net::TcpListener,
    tokio_util::sync::CancellationToken,
    tower_http::trace::TraceLayer,
    tracing::info,
};

#[cfg(feature = "metrics")]
use porter_metrics::{MetricsHandle, counter, http as http_metrics, labels};

/// Plain-text body returned by `GET /`.
pub const ROOT_BODY: &str = "porter is running";

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub version: String,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<MetricsHandle>,
}

impl AppState {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, handle: MetricsHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the liveness router (shared between production startup and tests).
pub fn build_gateway_app(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route(
        "/metrics",
        get(crate::metrics_routes::prometheus_metrics_handler),
    );

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Bind `bind:port` and serve until `shutdown` is cancelled.
pub async fn start_gateway(
    bind: &str,
    port: u16,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = match bind.parse::<IpAddr>() {
        Ok(ip) => TcpListener::bind(SocketAddr::new(ip, port)).await?,
        // Hostnames such as `localhost` go through the resolver.
        Err(_) => TcpListener::bind((bind, port)).await?,
    };
    serve(listener, state, shutdown).await
}

/// Serve on an already-bound listener until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "liveness endpoint listening");

    let app = build_gateway_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("liveness endpoint stopped");
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn root_handler() -> &'static str {
    #[cfg(feature = "metrics")]
    counter!(http_metrics::PROBES_TOTAL, labels::ENDPOINT => "/").increment(1);
    ROOT_BODY
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    #[cfg(feature = "metrics")]
    counter!(http_metrics::PROBES_TOTAL, labels::ENDPOINT => "/health").increment(1);
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
    }))
}
