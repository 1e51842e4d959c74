//! Prometheus scrape endpoint.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::server::AppState;

/// Prometheus metrics endpoint handler.
///
/// Returns metrics in Prometheus text exposition format. Unauthenticated so
/// scrapers can reach it.
pub async fn prometheus_metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics_handle.as_ref() {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not enabled".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::server::serve, tokio_util::sync::CancellationToken};

    #[tokio::test]
    async fn metrics_unavailable_without_recorder() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = tokio::spawn(async move {
            serve(listener, AppState::new("0"), token)
                .await
                .expect("serve liveness app");
        });

        let resp = reqwest::get(format!("http://{addr}/metrics"))
            .await
            .expect("GET /metrics");
        assert_eq!(resp.status(), 503);

        shutdown.cancel();
        task.await.expect("join server");
    }
}
