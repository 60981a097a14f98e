use std::future::Future;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;

pub fn metrics_router(registry: Registry, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics))
        .with_state(registry)
}

async fn metrics(State(registry): State<Registry>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = String::new();
    if let Err(err) = encoder.encode_utf8(&registry.gather(), &mut buffer) {
        log::error!("[metrics / server] - failed to encode metrics: {}", err);
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// Serves the metrics router until `shutdown` resolves.
pub async fn serve_metrics<F>(
    listener: TcpListener,
    registry: Registry,
    path: String,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("[metrics / server] - listening on http://{}{}", addr, path);
    }
    axum::serve(listener, metrics_router(registry, &path))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;
    use crate::{MetricsSink, PrometheusSink};

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let registry = Registry::new();
        let sink = PrometheusSink::new(&registry).unwrap();
        sink.register("http://example.test").unwrap();
        sink.record("http://example.test", true);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_metrics(listener, registry, "/metrics".to_string(), async move {
            let _ = rx.await;
        }));

        let resp = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body = resp.text().await.unwrap();
        assert!(body.contains("# TYPE alien_probe_count counter"));
        assert!(body.contains(r#"alien_probe_count{endpoint="http://example.test",success="true"} 1"#));
        assert!(body.contains(r#"alien_probe_count{endpoint="http://example.test",success="false"} 0"#));

        let resp = reqwest::get(format!("http://{}/other", addr)).await.unwrap();
        assert_eq!(resp.status(), 404);

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
