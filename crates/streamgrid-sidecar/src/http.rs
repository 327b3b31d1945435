//! The sidecar's HTTP surface: source ingestion, readiness, pre-stop,
//! and metrics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use tokio::sync::{mpsc, Notify};
use tracing::debug;

use streamgrid_metrics::{render_prometheus, Registry};

#[derive(Clone)]
pub struct HttpState {
    /// Channels feeding the declared HTTP sources.
    pub senders: Arc<HashMap<String, mpsc::Sender<Vec<u8>>>>,
    pub registry: Registry,
    /// False until sources are started, and again once stopping.
    pub ready: Arc<AtomicBool>,
    /// Fired by the scheduler's pre-stop hook to begin shutdown.
    pub pre_stop: Arc<Notify>,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .route("/pre-stop", post(pre_stop))
        .route("/sources/{name}", post(push_source))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn ready(State(state): State<HttpState>) -> StatusCode {
    if state.ready.load(Ordering::Acquire) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn pre_stop(State(state): State<HttpState>) -> StatusCode {
    debug!("pre-stop requested");
    state.ready.store(false, Ordering::Release);
    state.pre_stop.notify_one();
    StatusCode::NO_CONTENT
}

async fn push_source(
    State(state): State<HttpState>,
    Path(name): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    if !state.ready.load(Ordering::Acquire) {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    match state.senders.get(&name) {
        Some(tx) => match tx.send(body.to_vec()).await {
            Ok(()) => StatusCode::NO_CONTENT,
            Err(_) => StatusCode::SERVICE_UNAVAILABLE,
        },
        None => StatusCode::NOT_FOUND,
    }
}

async fn metrics(State(state): State<HttpState>) -> String {
    render_prometheus(&state.registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> (HttpState, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(8);
        let mut senders = HashMap::new();
        senders.insert("in".to_string(), tx);
        (
            HttpState {
                senders: Arc::new(senders),
                registry: Registry::new(),
                ready: Arc::new(AtomicBool::new(true)),
                pre_stop: Arc::new(Notify::new()),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn push_routes_to_the_named_source() {
        let (state, mut rx) = test_state();
        let app = router(state);

        let resp = app
            .oneshot(
                Request::post("/sources/in")
                    .body(Body::from("payload"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(rx.recv().await.unwrap(), b"payload".to_vec());
    }

    #[tokio::test]
    async fn unknown_source_is_not_found() {
        let (state, _rx) = test_state();
        let app = router(state);

        let resp = app
            .oneshot(Request::post("/sources/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn not_ready_rejects_ingestion() {
        let (state, _rx) = test_state();
        state.ready.store(false, Ordering::Release);
        let app = router(state);

        let resp = app
            .oneshot(
                Request::post("/sources/in")
                    .body(Body::from("payload"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn metrics_render_registered_counters() {
        let (state, _rx) = test_state();
        state
            .registry
            .counter_vec("sinks_total", "Total.", &["sinkName", "replica"])
            .with_label_values(&["out", "0"])
            .inc();
        let app = router(state);

        let resp = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("sinks_total{sinkName=\"out\",replica=\"0\"} 1"));
    }

    #[tokio::test]
    async fn pre_stop_flips_readiness_and_notifies() {
        let (state, _rx) = test_state();
        let notified = state.pre_stop.clone();
        let app = router(state.clone());

        let wait = tokio::spawn(async move { notified.notified().await });
        let resp = app
            .oneshot(Request::post("/pre-stop").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(!state.ready.load(Ordering::Acquire));
        wait.await.unwrap();
    }
}
