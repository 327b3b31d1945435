//! REST API handlers for the controller.
//!
//! Each handler reads/writes through the local scheduler and returns
//! JSON responses.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use streamgrid_metrics::{render_prometheus, Registry};
use streamgrid_scheduler::{LabelSelector, LocalScheduler, SchedulerClient};
use streamgrid_types::{keys, Step, StepKey};

#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<LocalScheduler>,
    pub registry: Registry,
}

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/steps", get(list_steps).post(apply_step))
        .route(
            "/api/v1/steps/{namespace}/{name}",
            get(get_step).delete(delete_step),
        )
        .route("/api/v1/steps/{namespace}/{name}/pods", get(list_step_pods))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// GET /api/v1/steps
async fn list_steps(State(state): State<ApiState>) -> impl IntoResponse {
    match state.scheduler.list_steps() {
        Ok(steps) => ApiResponse::ok(steps).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// POST /api/v1/steps
async fn apply_step(
    State(state): State<ApiState>,
    Json(step): Json<Step>,
) -> impl IntoResponse {
    if let Err(e) = step.spec.validate() {
        return error_response(&e.to_string(), StatusCode::UNPROCESSABLE_ENTITY).into_response();
    }
    match state.scheduler.apply_step(step) {
        Ok(applied) => (StatusCode::CREATED, ApiResponse::ok(applied)).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/v1/steps/{namespace}/{name}
async fn get_step(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.scheduler.get_step(&StepKey::new(namespace, name)).await {
        Ok(Some(step)) => ApiResponse::ok(step).into_response(),
        Ok(None) => error_response("step not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// DELETE /api/v1/steps/{namespace}/{name}
async fn delete_step(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.scheduler.delete_step(&StepKey::new(namespace, name)) {
        Ok(()) => ApiResponse::ok("deleted").into_response(),
        Err(e) if e.is_not_found() => {
            error_response("step not found", StatusCode::NOT_FOUND).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/v1/steps/{namespace}/{name}/pods
async fn list_step_pods(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let step = match state.scheduler.get_step(&StepKey::new(&namespace, &name)).await {
        Ok(Some(step)) => step,
        Ok(None) => {
            return error_response("step not found", StatusCode::NOT_FOUND).into_response()
        }
        Err(e) => {
            return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    };
    let selector = LabelSelector::from_pairs(&[
        (keys::KEY_PIPELINE_NAME, step.pipeline_name()),
        (keys::KEY_STEP_NAME, &step.spec.name),
    ]);
    match state.scheduler.list_pods(&namespace, &selector).await {
        Ok(pods) => ApiResponse::ok(pods).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /metrics
async fn metrics(State(state): State<ApiState>) -> String {
    render_prometheus(&state.registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use streamgrid_types::{ContainerTemplate, ObjectMeta, StepSpec};
    use tower::ServiceExt;

    fn test_state() -> ApiState {
        ApiState {
            scheduler: Arc::new(LocalScheduler::open_in_memory().unwrap()),
            registry: Registry::new(),
        }
    }

    fn test_step_json() -> String {
        let step = Step {
            metadata: ObjectMeta {
                namespace: "default".to_string(),
                name: "map".to_string(),
                ..Default::default()
            },
            spec: StepSpec {
                name: "map".to_string(),
                replicas: Some(2),
                container: ContainerTemplate {
                    image: "example/mapper:v1".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
            status: None,
        };
        serde_json::to_string(&step).unwrap()
    }

    #[tokio::test]
    async fn apply_then_get_round_trips() {
        let state = test_state();
        let app = router(state.clone());

        let resp = app
            .clone()
            .oneshot(
                Request::post("/api/v1/steps")
                    .header("content-type", "application/json")
                    .body(Body::from(test_step_json()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(
                Request::get("/api/v1/steps/default/map")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_spec_is_rejected() {
        let app = router(test_state());
        // Empty step name fails validation.
        let body = r#"{"metadata": {"namespace": "default", "name": "x"}, "spec": {"name": ""}}"#;

        let resp = app
            .oneshot(
                Request::post("/api/v1/steps")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_step_is_not_found() {
        let app = router(test_state());
        let resp = app
            .oneshot(
                Request::get("/api/v1/steps/default/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
