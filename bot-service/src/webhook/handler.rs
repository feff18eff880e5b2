use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use shared::{Action, InboundEvent, Result, Step, UserId};
use tower_http::trace::TraceLayer;
use workflow_service::{DispatchOutcome, Dispatcher as WorkflowDispatcher, ReplySender};

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<WorkflowDispatcher>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum EventResponse {
    Processed { step: Step, actions: Vec<Action> },
    Suppressed,
    Rejected { message: String },
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions: usize,
}

/// Buffers replies so they can be returned in the HTTP response body.
#[derive(Default)]
struct CollectingReplier {
    actions: Mutex<Vec<Action>>,
}

#[async_trait]
impl ReplySender for CollectingReplier {
    async fn send(&self, _user_id: &UserId, actions: &[Action]) -> Result<()> {
        self.actions
            .lock()
            .map_err(|e| shared::ServiceError::Internal(e.to_string()))?
            .extend_from_slice(actions);
        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(handle_event))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn handle_event(State(state): State<AppState>, Json(event): Json<InboundEvent>) -> Response {
    let user_id = match UserId::from_string(event.user_id.as_str()) {
        Ok(user_id) => user_id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(EventResponse::Rejected {
                    message: e.to_string(),
                }),
            )
                .into_response();
        }
    };
    let event = InboundEvent::new(user_id, event.text);

    let replier = CollectingReplier::default();

    match state.workflow.dispatch(event, &replier).await {
        Ok(DispatchOutcome::Processed { step, actions, .. }) => {
            (StatusCode::OK, Json(EventResponse::Processed { step, actions })).into_response()
        }
        Ok(DispatchOutcome::Suppressed) => {
            (StatusCode::ACCEPTED, Json(EventResponse::Suppressed)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Webhook event failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EventResponse::Rejected {
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        sessions: state.workflow.store().session_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{self, Body};
    use axum::http::Request;
    use shared::{CatalogConfig, WorkflowConfig};
    use tower::ServiceExt;
    use workflow_service::{StepEngine, WorkflowStore};

    fn test_app() -> Router {
        let config = WorkflowConfig::default();
        let store = Arc::new(WorkflowStore::new(config.duplicate_request_interval_ms));
        let engine = Arc::new(StepEngine::new(Arc::new(CatalogConfig::default()), &config));
        router(AppState {
            workflow: Arc::new(WorkflowDispatcher::new(store, engine)),
        })
    }

    fn event_request(user_id: &str, text: &str) -> Request<Body> {
        Request::post("/events")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "userId": user_id, "text": text }).to_string(),
            ))
            .expect("request")
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn test_event_is_processed() {
        let app = test_app();

        let response = app.oneshot(event_request("U1", "開始")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "processed");
        assert_eq!(body["step"], "ASK_INITIATOR");
        assert_eq!(body["actions"][0]["kind"], "prompt");
    }

    #[tokio::test]
    async fn test_retry_is_suppressed() {
        let app = test_app();

        let first = app.clone().oneshot(event_request("U1", "開始")).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);

        let retry = app.oneshot(event_request("U1", "開始")).await.expect("response");
        assert_eq!(retry.status(), StatusCode::ACCEPTED);
        assert_eq!(json_body(retry).await["status"], "suppressed");
    }

    #[tokio::test]
    async fn test_blank_user_is_rejected() {
        let app = test_app();

        let response = app.oneshot(event_request("  ", "開始")).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_padded_user_id_shares_session() {
        let app = test_app();

        let first = app.clone().oneshot(event_request("U1", "開始")).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);

        let padded = app
            .clone()
            .oneshot(event_request(" U1 ", "開始"))
            .await
            .expect("response");
        assert_eq!(padded.status(), StatusCode::ACCEPTED);

        let health = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(json_body(health).await["sessions"], 1);
    }

    #[tokio::test]
    async fn test_health_reports_sessions() {
        let app = test_app();

        app.clone().oneshot(event_request("U1", "開始")).await.expect("response");
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["sessions"], 1);
    }
}
