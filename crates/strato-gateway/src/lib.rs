//! HTTP transport for the provisioning emulator
//!
//! One form-encoded POST endpoint carries every action; the `Action`
//! field selects the handler through the engine's routing table and the
//! result tree is rendered by the injected markup encoder.

pub mod config;
pub mod encode;

pub use config::GatewayConfig;
pub use encode::{ResponseEncoder, XmlEncoder};

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use strato_common::{StratoError, REQUEST_ID};
use strato_engine::{ApiResponse, Engine};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub encoder: Arc<dyn ResponseEncoder>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", post(action_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn action_handler(
    State(state): State<AppState>,
    Form(bag): Form<HashMap<String, String>>,
) -> Response {
    let trace_id = Uuid::new_v4();

    let Some(action) = bag.get("Action").cloned() else {
        warn!(%trace_id, "request body carried no Action field");
        return error_response(
            &state,
            StatusCode::BAD_REQUEST,
            "MissingAction",
            "the request does not name an action",
        );
    };

    match state.engine.handle(&action, bag).await {
        Ok(response) => markup_response(&state, StatusCode::OK, &response),
        Err(e) => {
            let (status, code) = classify(&e);
            warn!(%trace_id, %action, error = %e, "action failed");
            error_response(&state, status, code, &e.to_string())
        }
    }
}

fn classify(e: &StratoError) -> (StatusCode, &'static str) {
    match e {
        StratoError::UnknownAction(_) => (StatusCode::BAD_REQUEST, "InvalidAction"),
        StratoError::Malformed(_) => (StatusCode::BAD_REQUEST, "MalformedRequest"),
        StratoError::NotFound { .. } => (StatusCode::BAD_REQUEST, "NotFound"),
        StratoError::Storage(_) | StratoError::Serialization(_) | StratoError::Io(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
        }
    }
}

fn markup_response(state: &AppState, status: StatusCode, response: &ApiResponse) -> Response {
    let body = state.encoder.encode(response);
    (
        status,
        [(header::CONTENT_TYPE, state.encoder.content_type())],
        body,
    )
        .into_response()
}

fn error_response(state: &AppState, status: StatusCode, code: &str, message: &str) -> Response {
    let response = ApiResponse {
        root: "ErrorResponse",
        body: json!({
            "requestId": REQUEST_ID,
            "error": { "code": code, "message": message },
        }),
    };
    markup_response(state, status, &response)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
