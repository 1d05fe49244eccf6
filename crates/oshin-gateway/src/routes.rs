//! API route handlers for the gateway.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use oshin_core::error::OshinError;
use oshin_core::types::{StatusKind, Submission};
use serde::Deserialize;

use super::server::AppState;

/// Slash-command style form body.
#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
}

/// Error response: `{"ok": false, "error": "..."}`.
pub struct ApiError(OshinError);

impl From<OshinError> for ApiError {
    fn from(e: OshinError) -> Self {
        Self(e)
    }
}

pub fn status_for(e: &OshinError) -> StatusCode {
    match e {
        OshinError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        OshinError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "ok": false,
            "error": self.0.to_string(),
        }));
        (status_for(&self.0), body).into_response()
    }
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "oshin-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// System information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let routing = state.router.routing();
    Json(serde_json::json!({
        "name": "oshin",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "routing_rules": routing.len(),
        "destinations": routing.rules().iter().map(|r| r.destination.as_str()).collect::<Vec<_>>(),
    }))
}

async fn submit(
    state: &AppState,
    kind: StatusKind,
    form: SubmitForm,
) -> Result<Json<serde_json::Value>, ApiError> {
    if form.user_id.trim().is_empty() {
        return Err(OshinError::invalid_input("user_id is required").into());
    }
    let name = if form.user_name.trim().is_empty() {
        form.user_id.clone()
    } else {
        form.user_name
    };
    let submission = Submission::new(kind, form.text, form.user_id, name);
    let report = state.router.submit(submission).await?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "id": report.item.id,
        "delivered": report.delivered,
        "failed": report.failed,
    })))
}

/// `POST /on`: what someone is working on.
pub async fn submit_on(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmitForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    submit(&state, StatusKind::On, form).await
}

/// `POST /til`: something learned today.
pub async fn submit_til(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmitForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    submit(&state, StatusKind::Til, form).await
}

/// `POST /done`: something finished.
pub async fn submit_done(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmitForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    submit(&state, StatusKind::Done, form).await
}
