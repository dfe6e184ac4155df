use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use twosign_shared::{AgreementState, Role, SignRequest, SignResponse};

use crate::error::ApiError;
use crate::state::{AppState, MAX_BODY_BYTES};

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/sign", post(sign_handler))
        .route("/ping", get(ping_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<AgreementState>, ApiError> {
    let agreement = state.service.status().await?;
    Ok(Json(agreement))
}

pub async fn sign_handler(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<SignResponse>, ApiError> {
    let Json(body) = payload?;
    // The role is checked before the rest of the body, so an unknown role is
    // reported as such even when other fields are missing.
    let role = body
        .get("role")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    role.parse::<Role>()?;
    let request: SignRequest =
        serde_json::from_value(body).map_err(|error| ApiError::BadRequest(error.to_string()))?;
    let agreement = state
        .service
        .sign(&request.role, request.signature, request.date)
        .await?;
    Ok(Json(SignResponse {
        success: true,
        data: agreement,
    }))
}
