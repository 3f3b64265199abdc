use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::identity::{extract_token, AuthError, IdentityProvider, SESSION_COOKIE};
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Map identity errors to a status the client can act on.
fn auth_error(e: AuthError) -> (StatusCode, String) {
    match e {
        AuthError::Pending => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, e.to_string()),
        AuthError::Io(_) | AuthError::Parse(_) => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn unknown_dataset(key: &DatasetKey) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("Unknown dataset: {}", key) })),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Authentication
// ============================================================

pub async fn sign_in(
    State(state): State<AppState>,
    Json(input): Json<SignInInput>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let response = state
        .identity
        .sign_in(&input.username, &input.access_key)
        .map_err(auth_error)?;

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, response.token
    );
    Ok(([(header::SET_COOKIE, cookie)], Json(response)))
}

pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = extract_token(&headers) {
        state.identity.sign_out(&token);
    }

    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);
    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)])
}

pub async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionSummary> {
    let token = extract_token(&headers);
    Json(state.identity.session(token.as_deref()).into())
}

// ============================================================
// Datasets
// ============================================================

pub async fn list_datasets(State(state): State<AppState>) -> Json<Vec<DatasetState>> {
    let states = state
        .datasets
        .keys()
        .map(|key| DatasetState::from_entry(key.clone(), &state.cache.snapshot(key)))
        .collect();
    Json(states)
}

/// Serve a dataset, waiting for its (single) fetch if it has not settled yet.
pub async fn get_dataset(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let key = DatasetKey::new(key);
    if !state.datasets.contains(&key) {
        return unknown_dataset(&key).into_response();
    }

    let mut subscription = state.cache.request(&key);
    settled_response(subscription.settled().await)
}

/// Explicitly refetch a failed dataset.
pub async fn retry_dataset(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let key = DatasetKey::new(key);
    if !state.datasets.contains(&key) {
        return unknown_dataset(&key).into_response();
    }

    let mut subscription = state.cache.retry(&key);
    let entry = subscription.settled().await;
    Json(DatasetState::from_entry(key, &entry)).into_response()
}

fn settled_response(entry: CacheEntry) -> Response {
    match (entry.status, entry.data) {
        (CacheStatus::Loaded, Some(data)) => match serde_json::to_vec(data.as_ref()) {
            Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize dataset: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        },
        _ => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({
                "status": entry.status,
                "error": entry.error_message,
            })),
        )
            .into_response(),
    }
}

// ============================================================
// Public pages
// ============================================================

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    Json(serde_json::json!({
        "page": "login",
        "return_to": query.return_to.unwrap_or_else(|| "/dashboard".to_string()),
    }))
}

pub async fn unauthorized_page() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({
            "page": "unauthorized",
            "message": "Your role does not have access to this page",
        })),
    )
}
