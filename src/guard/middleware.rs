//! HTTP enforcement of access decisions.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};

use super::{decide, Decision, NavigationTargets, RequiredRoles};
use crate::identity::{extract_token, IdentityProvider};

/// Everything the guard needs for one protected route.
#[derive(Clone)]
pub struct GuardState {
    pub identity: Arc<dyn IdentityProvider>,
    pub navigation: NavigationTargets,
    pub required: RequiredRoles,
}

impl GuardState {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        navigation: NavigationTargets,
        required: RequiredRoles,
    ) -> Self {
        Self {
            identity,
            navigation,
            required,
        }
    }
}

/// Decide on the current session, then redirect, show a placeholder or run the view.
///
/// On success the signed-in [`User`](crate::models::User) is added to the
/// request extensions for the view handler.
pub async fn access_guard(
    State(guard): State<GuardState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers());
    let session = guard.identity.session(token.as_deref());

    // Nested routers see a stripped URI; send people back to the one they asked for.
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());
    let requested = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let decision = decide(&session, &guard.required, &requested);
    tracing::debug!(path = %requested, ?decision, "Access decision");

    if let Some(redirect) = decision.redirect(&guard.navigation) {
        tracing::info!(path = %requested, location = %redirect.location, "Redirecting navigation");
        return Redirect::to(&redirect.location).into_response();
    }

    match decision {
        Decision::Loading => loading_placeholder(),
        _ => {
            if let Some(user) = session.identity {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
    }
}

fn loading_placeholder() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::RETRY_AFTER, "1")],
        Json(serde_json::json!({ "status": "loading" })),
    )
        .into_response()
}
