use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A signed-in dashboard user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    /// Role name checked by the access guard (e.g. `admin`, `staff`).
    pub role: String,
}

/// Whether the identity provider has finished resolving the current session.
///
/// - `Pending`: accounts are still loading, no decision can be made yet
/// - `Ready`: `identity` and `role` are authoritative
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadingState {
    Pending,
    Ready,
}

/// Authentication state of the active user, as reported by the identity provider.
///
/// The access guard only ever reads a `Session`; sign-in and sign-out are
/// owned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<User>,
    pub role: Option<String>,
    pub loading: LoadingState,
}

impl Session {
    /// The provider has not finished loading.
    pub fn pending() -> Self {
        Self {
            identity: None,
            role: None,
            loading: LoadingState::Pending,
        }
    }

    /// Ready, nobody signed in.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            role: None,
            loading: LoadingState::Ready,
        }
    }

    /// Ready, with `user` signed in under their own role.
    pub fn signed_in(user: User) -> Self {
        let role = Some(user.role.clone());
        Self {
            identity: Some(user),
            role,
            loading: LoadingState::Ready,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.loading == LoadingState::Ready
    }
}

/// Credentials the identity provider accepts, loaded from the accounts file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub access_key: String,
    pub display_name: String,
    pub role: String,
}

/// Input for signing in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInInput {
    pub username: String,
    pub access_key: String,
}

/// Response when signing in, carries the session token to present on later requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInResponse {
    pub token: String,
    pub user: User,
    pub signed_in_at: DateTime<Utc>,
}

/// Current session as reported by `GET /session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub loading: LoadingState,
    #[serde(default)]
    pub user: Option<User>,
}

impl From<Session> for SessionSummary {
    fn from(session: Session) -> Self {
        Self {
            loading: session.loading,
            user: session.identity,
        }
    }
}
