//! Identity provider the access guard reads sessions from.
//!
//! [`SessionStore`] keeps accounts and active session tokens in memory. It
//! reports [`LoadingState::Pending`] until accounts have been loaded, so the
//! guard can tell "still starting" apart from "nobody signed in".

use std::collections::HashMap;
use std::path::Path;

use axum::http::{header, HeaderMap};
use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, LoadingState, Session, SignInResponse, User};

/// Cookie carrying the session token for browser navigation.
pub const SESSION_COOKIE: &str = "wm_session";

/// Identity provider errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Identity provider is still loading")]
    Pending,

    #[error("Invalid username or access key")]
    InvalidCredentials,

    #[error("Failed to read accounts file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse accounts file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of the current [`Session`] for a request.
pub trait IdentityProvider: Send + Sync {
    /// Resolve the session for a presented token (or none).
    fn session(&self, token: Option<&str>) -> Session;
}

#[derive(Default)]
struct StoreState {
    ready: bool,
    accounts: HashMap<String, (Account, User)>,
    sessions: HashMap<String, User>,
}

/// In-memory identity provider.
#[derive(Default)]
pub struct SessionStore {
    state: RwLock<StoreState>,
}

impl SessionStore {
    /// A store that stays pending until accounts are loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ready store with the given accounts.
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        let store = Self::new();
        store.load_accounts(accounts);
        store
    }

    pub fn loading_state(&self) -> LoadingState {
        if self.state.read().ready {
            LoadingState::Ready
        } else {
            LoadingState::Pending
        }
    }

    /// Replace the known accounts and mark the store ready.
    ///
    /// Active sessions survive only if their account still exists with the same role.
    pub fn load_accounts(&self, accounts: Vec<Account>) {
        let mut state = self.state.write();

        state.accounts = accounts
            .into_iter()
            .map(|account| {
                let user = User {
                    id: Uuid::new_v4(),
                    username: account.username.clone(),
                    display_name: account.display_name.clone(),
                    role: account.role.clone(),
                };
                (account.username.clone(), (account, user))
            })
            .collect();

        let accounts = &state.accounts;
        let retained: HashMap<String, User> = state
            .sessions
            .iter()
            .filter_map(|(token, user)| {
                accounts
                    .get(&user.username)
                    .filter(|(_, current)| current.role == user.role)
                    .map(|(_, current)| (token.clone(), current.clone()))
            })
            .collect();
        state.sessions = retained;
        state.ready = true;

        tracing::info!(accounts = state.accounts.len(), "Identity provider ready");
    }

    /// Load accounts from a JSON file holding an array of [`Account`]s.
    ///
    /// A missing file yields a ready store with no accounts. On any other error
    /// the store is left as it was.
    pub async fn load_accounts_file(&self, path: &Path) -> Result<usize, AuthError> {
        let accounts: Vec<Account> = match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Accounts file not found, nobody can sign in");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        let count = accounts.len();
        self.load_accounts(accounts);
        Ok(count)
    }

    /// Check credentials and open a new session.
    pub fn sign_in(&self, username: &str, access_key: &str) -> Result<SignInResponse, AuthError> {
        let mut state = self.state.write();
        if !state.ready {
            return Err(AuthError::Pending);
        }

        let user = match state.accounts.get(username) {
            Some((account, user)) if account.access_key == access_key => user.clone(),
            _ => {
                tracing::warn!(username, "Rejected sign-in");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = Uuid::new_v4().simple().to_string();
        state.sessions.insert(token.clone(), user.clone());
        tracing::info!(username, role = %user.role, "User signed in");

        Ok(SignInResponse {
            token,
            user,
            signed_in_at: Utc::now(),
        })
    }

    /// End a session. Returns false if the token was not active.
    pub fn sign_out(&self, token: &str) -> bool {
        let removed = self.state.write().sessions.remove(token);
        if let Some(user) = &removed {
            tracing::info!(username = %user.username, "User signed out");
        }
        removed.is_some()
    }

    pub fn active_sessions(&self) -> usize {
        self.state.read().sessions.len()
    }
}

impl IdentityProvider for SessionStore {
    fn session(&self, token: Option<&str>) -> Session {
        let state = self.state.read();
        if !state.ready {
            return Session::pending();
        }

        match token.and_then(|token| state.sessions.get(token)) {
            Some(user) => Session::signed_in(user.clone()),
            None => Session::anonymous(),
        }
    }
}

/// Extract a session token from `Authorization: Bearer` or the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn account(username: &str, role: &str) -> Account {
        Account {
            username: username.to_string(),
            access_key: format!("{}-key", username),
            display_name: username.to_uppercase(),
            role: role.to_string(),
        }
    }

    #[test]
    fn new_store_is_pending() {
        let store = SessionStore::new();
        assert_eq!(store.loading_state(), LoadingState::Pending);
        assert_eq!(store.session(Some("anything")), Session::pending());
    }

    #[test]
    fn sign_in_while_pending_is_rejected() {
        let store = SessionStore::new();
        assert!(matches!(
            store.sign_in("admin", "admin-key"),
            Err(AuthError::Pending)
        ));
    }

    #[test]
    fn sign_in_opens_a_session_for_the_token() {
        let store = SessionStore::with_accounts(vec![account("dinas", "admin")]);

        let response = store.sign_in("dinas", "dinas-key").unwrap();
        let session = store.session(Some(response.token.as_str()));

        assert!(session.is_ready());
        assert_eq!(session.role.as_deref(), Some("admin"));
        assert_eq!(session.identity.unwrap().username, "dinas");
    }

    #[test]
    fn wrong_access_key_is_rejected() {
        let store = SessionStore::with_accounts(vec![account("dinas", "admin")]);
        assert!(matches!(
            store.sign_in("dinas", "nope"),
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(store.active_sessions(), 0);
    }

    #[test]
    fn sign_out_returns_store_to_anonymous() {
        let store = SessionStore::with_accounts(vec![account("petugas", "staff")]);
        let response = store.sign_in("petugas", "petugas-key").unwrap();

        assert!(store.sign_out(&response.token));
        assert!(!store.sign_out(&response.token));
        assert_eq!(store.session(Some(response.token.as_str())), Session::anonymous());
    }

    #[test]
    fn reloading_accounts_drops_sessions_whose_role_changed() {
        let store = SessionStore::with_accounts(vec![
            account("a", "admin"),
            account("b", "staff"),
        ]);
        let a = store.sign_in("a", "a-key").unwrap();
        let b = store.sign_in("b", "b-key").unwrap();

        store.load_accounts(vec![account("a", "admin"), account("b", "admin")]);

        assert!(store.session(Some(a.token.as_str())).identity.is_some());
        assert!(store.session(Some(b.token.as_str())).identity.is_none());
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn extracts_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; wm_session=tok42; lang=id"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("tok42"));
    }

    #[test]
    fn no_credentials_yields_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(extract_token(&headers).is_none());
    }

    #[tokio::test]
    async fn missing_accounts_file_makes_store_ready_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new();

        let count = store
            .load_accounts_file(&dir.path().join("accounts.json"))
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert_eq!(store.loading_state(), LoadingState::Ready);
    }

    #[tokio::test]
    async fn loads_accounts_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(
            &path,
            r#"[{"username":"dinas","access_key":"k","display_name":"Dinas LH","role":"admin"}]"#,
        )
        .unwrap();

        let store = SessionStore::new();
        assert_eq!(store.load_accounts_file(&path).await.unwrap(), 1);
        assert!(store.sign_in("dinas", "k").is_ok());
    }

    #[tokio::test]
    async fn malformed_accounts_file_is_an_error_and_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "not json").unwrap();

        let store = SessionStore::new();
        let err = store.load_accounts_file(&path).await.unwrap_err();

        assert!(matches!(err, AuthError::Parse(_)));
        assert!(err.to_string().starts_with("Failed to parse accounts file"));
        assert_eq!(store.loading_state(), LoadingState::Pending);
    }

    #[tokio::test]
    async fn malformed_reload_keeps_existing_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, r#"[{"username":"dinas"}]"#).unwrap();

        let store = SessionStore::with_accounts(vec![account("dinas", "admin")]);
        assert!(store.load_accounts_file(&path).await.is_err());

        assert_eq!(store.loading_state(), LoadingState::Ready);
        assert!(store.sign_in("dinas", "dinas-key").is_ok());
    }
}
