mod handlers;
pub mod middleware;
pub mod views;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::geo::{DatasetRegistry, GeoDataCache, GeoError, GeoSource, HttpGeoSource};
use crate::guard::{middleware::GuardState, NavigationTargets, RequiredRoles};
use crate::identity::SessionStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<SessionStore>,
    pub cache: Arc<GeoDataCache>,
    pub datasets: Arc<DatasetRegistry>,
    pub navigation: NavigationTargets,
    pub cors_origins: Option<Vec<String>>,
}

impl AppState {
    pub fn new(
        identity: Arc<SessionStore>,
        source: Arc<dyn GeoSource>,
        datasets: DatasetRegistry,
    ) -> Self {
        Self {
            identity,
            cache: Arc::new(GeoDataCache::new(source)),
            datasets: Arc::new(datasets),
            navigation: NavigationTargets::default(),
            cors_origins: None,
        }
    }

    /// State for a configured deployment, fetching datasets over HTTP.
    ///
    /// The identity store starts pending; load accounts into it separately.
    pub fn from_config(config: &AppConfig) -> Result<Self, GeoError> {
        let source = HttpGeoSource::with_timeout(
            config.geo_base_url.clone(),
            config.datasets.clone(),
            config.geo_timeout,
        )?;
        Ok(Self {
            identity: Arc::new(SessionStore::new()),
            cache: Arc::new(GeoDataCache::new(Arc::new(source))),
            datasets: Arc::new(config.datasets.clone()),
            navigation: config.navigation.clone(),
            cors_origins: config.cors_origins.clone(),
        })
    }

    /// Guard settings for a route requiring `required`.
    pub fn guard(&self, required: RequiredRoles) -> GuardState {
        GuardState::new(self.identity.clone(), self.navigation.clone(), required)
    }
}

pub fn create_router(state: AppState) -> Router {
    let admin_only = state.guard(RequiredRoles::of(["admin"]));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/auth/sign-out", post(handlers::sign_out))
        .route("/session", get(handlers::get_session))
        .route("/datasets", get(handlers::list_datasets))
        .route("/datasets/{key}", get(handlers::get_dataset))
        .route(
            "/datasets/{key}/retry",
            post(handlers::retry_dataset).route_layer(axum::middleware::from_fn_with_state(
                admin_only,
                crate::guard::middleware::access_guard,
            )),
        );

    let pages = views::VIEWS.iter().fold(
        Router::new()
            .route("/login", get(handlers::login_page))
            .route("/unauthorized", get(handlers::unauthorized_page)),
        |router, view| router.merge(views::view_router(view, &state)),
    );

    let cors = middleware::cors_layer(state.cors_origins.as_deref());

    Router::new()
        .nest("/api/v1", api)
        .merge(pages)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
