//! Protected dashboard views and the roles each requires.

use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::guard::{middleware::access_guard, RequiredRoles};
use crate::models::{DatasetState, User};

/// A protected page of the dashboard.
#[derive(Debug)]
pub struct ViewSpec {
    pub path: &'static str,
    pub title: &'static str,
    /// Empty: any signed-in user.
    pub roles: &'static [&'static str],
    /// Map views pull every registered boundary dataset.
    pub uses_maps: bool,
}

pub const VIEWS: &[ViewSpec] = &[
    ViewSpec {
        path: "/dashboard",
        title: "Overview",
        roles: &[],
        uses_maps: false,
    },
    ViewSpec {
        path: "/maps",
        title: "Regional Maps",
        roles: &["admin", "staff"],
        uses_maps: true,
    },
    ViewSpec {
        path: "/waste-banks",
        title: "Waste Banks",
        roles: &["admin", "staff"],
        uses_maps: false,
    },
    ViewSpec {
        path: "/staff",
        title: "Staff",
        roles: &["admin"],
        uses_maps: false,
    },
    ViewSpec {
        path: "/reports",
        title: "Regional Performance",
        roles: &["admin"],
        uses_maps: false,
    },
];

impl ViewSpec {
    pub fn required_roles(&self) -> RequiredRoles {
        RequiredRoles::of(self.roles.iter().copied())
    }
}

/// What a view renders to once access is granted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewDocument {
    pub view: String,
    pub title: String,
    pub user: User,
    #[serde(default)]
    pub datasets: Vec<DatasetState>,
}

/// A router serving one view behind the access guard.
pub fn view_router(view: &'static ViewSpec, state: &AppState) -> Router<AppState> {
    let guard = state.guard(view.required_roles());
    Router::new()
        .route(
            view.path,
            get(
                move |State(state): State<AppState>, Extension(user): Extension<User>| async move {
                    render_view(view, &state, user)
                },
            ),
        )
        .route_layer(axum::middleware::from_fn_with_state(guard, access_guard))
}

/// Render a view. Map views request their datasets and report where each stands;
/// the client follows up on `/api/v1/datasets/{key}` for the features.
fn render_view(view: &ViewSpec, state: &AppState, user: User) -> Json<ViewDocument> {
    let datasets = if view.uses_maps {
        state
            .datasets
            .keys()
            .map(|key| {
                let subscription = state.cache.request(key);
                DatasetState::from_entry(key.clone(), &subscription.current())
            })
            .collect()
    } else {
        Vec::new()
    };

    Json(ViewDocument {
        view: view.path.to_string(),
        title: view.title.to_string(),
        user,
        datasets,
    })
}
