//! Role-gated access decisions for protected dashboard views.
//!
//! [`decide`] is a pure function of the current [`Session`], the view's
//! [`RequiredRoles`] and the requested location. Turning a decision into a
//! navigation side effect is a separate step ([`Decision::redirect`]), done by
//! the HTTP layer in [`middleware`].

pub mod middleware;

use std::collections::BTreeSet;

use crate::models::Session;

/// Role names allowed to view a resource. Empty means any signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredRoles(BTreeSet<String>);

impl RequiredRoles {
    /// Any signed-in user.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(roles.into_iter().map(Into::into).collect())
    }

    pub fn permits(&self, role: Option<&str>) -> bool {
        if self.0.is_empty() {
            return true;
        }
        role.is_some_and(|role| self.0.contains(role))
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The identity provider is still loading; show a placeholder.
    Loading,
    /// Nobody is signed in. `return_to` is where to go after signing in.
    RedirectToSignIn { return_to: String },
    /// Signed in, but the role is not allowed here.
    RedirectToUnauthorized,
    RenderContent,
}

/// Decide what to do with a navigation to `requested` given the current session.
pub fn decide(session: &Session, required: &RequiredRoles, requested: &str) -> Decision {
    if !session.is_ready() {
        return Decision::Loading;
    }

    if session.identity.is_none() {
        return Decision::RedirectToSignIn {
            return_to: requested.to_string(),
        };
    }

    if !required.permits(session.role.as_deref()) {
        return Decision::RedirectToUnauthorized;
    }

    Decision::RenderContent
}

/// Where redirects send the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTargets {
    pub sign_in: String,
    pub unauthorized: String,
}

impl Default for NavigationTargets {
    fn default() -> Self {
        Self {
            sign_in: "/login".to_string(),
            unauthorized: "/unauthorized".to_string(),
        }
    }
}

/// A navigation instruction for the caller to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

impl Decision {
    /// The redirect this decision calls for, if any.
    pub fn redirect(&self, targets: &NavigationTargets) -> Option<Redirect> {
        match self {
            Self::RedirectToSignIn { return_to } => Some(Redirect {
                location: format!(
                    "{}?returnTo={}",
                    targets.sign_in,
                    urlencoding::encode(return_to)
                ),
            }),
            Self::RedirectToUnauthorized => Some(Redirect {
                location: targets.unauthorized.clone(),
            }),
            Self::Loading | Self::RenderContent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_redirect_encodes_return_location() {
        let decision = Decision::RedirectToSignIn {
            return_to: "/maps?layer=rt&zoom=12".to_string(),
        };
        let redirect = decision.redirect(&NavigationTargets::default()).unwrap();
        assert_eq!(
            redirect.location,
            "/login?returnTo=%2Fmaps%3Flayer%3Drt%26zoom%3D12"
        );
    }

    #[test]
    fn unauthorized_redirect_uses_configured_target() {
        let targets = NavigationTargets {
            sign_in: "/masuk".to_string(),
            unauthorized: "/tidak-berwenang".to_string(),
        };
        let redirect = Decision::RedirectToUnauthorized.redirect(&targets).unwrap();
        assert_eq!(redirect.location, "/tidak-berwenang");
    }

    #[test]
    fn loading_and_render_have_no_redirect() {
        let targets = NavigationTargets::default();
        assert!(Decision::Loading.redirect(&targets).is_none());
        assert!(Decision::RenderContent.redirect(&targets).is_none());
    }

    #[test]
    fn empty_required_roles_permit_missing_role() {
        assert!(RequiredRoles::any().permits(None));
        assert!(!RequiredRoles::of(["admin"]).permits(None));
    }
}
