//! Navigation access control.
//!
//! Pure policy consumed by the view layer before activating a protected
//! route. The session container supplies the [`AccessLevel`]; the verdict
//! says where to go instead when access is denied.

use serde::{Deserialize, Serialize};

/// Well-known route paths.
pub mod paths {
    /// Login entry point.
    pub const LOGIN: &str = "/login";
    /// Catalog listing; the guest fallback target.
    pub const PRODUCTS: &str = "/products";
    /// Shopping cart.
    pub const CART: &str = "/cart";
}

/// What the current session is allowed to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// No session; only public routes.
    Unauthenticated,
    /// Guest sentinel; browsing only.
    Guest,
    /// Authenticated user; everything.
    Full,
}

/// Verdict for one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Proceed to the requested path.
    Allow,
    /// Redirect to the login page, carrying the original target for the
    /// post-login redirect.
    RedirectToLogin {
        /// Path the user wanted before being sent to login.
        return_to: String,
    },
    /// Redirect to the catalog listing.
    RedirectToCatalog,
}

/// Decide whether a navigation to `path` may proceed.
///
/// Guests are kept away from create and edit routes and from the cart; the
/// matching mirrors the route layout (`/products/create`,
/// `/products/edit/{id}`, exactly `/cart`).
#[must_use]
pub fn check_navigation(level: AccessLevel, path: &str) -> GuardOutcome {
    match level {
        AccessLevel::Unauthenticated => GuardOutcome::RedirectToLogin {
            return_to: path.to_owned(),
        },
        AccessLevel::Guest if is_guest_restricted(path) => GuardOutcome::RedirectToCatalog,
        AccessLevel::Guest | AccessLevel::Full => GuardOutcome::Allow,
    }
}

/// Guests may browse the catalog but not mutate it or check out.
fn is_guest_restricted(path: &str) -> bool {
    path.contains("/create") || path.contains("/edit/") || path == paths::CART
}

/// Navigation sink implemented by the view layer.
///
/// The session container's logout signal and checkout's post-purchase
/// redirect go through it.
pub trait Navigator: Send + Sync {
    /// Move the UI to `path`.
    fn navigate(&self, path: &str);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_redirects_to_login_with_return_target() {
        for path in ["/products", "/products/42", "/cart"] {
            assert_eq!(
                check_navigation(AccessLevel::Unauthenticated, path),
                GuardOutcome::RedirectToLogin {
                    return_to: path.to_owned()
                },
                "path {path}"
            );
        }
    }

    #[test]
    fn test_guest_blocked_from_restricted_paths() {
        for path in ["/cart", "/products/create", "/products/edit/5"] {
            assert_eq!(
                check_navigation(AccessLevel::Guest, path),
                GuardOutcome::RedirectToCatalog,
                "path {path}"
            );
        }
    }

    #[test]
    fn test_guest_may_browse_catalog() {
        for path in ["/products", "/products/42"] {
            assert_eq!(
                check_navigation(AccessLevel::Guest, path),
                GuardOutcome::Allow,
                "path {path}"
            );
        }
    }

    #[test]
    fn test_cart_restriction_is_exact_match() {
        // Only the cart route itself is blocked for guests.
        assert_eq!(
            check_navigation(AccessLevel::Guest, "/cart/summary"),
            GuardOutcome::Allow
        );
    }

    #[test]
    fn test_full_access_reaches_everything() {
        for path in ["/products", "/products/create", "/products/edit/5", "/cart"] {
            assert_eq!(
                check_navigation(AccessLevel::Full, path),
                GuardOutcome::Allow,
                "path {path}"
            );
        }
    }
}
