//! Catalog and auth API access.
//!
//! # Architecture
//!
//! - Plain REST over `reqwest` against the remote catalog service
//! - The service is source of truth - no local sync, direct API calls
//! - In-memory caching via `moka` for default read endpoints (5 minute TTL);
//!   search and filter queries always hit the service
//! - Successful writes invalidate the whole cache
//!
//! The session container consumes auth through the [`AuthApi`] seam; the
//! live [`ApiClient`] implements it and tests substitute fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use mercadito_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config);
//!
//! // Browse the catalog
//! let products = client.list_products(Some(10), Some(0)).await?;
//!
//! // Resolve a displayable image
//! let url = products[0].primary_image();
//! ```

mod cache;
mod client;
pub mod images;
pub mod types;

pub use client::ApiClient;
pub use images::{MalformedImageData, PLACEHOLDER_IMAGE};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when calling the catalog service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP status {status}: {body}")]
    Status {
        /// Response status code.
        status: reqwest::StatusCode,
        /// Leading snippet of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether the failure was an HTTP 401 rejection.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == reqwest::StatusCode::UNAUTHORIZED)
    }
}

/// Authentication operations consumed by the session container.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token pair.
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError>;

    /// Fetch the profile identified by `access_token`.
    async fn profile(&self, access_token: &str) -> Result<User, ApiError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            body: "{\"message\":\"EntityNotFoundError\"}".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP status 404 Not Found: {\"message\":\"EntityNotFoundError\"}"
        );
    }

    #[test]
    fn test_is_unauthorized_only_matches_401() {
        let unauthorized = ApiError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        let not_found = ApiError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!not_found.is_unauthorized());
    }
}
