//! Domain types for the catalog and auth APIs.
//!
//! These mirror the remote service's JSON shapes (wire field names preserved
//! via serde attributes) plus the local-only guest sentinel. Prices are
//! `rust_decimal::Decimal`: stored as strings for lossless persistence,
//! sent as JSON numbers on the write DTOs where the API expects them.

use std::fmt;

use mercadito_core::{CategoryId, Email, ProductId, Role, UserId};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::images;

// =============================================================================
// Catalog Types
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category ID.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Category image URL.
    pub image: String,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Product title.
    pub title: String,
    /// Unit price.
    pub price: Decimal,
    /// Plain text description.
    pub description: String,
    /// Owning category.
    pub category: Category,
    /// Image URLs. The remote service sometimes returns entries that are
    /// themselves JSON-encoded string arrays; use [`Product::image_at`] to
    /// resolve a displayable URL.
    #[serde(default)]
    pub images: Vec<String>,
}

impl Product {
    /// First displayable image URL, falling back to the placeholder.
    #[must_use]
    pub fn primary_image(&self) -> String {
        images::image_at(&self.images, 0)
    }

    /// Displayable image URL at `index`, falling back to the first image
    /// and then to the placeholder.
    #[must_use]
    pub fn image_at(&self, index: usize) -> String {
        images::image_at(&self.images, index)
    }
}

// =============================================================================
// Identity Types
// =============================================================================

/// A user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID; `0` is reserved for the guest sentinel.
    pub id: UserId,
    /// Email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Access role.
    pub role: Role,
    /// Avatar image URL.
    pub avatar: String,
    /// Whether this identity is the local guest sentinel. Remote profile
    /// payloads never carry this field, so it defaults to `false`.
    #[serde(default)]
    pub is_guest: bool,
}

impl User {
    /// The fixed guest identity for credential-less browsing.
    ///
    /// Local-only: never fetched from or sent to the remote service.
    #[must_use]
    pub fn guest() -> Self {
        Self {
            id: UserId::new(0),
            email: Email::parse("guest@mercadito.local").expect("guest email literal is valid"),
            name: "Invitado".to_owned(),
            role: Role::Customer,
            avatar: "https://api.lorem.space/image/face?w=150&h=150".to_owned(),
            is_guest: true,
        }
    }
}

// =============================================================================
// Auth Wire Types
// =============================================================================

/// Login credentials as entered in the login form.
///
/// The email is kept as the raw entered string; validation happens in the
/// session container before any network call.
#[derive(Clone)]
pub struct Credentials {
    /// Email address as entered.
    pub email: String,
    /// Password; exposed only at the wire boundary.
    pub password: SecretString,
}

impl Credentials {
    /// Build credentials from form input.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token pair returned by a successful login.
#[derive(Clone, Deserialize)]
pub struct TokenPair {
    /// Bearer token for authenticated requests.
    pub access_token: String,
    /// Token for refreshing the access token.
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Write DTOs
// =============================================================================

/// Payload for creating a product.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProductDto {
    /// Product title.
    pub title: String,
    /// Unit price; the API expects a JSON number here.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Plain text description.
    pub description: String,
    /// Owning category.
    #[serde(rename = "categoryId")]
    pub category_id: CategoryId,
    /// Image URLs.
    pub images: Vec<String>,
}

/// Payload for a partial product update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProductDto {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New unit price.
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Decimal>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New owning category.
    #[serde(rename = "categoryId", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// Replacement image list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Response from a file upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    /// File name as uploaded.
    #[serde(rename = "originalname")]
    pub original_name: String,
    /// Name assigned by the server.
    pub filename: String,
    /// Public URL of the stored file.
    pub location: String,
}

// =============================================================================
// Client-Side Filtering
// =============================================================================

/// Filter `products` by a free-text query and an optional category.
///
/// The query matches case-insensitively against title and description; a
/// blank query matches everything. The category, when given, must match
/// exactly. Order is preserved.
#[must_use]
pub fn filter_products<'a>(
    products: &'a [Product],
    query: &str,
    category: Option<CategoryId>,
) -> Vec<&'a Product> {
    let query = query.trim().to_lowercase();
    products
        .iter()
        .filter(|product| {
            query.is_empty()
                || product.title.to_lowercase().contains(&query)
                || product.description.to_lowercase().contains(&query)
        })
        .filter(|product| category.is_none_or(|id| product.category.id == id))
        .collect()
}
