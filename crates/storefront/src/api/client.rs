//! Catalog and auth API client implementation.
//!
//! REST over `reqwest 0.13` against the remote catalog service. Default
//! read endpoints are cached with `moka` (5-minute TTL); search and filter
//! queries bypass the cache; any successful write drops the whole cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mercadito_core::{CategoryId, ProductId};
use moka::future::Cache;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::StorefrontConfig;

use super::cache::{CacheKey, CacheValue};
use super::types::{
    Category, CreateProductDto, Credentials, Product, TokenPair, UpdateProductDto, UploadedFile,
    User,
};
use super::{ApiError, AuthApi};

/// Login payload in the wire shape the auth endpoint expects.
#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the remote catalog and auth service.
///
/// Default product and category listings are cached for 5 minutes.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    #[must_use]
    pub fn new(config: &StorefrontConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.api_url.as_str().trim_end_matches('/').to_owned(),
                timeout: config.request_timeout,
                cache,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Send a request and decode the JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.timeout(self.inner.timeout).send().await?;
        Self::decode_response(response).await
    }

    async fn decode_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "catalog API returned non-success status"
            );
            return Err(ApiError::Status {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "failed to parse catalog API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a paginated product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Product>, ApiError> {
        let cache_key = CacheKey::Products { limit, offset };

        // Check cache
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut params = Vec::new();
        if let Some(limit) = limit {
            params.push(("limit", limit));
        }
        if let Some(offset) = offset {
            params.push(("offset", offset));
        }

        let request = self.inner.client.get(self.url("/products")).query(&params);
        let products: Vec<Product> = self.send(request).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the API request
    /// fails.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id);

        // Check cache
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self.inner.client.get(self.url(&format!("/products/{id}")));
        let product: Product = self.send(request).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Search products by title. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.url("/products"))
            .query(&[("title", query)]);
        self.send(request).await
    }

    /// List products in one category. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category = %category))]
    pub async fn filter_by_category(&self, category: CategoryId) -> Result<Vec<Product>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.url("/products"))
            .query(&[("categoryId", category.as_i64())]);
        self.send(request).await
    }

    /// List products within a price range. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn filter_by_price(
        &self,
        min: Decimal,
        max: Decimal,
    ) -> Result<Vec<Product>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.url("/products"))
            .query(&[("price_min", min.to_string()), ("price_max", max.to_string())]);
        self.send(request).await
    }

    /// Create a product. Drops all cached listings on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the payload or the request fails.
    #[instrument(skip(self, dto))]
    pub async fn create_product(&self, dto: &CreateProductDto) -> Result<Product, ApiError> {
        let request = self.inner.client.post(self.url("/products")).json(dto);
        let product: Product = self.send(request).await?;
        self.inner.cache.invalidate_all();
        Ok(product)
    }

    /// Update a product. Drops all cached listings on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist, the API rejects the
    /// payload, or the request fails.
    #[instrument(skip(self, dto), fields(id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        dto: &UpdateProductDto,
    ) -> Result<Product, ApiError> {
        let request = self
            .inner
            .client
            .put(self.url(&format!("/products/{id}")))
            .json(dto);
        let product: Product = self.send(request).await?;
        self.inner.cache.invalidate_all();
        Ok(product)
    }

    /// Delete a product. Drops all cached listings on success.
    ///
    /// The service answers with a bare JSON boolean.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<bool, ApiError> {
        let request = self
            .inner
            .client
            .delete(self.url(&format!("/products/{id}")));
        let deleted: bool = self.send(request).await?;
        self.inner.cache.invalidate_all();
        Ok(deleted)
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let cache_key = CacheKey::Categories;

        // Check cache
        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let request = self.inner.client.get(self.url("/categories"));
        let categories: Vec<Category> = self.send(request).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    // =========================================================================
    // File Methods
    // =========================================================================

    /// Upload a file, returning its public location.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected or the request fails.
    #[instrument(skip(self, bytes), fields(file_name = %file_name, size = bytes.len()))]
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_owned());
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self
            .inner
            .client
            .post(self.url("/files/upload"))
            .multipart(form);
        self.send(request).await
    }

    // =========================================================================
    // Auth Methods (not cached - per-session state)
    // =========================================================================

    /// Exchange credentials for a token pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request
    /// fails.
    #[instrument(skip(self, credentials))]
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        let body = LoginRequest {
            email: &credentials.email,
            password: credentials.password.expose_secret(),
        };
        let request = self.inner.client.post(self.url("/auth/login")).json(&body);
        self.send(request).await
    }

    /// Fetch the profile for `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or the request fails.
    #[instrument(skip(self, access_token))]
    pub async fn profile(&self, access_token: &str) -> Result<User, ApiError> {
        let request = self
            .inner
            .client
            .get(self.url("/auth/profile"))
            .bearer_auth(access_token);
        self.send(request).await
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        ApiClient::login(self, credentials).await
    }

    async fn profile(&self, access_token: &str) -> Result<User, ApiError> {
        ApiClient::profile(self, access_token).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn config(api_url: &str) -> StorefrontConfig {
        StorefrontConfig {
            api_url: url::Url::parse(api_url).unwrap(),
            storage_path: PathBuf::from("mercadito-test.json"),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ApiClient::new(&config("https://api.example.com/api/v1/"));
        assert_eq!(
            client.url("/products"),
            "https://api.example.com/api/v1/products"
        );
    }

    #[test]
    fn test_url_keeps_base_without_trailing_slash() {
        let client = ApiClient::new(&config("https://api.example.com/api/v1"));
        assert_eq!(
            client.url("/products/7"),
            "https://api.example.com/api/v1/products/7"
        );
    }

    #[test]
    fn test_login_request_wire_shape() {
        let request = LoginRequest {
            email: "maria@example.com",
            password: "hunter2",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"email": "maria@example.com", "password": "hunter2"})
        );
    }
}
