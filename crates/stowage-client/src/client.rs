//! Stowage HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, CheckoutResponse, CreateProfileRequest, OrderResponse,
    ProductCheckoutRequest, ProfileResponse, RentalResponse, SpaceResponse,
    StorageCheckoutRequest,
};

/// Stowage API client.
///
/// Carries one user's bearer token; all requests are made on that user's
/// behalf.
#[derive(Debug, Clone)]
pub struct StowageClient {
    client: Client,
    base_url: String,
    bearer_token: String,
}

impl StowageClient {
    /// Create a new stowage client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the stowage service (e.g. `"http://stowage:8080"`)
    /// * `bearer_token` - The user's JWT from the identity provider
    #[must_use]
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self::with_options(base_url, bearer_token, ClientOptions::default())
    }

    /// Create a new stowage client with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    #[must_use]
    pub fn with_options(
        base_url: impl Into<String>,
        bearer_token: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
        }
    }

    fn auth_value(&self) -> String {
        format!("Bearer {}", self.bearer_token)
    }

    /// Create the caller's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn create_profile(
        &self,
        request: CreateProfileRequest,
    ) -> Result<ProfileResponse, ClientError> {
        let url = format!("{}/api/profile", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("authorization", self.auth_value())
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Fetch the caller's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_profile(&self) -> Result<ProfileResponse, ClientError> {
        let url = format!("{}/api/profile", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", self.auth_value())
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// List spaces with free surface. Public, no auth required.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_available_spaces(&self) -> Result<Vec<SpaceResponse>, ClientError> {
        let url = format!("{}/api/spaces/available", self.base_url);

        let response = self.client.get(&url).send().await?;

        Self::handle_response(response).await
    }

    /// List the caller's rentals, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_rentals(&self) -> Result<Vec<RentalResponse>, ClientError> {
        let url = format!("{}/api/rentals", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", self.auth_value())
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// List the caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_orders(&self) -> Result<Vec<OrderResponse>, ClientError> {
        let url = format!("{}/api/orders", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", self.auth_value())
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Open a checkout session for renting storage surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error,
    /// including `InsufficientCapacity` when the space is too full.
    pub async fn create_storage_checkout(
        &self,
        request: StorageCheckoutRequest,
    ) -> Result<CheckoutResponse, ClientError> {
        let url = format!("{}/api/checkout/storage", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("authorization", self.auth_value())
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Open a checkout session for buying a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error,
    /// including `InsufficientStock` when the product is short.
    pub async fn create_product_checkout(
        &self,
        request: ProductCheckoutRequest,
    ) -> Result<CheckoutResponse, ClientError> {
        let url = format!("{}/api/checkout/product", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("authorization", self.auth_value())
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let details = api_error.error.details.as_ref();

                let detail = |key: &str| {
                    details
                        .and_then(|d| d.get(key))
                        .and_then(serde_json::Value::as_i64)
                        .unwrap_or(0)
                };

                // Map the business-rule rejections to typed errors
                match code {
                    "insufficient_capacity" => Err(ClientError::InsufficientCapacity {
                        available: detail("available"),
                        requested: detail("requested"),
                    }),
                    "insufficient_stock" => Err(ClientError::InsufficientStock {
                        stock: detail("stock"),
                        requested: detail("requested"),
                    }),
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message: api_error.error.message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn client_trims_trailing_slash() {
        let client = StowageClient::new("http://localhost:8080/", "jwt");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn list_available_spaces_deserializes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/spaces/available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
                "owner_id": "7c9e6679-7425-40de-944b-e07fc1f90ae8",
                "name": "Hangar Nord",
                "address": "12 rue des Docks",
                "total_surface": 100,
                "available_surface": 60,
                "rented_surface": 40,
                "price_cents": 500,
                "created_at": "2025-01-01T00:00:00Z",
            }])))
            .mount(&server)
            .await;

        let client = StowageClient::new(server.uri(), "jwt");
        let spaces = client.list_available_spaces().await.unwrap();

        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].name, "Hangar Nord");
        assert_eq!(spaces[0].available_surface, 60);
    }

    #[tokio::test]
    async fn checkout_sends_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/checkout/storage"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session_id": "cs_test_1",
                "checkout_url": "https://checkout.stripe.com/pay/cs_test_1",
            })))
            .mount(&server)
            .await;

        let client = StowageClient::new(server.uri(), "user-jwt");
        let checkout = client
            .create_storage_checkout(StorageCheckoutRequest {
                storage_id: "7c9e6679-7425-40de-944b-e07fc1f90ae7".into(),
                space_to_rent: 10,
                start_date: "2025-06-01".into(),
                end_date: "2025-09-01".into(),
            })
            .await
            .unwrap();

        assert_eq!(checkout.session_id, "cs_test_1");
    }

    #[tokio::test]
    async fn capacity_rejection_maps_to_typed_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/checkout/storage"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "error": {
                    "code": "insufficient_capacity",
                    "message": "insufficient capacity: available=4, requested=6",
                    "details": { "available": 4, "requested": 6 },
                }
            })))
            .mount(&server)
            .await;

        let client = StowageClient::new(server.uri(), "jwt");
        let err = client
            .create_storage_checkout(StorageCheckoutRequest {
                storage_id: "7c9e6679-7425-40de-944b-e07fc1f90ae7".into(),
                space_to_rent: 6,
                start_date: "2025-06-01".into(),
                end_date: "2025-09-01".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::InsufficientCapacity {
                available: 4,
                requested: 6
            }
        ));
    }

    #[tokio::test]
    async fn unknown_error_body_maps_to_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/orders"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = StowageClient::new(server.uri(), "jwt");
        let err = client.list_orders().await.unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 500, .. }));
    }
}
