//! Stripe API client implementation.

use reqwest::Client;
use std::time::Duration;

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

use super::types::{CheckoutSession, StripeErrorResponse};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Invalid webhook signature.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Everything needed to open a hosted checkout session.
///
/// The metadata fields round-trip verbatim into the
/// `checkout.session.completed` webhook, where they drive reconciliation.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Our user id, echoed back as `client_reference_id`.
    pub client_reference_id: String,
    /// Line item display name.
    pub product_name: String,
    /// Line item description.
    pub product_description: String,
    /// Unit amount in cents.
    pub unit_amount_cents: i64,
    /// Line item quantity.
    pub quantity: i64,
    /// Lowercase ISO currency code.
    pub currency: String,
    /// Redirect on success.
    pub success_url: String,
    /// Redirect on cancel.
    pub cancel_url: String,
    /// String-valued metadata attached to the session.
    pub metadata: Vec<(String, String)>,
    /// Platform fee kept from the payment, in cents.
    pub application_fee_cents: i64,
    /// Connected account the remainder is transferred to.
    pub destination_account: String,
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    webhook_secret: Option<String>,
}

impl StripeClient {
    /// Stripe API base URL.
    const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Create a new Stripe client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    /// * `webhook_secret` - Optional webhook signing secret (`whsec_...`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            webhook_secret,
        })
    }

    /// Create a hosted Checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Stripe rejects it.
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".to_string()),
            ("success_url".into(), request.success_url.clone()),
            ("cancel_url".into(), request.cancel_url.clone()),
            (
                "client_reference_id".into(),
                request.client_reference_id.clone(),
            ),
            (
                "line_items[0][price_data][currency]".into(),
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                request.product_name.clone(),
            ),
            (
                "line_items[0][price_data][product_data][description]".into(),
                request.product_description.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                request.unit_amount_cents.to_string(),
            ),
            (
                "line_items[0][quantity]".into(),
                request.quantity.to_string(),
            ),
            (
                "payment_intent_data[application_fee_amount]".into(),
                request.application_fee_cents.to_string(),
            ),
            (
                "payment_intent_data[transfer_data][destination]".into(),
                request.destination_account.clone(),
            ),
        ];
        form.extend(
            request
                .metadata
                .iter()
                .map(|(k, v)| (format!("metadata[{k}]"), v.clone())),
        );

        tracing::debug!(
            client_reference_id = %request.client_reference_id,
            unit_amount_cents = %request.unit_amount_cents,
            quantity = %request.quantity,
            destination = %request.destination_account,
            "Creating Stripe checkout session"
        );

        let response = self
            .client
            .post(format!("{}/checkout/sessions", Self::BASE_URL))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(&form)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Retrieve a Checkout session by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Stripe rejects it.
    pub async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .get(format!("{}/checkout/sessions/{}", Self::BASE_URL, session_id))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Verify a webhook signature against the raw request body.
    ///
    /// The `Stripe-Signature` header has the form
    /// `t=<timestamp>,v1=<signature>[,v1=<signature>...]`; the signed
    /// payload is `"{timestamp}.{body}"`. Any matching `v1` candidate
    /// passes; comparison is constant-time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` on mismatch, `Configuration` when no
    /// webhook secret is set or the header is malformed.
    pub fn verify_webhook_signature(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<(), StripeError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or_else(|| StripeError::Configuration("Webhook secret not configured".into()))?;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            let mut kv = part.splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some("t"), Some(ts)) => timestamp = Some(ts),
                (Some("v1"), Some(sig)) => signatures.push(sig),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| StripeError::Configuration("Missing timestamp".into()))?;

        if signatures.is_empty() {
            return Err(StripeError::InvalidSignature);
        }

        let signed_payload = format!("{timestamp}.{payload}");
        let expected = hmac_sha256_hex(secret, &signed_payload);

        let valid = signatures.iter().any(|sig| constant_time_eq(&expected, sig));

        if valid {
            Ok(())
        } else {
            Err(StripeError::InvalidSignature)
        }
    }

    /// Handle an API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_secret(secret: &str) -> StripeClient {
        StripeClient::new("sk_test_xxx", Some(secret.to_string())).unwrap()
    }

    fn sign(secret: &str, timestamp: &str, payload: &str) -> String {
        hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"))
    }

    #[test]
    fn valid_signature_passes() {
        let client = client_with_secret("whsec_test123");
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = format!("t=1700000000,v1={}", sign("whsec_test123", "1700000000", payload));

        assert!(client.verify_webhook_signature(payload, &header).is_ok());
    }

    #[test]
    fn wrong_secret_fails() {
        let client = client_with_secret("whsec_test123");
        let payload = r#"{"id":"evt_1"}"#;
        let header = format!("t=1700000000,v1={}", sign("whsec_other", "1700000000", payload));

        assert!(matches!(
            client.verify_webhook_signature(payload, &header),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_payload_fails() {
        let client = client_with_secret("whsec_test123");
        let payload = r#"{"id":"evt_1","amount":100}"#;
        let header = format!("t=1700000000,v1={}", sign("whsec_test123", "1700000000", payload));

        let tampered = r#"{"id":"evt_1","amount":999}"#;
        assert!(client.verify_webhook_signature(tampered, &header).is_err());
    }

    #[test]
    fn any_matching_v1_candidate_passes() {
        let client = client_with_secret("whsec_test123");
        let payload = r#"{"id":"evt_1"}"#;
        let good = sign("whsec_test123", "1700000000", payload);
        let header = format!("t=1700000000,v1=deadbeef,v1={good}");

        assert!(client.verify_webhook_signature(payload, &header).is_ok());
    }

    #[test]
    fn missing_timestamp_is_a_configuration_error() {
        let client = client_with_secret("whsec_test123");
        let result = client.verify_webhook_signature("{}", "v1=abc");
        assert!(matches!(result, Err(StripeError::Configuration(_))));
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let client = StripeClient::new("sk_test_xxx", None).unwrap();
        let result = client.verify_webhook_signature("{}", "t=1,v1=abc");
        assert!(matches!(result, Err(StripeError::Configuration(_))));
    }
}
