//! Klaviyo API client for newsletter subscriptions.
//!
//! Used as the [`SubscriptionService`] when `KLAVIYO_API_KEY` and
//! `KLAVIYO_LIST_ID` are set.
//!
//! - "Already subscribed" reads the profile's email marketing consent.
//! - Subscribing starts a bulk subscription job for the configured list.
//!   Without a request notice the job is a historical import, which skips
//!   the list's double opt-in mail.
//! - The success notice is stored as the `checkout_send_welcome` profile
//!   property for Klaviyo flows to act on.

use async_trait::async_trait;
use onepage_core::Email;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use super::{BackendError, SubscriptionNotices, SubscriptionService, SubscriptionStatus};
use crate::config::KlaviyoConfig;

/// Klaviyo API version.
const API_REVISION: &str = "2024-10-15";

/// Klaviyo API base URL.
const BASE_URL: &str = "https://a.klaviyo.com/api";

/// Profile property read by the welcome flow.
const WELCOME_PROPERTY: &str = "checkout_send_welcome";

/// Errors that can occur when interacting with Klaviyo API.
#[derive(Debug, Error)]
pub enum KlaviyoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<KlaviyoError> for BackendError {
    fn from(error: KlaviyoError) -> Self {
        match error {
            KlaviyoError::Http(e) => Self::Http(e),
            KlaviyoError::Api { status, message } => Self::Api { status, message },
            KlaviyoError::Parse(message) => Self::Parse(message),
        }
    }
}

/// Klaviyo API client for subscription management.
#[derive(Clone)]
pub struct KlaviyoClient {
    client: reqwest::Client,
    list_id: String,
}

impl KlaviyoClient {
    /// Create a new Klaviyo API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &KlaviyoConfig) -> Result<Self, KlaviyoError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Klaviyo-API-Key {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| KlaviyoError::Parse(format!("Invalid API key format: {e}")))?,
        );
        headers.insert("revision", HeaderValue::from_static(API_REVISION));
        headers.insert(
            "Content-Type",
            HeaderValue::from_static("application/vnd.api+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            list_id: config.list_id.clone(),
        })
    }

    /// Find a profile by email address, with its subscription state.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, KlaviyoError> {
        let url = format!(
            "{BASE_URL}/profiles?filter=equals(email,\"{}\")&additional-fields[profile]=subscriptions",
            urlencoding::encode(email)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KlaviyoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: ApiListResponse<Profile> = response
            .json()
            .await
            .map_err(|e| KlaviyoError::Parse(e.to_string()))?;

        Ok(api_response.data.into_iter().next())
    }

    /// Subscribe an email to the newsletter list.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn subscribe_email(
        &self,
        email: &str,
        notices: SubscriptionNotices,
    ) -> Result<(), KlaviyoError> {
        if notices.success {
            self.set_welcome_property(email).await?;
        }

        let url = format!("{BASE_URL}/profile-subscription-bulk-create-jobs");
        let body = subscription_job_body(
            email,
            &self.list_id,
            notices,
            &chrono::Utc::now().to_rfc3339(),
        );

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        // 202 Accepted is the expected response for bulk jobs
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KlaviyoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// Create or update the profile with the welcome flag set.
    async fn set_welcome_property(&self, email: &str) -> Result<(), KlaviyoError> {
        let url = format!("{BASE_URL}/profile-import");
        let body = serde_json::json!({
            "data": {
                "type": "profile",
                "attributes": {
                    "email": email,
                    "properties": { WELCOME_PROPERTY: true }
                }
            }
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KlaviyoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Body of a bulk subscription job for one email.
fn subscription_job_body(
    email: &str,
    list_id: &str,
    notices: SubscriptionNotices,
    consented_at: &str,
) -> serde_json::Value {
    let mut marketing = serde_json::json!({ "consent": "SUBSCRIBED" });
    let mut attributes = serde_json::json!({ "custom_source": "Onepage Checkout" });

    if !notices.request {
        marketing["consented_at"] = serde_json::Value::String(consented_at.to_string());
        attributes["historical_import"] = serde_json::Value::Bool(true);
    }

    attributes["profiles"] = serde_json::json!({
        "data": [{
            "type": "profile",
            "attributes": {
                "email": email,
                "subscriptions": { "email": { "marketing": marketing } }
            }
        }]
    });

    serde_json::json!({
        "data": {
            "type": "profile-subscription-bulk-create-job",
            "attributes": attributes,
            "relationships": {
                "list": { "data": { "type": "list", "id": list_id } }
            }
        }
    })
}

#[async_trait]
impl SubscriptionService for KlaviyoClient {
    async fn is_subscribed(&self, email: &Email) -> Result<bool, BackendError> {
        let profile = self.find_profile_by_email(email.as_str()).await?;
        Ok(profile.is_some_and(|p| p.is_email_subscribed()))
    }

    async fn subscribe(
        &self,
        email: &Email,
        notices: SubscriptionNotices,
    ) -> Result<SubscriptionStatus, BackendError> {
        self.subscribe_email(email.as_str(), notices).await?;
        tracing::info!(email = %email, double_opt_in = notices.request, "Klaviyo subscription requested");
        Ok(if notices.request {
            SubscriptionStatus::NotActivated
        } else {
            SubscriptionStatus::Subscribed
        })
    }
}

/// Wrapper for JSON:API list response.
#[derive(Debug, Deserialize)]
struct ApiListResponse<T> {
    data: Vec<T>,
}

/// Profile resource from Klaviyo API.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: String,
    pub attributes: ProfileAttributes,
}

/// Profile attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileAttributes {
    pub email: Option<String>,
    #[serde(default)]
    pub subscriptions: Option<serde_json::Value>,
}

impl Profile {
    /// True when email marketing consent is `SUBSCRIBED`.
    #[must_use]
    pub fn is_email_subscribed(&self) -> bool {
        self.attributes
            .subscriptions
            .as_ref()
            .and_then(|s| s.pointer("/email/marketing/consent"))
            .and_then(serde_json::Value::as_str)
            == Some("SUBSCRIBED")
    }
}
