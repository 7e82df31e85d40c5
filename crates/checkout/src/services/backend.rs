//! JSON client for the commerce backend.
//!
//! # Endpoints
//!
//! ```text
//! GET  /carts/{id}                         - load cart (404 = gone)
//! PUT  /carts/{id}                         - store cart
//! POST /carts/{id}/checkout                - init checkout, returns cart
//! POST /carts/{id}/billing                 - save billing, returns {cart, errors}
//! POST /carts/{id}/totals                  - collect totals, returns cart
//! POST /carts/{id}/order                   - place order, returns {order, redirect_url}
//! POST /carts/{id}/shipping-rates          - quote rates for an address
//! GET  /carts/{id}/payment-methods         - available payment methods
//! POST /carts/{id}/payment                 - save payment, returns {cart, redirect_url}
//! GET  /carts/{id}/payment/verification    - 3-D secure URL, returns {url}
//! POST /orders/{id}/invoices               - register invoice
//! POST /orders/{id}/comments               - add order comment
//! GET  /customers?email=                   - find customer ids by email
//! GET  /newsletter/subscribers?email=      - subscriber lookup
//! POST /newsletter/subscribers             - subscribe
//! ```

use async_trait::async_trait;
use onepage_core::{CartId, CustomerId, Email, OrderId};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{
    BackendError, BillingOutcome, BillingSubmission, CartStore, CheckoutSessionService,
    CustomerDirectory, OrderService, PaymentOutcome, PaymentService, RateQuotingService,
    SubscriptionNotices, SubscriptionService, SubscriptionStatus,
};
use crate::config::BackendConfig;
use crate::models::{
    Address, Cart, Invoice, PaymentInput, PaymentMethod, PlaceOrderOutcome, RateGroups,
};

/// Commerce backend client.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct BillingResponse {
    cart: Cart,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct PaymentResponse {
    cart: Cart,
    redirect_url: Option<String>,
}

#[derive(Deserialize)]
struct VerificationResponse {
    url: Option<String>,
}

#[derive(Deserialize)]
struct CustomerRef {
    id: CustomerId,
}

#[derive(Deserialize)]
struct SubscriberRef {
    status: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.token.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| BackendError::Parse(format!("Invalid token format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fail on error statuses, keeping the body as the message.
    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn post_for<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, BackendError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn get_for<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl CartStore for BackendClient {
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn load(&self, cart_id: CartId) -> Result<Option<Cart>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/carts/{cart_id}")))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    async fn save(&self, cart: &Cart) -> Result<(), BackendError> {
        let response = self
            .client
            .put(self.url(&format!("/carts/{}", cart.id)))
            .json(cart)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CheckoutSessionService for BackendClient {
    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    async fn init_checkout(&self, cart: &mut Cart) -> Result<(), BackendError> {
        *cart = self
            .post_for(&format!("/carts/{}/checkout", cart.id), &serde_json::json!({
                "checkout_method": cart.checkout_method,
            }))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, cart, submission), fields(cart_id = %cart.id))]
    async fn save_billing(
        &self,
        cart: &mut Cart,
        submission: &BillingSubmission,
    ) -> Result<BillingOutcome, BackendError> {
        let body = serde_json::json!({
            "address": submission.address,
            "customer_address_id": submission.customer_address_id,
            "customer_password": submission.password.as_ref().map(|p| p.expose_secret().to_string()),
            "use_for_shipping": submission.use_for_shipping,
            "checkout_method": cart.checkout_method,
        });
        let response: BillingResponse = self
            .post_for(&format!("/carts/{}/billing", cart.id), &body)
            .await?;

        *cart = response.cart;
        if response.errors.is_empty() {
            Ok(BillingOutcome::Saved)
        } else {
            Ok(BillingOutcome::Rejected(response.errors))
        }
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    async fn collect_totals(&self, cart: &mut Cart) -> Result<(), BackendError> {
        *cart = self
            .post_for(&format!("/carts/{}/totals", cart.id), &serde_json::json!({
                "shipping_address": cart.shipping_address,
                "billing_address": cart.billing_address,
            }))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    async fn place_order(&self, cart: &Cart) -> Result<PlaceOrderOutcome, BackendError> {
        self.post_for(&format!("/carts/{}/order", cart.id), &serde_json::json!({
            "shipping_address": cart.shipping_address,
            "billing_address": cart.billing_address,
            "checkout_method": cart.checkout_method,
        }))
        .await
    }
}

#[async_trait]
impl RateQuotingService for BackendClient {
    #[instrument(skip(self, address), fields(cart_id = %cart_id))]
    async fn quote(&self, cart_id: CartId, address: &Address) -> Result<RateGroups, BackendError> {
        self.post_for(
            &format!("/carts/{cart_id}/shipping-rates"),
            &serde_json::json!({ "address": address }),
        )
        .await
    }
}

#[async_trait]
impl PaymentService for BackendClient {
    async fn available_methods(&self, cart: &Cart) -> Result<Vec<PaymentMethod>, BackendError> {
        self.get_for(&format!("/carts/{}/payment-methods", cart.id))
            .await
    }

    #[instrument(skip(self, cart, payment), fields(cart_id = %cart.id, method = ?payment.method))]
    async fn save_payment(
        &self,
        cart: &mut Cart,
        payment: &PaymentInput,
    ) -> Result<PaymentOutcome, BackendError> {
        let response: PaymentResponse = self
            .post_for(
                &format!("/carts/{}/payment", cart.id),
                &serde_json::json!({ "payment": payment }),
            )
            .await?;
        *cart = response.cart;
        Ok(PaymentOutcome {
            redirect_url: response.redirect_url.filter(|u| !u.is_empty()),
        })
    }

    async fn verification_url(&self, cart: &Cart) -> Result<Option<String>, BackendError> {
        let response: VerificationResponse = self
            .get_for(&format!("/carts/{}/payment/verification", cart.id))
            .await?;
        Ok(response.url.filter(|u| !u.is_empty()))
    }
}

#[async_trait]
impl OrderService for BackendClient {
    #[instrument(skip(self, invoice), fields(order_id = %invoice.order_id))]
    async fn register_invoice(&self, invoice: &Invoice) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/orders/{}/invoices", invoice.order_id)))
            .json(invoice)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn add_comment(&self, order_id: OrderId, comment: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/orders/{order_id}/comments")))
            .json(&serde_json::json!({ "comment": comment, "visible_on_front": true }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CustomerDirectory for BackendClient {
    async fn find_by_email(&self, email: &Email) -> Result<Option<CustomerId>, BackendError> {
        let customers: Vec<CustomerRef> = self
            .get_for(&format!(
                "/customers?email={}",
                urlencoding::encode(email.as_str())
            ))
            .await?;
        Ok(customers.into_iter().next().map(|c| c.id))
    }
}

#[async_trait]
impl SubscriptionService for BackendClient {
    async fn is_subscribed(&self, email: &Email) -> Result<bool, BackendError> {
        let subscribers: Vec<SubscriberRef> = self
            .get_for(&format!(
                "/newsletter/subscribers?email={}",
                urlencoding::encode(email.as_str())
            ))
            .await?;
        Ok(subscribers.iter().any(|s| s.status == "subscribed"))
    }

    async fn subscribe(
        &self,
        email: &Email,
        notices: SubscriptionNotices,
    ) -> Result<SubscriptionStatus, BackendError> {
        let subscriber: SubscriberRef = self
            .post_for(
                "/newsletter/subscribers",
                &serde_json::json!({
                    "email": email,
                    "send_request_email": notices.request,
                    "send_success_email": notices.success,
                }),
            )
            .await?;
        Ok(if subscriber.status == "subscribed" {
            SubscriptionStatus::Subscribed
        } else {
            SubscriptionStatus::NotActivated
        })
    }
}
