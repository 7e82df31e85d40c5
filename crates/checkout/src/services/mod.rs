//! Collaborator interfaces.
//!
//! Carts, orders, payments and customers belong to the commerce backend.
//! The engine talks to them only through these traits so that it can run
//! against [`BackendClient`] in production and in-memory fakes in tests.
//!
//! # Services
//!
//! - [`backend`] - `reqwest` client implementing the commerce traits
//! - [`klaviyo`] - newsletter subscriptions through Klaviyo

pub mod backend;
pub mod klaviyo;

use std::sync::Arc;

use async_trait::async_trait;
use onepage_core::{AddressId, CartId, CustomerId, Email, OrderId};
use secrecy::SecretString;
use thiserror::Error;

pub use backend::BackendClient;
pub use klaviyo::KlaviyoClient;

use crate::models::{
    Address, Cart, Invoice, PaymentInput, PaymentMethod, PlaceOrderOutcome, PlaceOrderRequest,
    PlacedOrder, RateGroups,
};

/// Errors raised by collaborators.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Collaborator is not reachable or not configured.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Billing data handed to [`CheckoutSessionService::save_billing`].
#[derive(Debug, Clone)]
pub struct BillingSubmission {
    pub address: Address,
    /// Saved address-book entry the buyer picked, if any.
    pub customer_address_id: Option<AddressId>,
    /// Password for the account created by a `register` checkout.
    pub password: Option<SecretString>,
    /// Ship to the billing address.
    pub use_for_shipping: bool,
}

/// Outcome of saving the billing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingOutcome {
    Saved,
    /// Address failed backend validation.
    Rejected(Vec<String>),
}

/// Outcome of saving the payment step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentOutcome {
    /// Hosted payment page to send the buyer to before ordering.
    pub redirect_url: Option<String>,
}

/// Notification e-mails to send with a new subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionNotices {
    /// Ask the subscriber to confirm (double opt-in).
    pub request: bool,
    /// Confirm the subscription once active.
    pub success: bool,
}

/// State of a subscription after a subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Subscribed,
    /// Waiting for the subscriber to confirm.
    NotActivated,
}

/// Loads and stores carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, cart_id: CartId) -> Result<Option<Cart>, BackendError>;
    async fn save(&self, cart: &Cart) -> Result<(), BackendError>;
}

/// The backend's checkout session for a cart.
#[async_trait]
pub trait CheckoutSessionService: Send + Sync {
    /// Prepare the cart for checkout (clears stale payment, copies customer).
    async fn init_checkout(&self, cart: &mut Cart) -> Result<(), BackendError>;

    /// Validate and store the billing address.
    async fn save_billing(
        &self,
        cart: &mut Cart,
        submission: &BillingSubmission,
    ) -> Result<BillingOutcome, BackendError>;

    /// Recompute totals.
    async fn collect_totals(&self, cart: &mut Cart) -> Result<(), BackendError>;

    /// Turn the cart into an order.
    async fn place_order(&self, cart: &Cart) -> Result<PlaceOrderOutcome, BackendError>;
}

/// Quotes shipping rates.
#[async_trait]
pub trait RateQuotingService: Send + Sync {
    async fn quote(&self, cart_id: CartId, address: &Address) -> Result<RateGroups, BackendError>;
}

/// Payment methods and payment data.
#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn available_methods(&self, cart: &Cart) -> Result<Vec<PaymentMethod>, BackendError>;

    async fn save_payment(
        &self,
        cart: &mut Cart,
        payment: &PaymentInput,
    ) -> Result<PaymentOutcome, BackendError>;

    /// Card-issuer challenge URL, if the saved payment requires one.
    async fn verification_url(&self, cart: &Cart) -> Result<Option<String>, BackendError>;
}

/// Post-placement order operations.
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn register_invoice(&self, invoice: &Invoice) -> Result<(), BackendError>;
    async fn add_comment(&self, order_id: OrderId, comment: &str) -> Result<(), BackendError>;
}

/// Customer accounts.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Account registered with `email`, if any.
    async fn find_by_email(&self, email: &Email) -> Result<Option<CustomerId>, BackendError>;
}

/// Newsletter subscriptions.
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    async fn is_subscribed(&self, email: &Email) -> Result<bool, BackendError>;

    async fn subscribe(
        &self,
        email: &Email,
        notices: SubscriptionNotices,
    ) -> Result<SubscriptionStatus, BackendError>;
}

/// Side effect run after an order is created.
#[async_trait]
pub trait PlacementHook: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn after_place(
        &self,
        order: &PlacedOrder,
        request: &PlaceOrderRequest,
    ) -> Result<(), BackendError>;
}

/// Every collaborator the engine needs.
#[derive(Clone)]
pub struct Collaborators {
    pub carts: Arc<dyn CartStore>,
    pub checkout: Arc<dyn CheckoutSessionService>,
    pub rates: Arc<dyn RateQuotingService>,
    pub payments: Arc<dyn PaymentService>,
    pub orders: Arc<dyn OrderService>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub subscriptions: Arc<dyn SubscriptionService>,
}

impl Collaborators {
    /// Route every commerce concern to one backend client.
    ///
    /// Newsletter subscriptions go to `subscriptions` when given, otherwise
    /// to the backend's own newsletter.
    #[must_use]
    pub fn from_backend(
        backend: BackendClient,
        subscriptions: Option<Arc<dyn SubscriptionService>>,
    ) -> Self {
        let backend = Arc::new(backend);
        let subscriptions =
            subscriptions.unwrap_or_else(|| backend.clone() as Arc<dyn SubscriptionService>);
        Self {
            carts: backend.clone(),
            checkout: backend.clone(),
            rates: backend.clone(),
            payments: backend.clone(),
            orders: backend.clone(),
            customers: backend,
            subscriptions,
        }
    }
}
