//! End-to-end placement scenarios for Onepage Checkout.
//!
//! The checkout talks to the commerce backend only through the traits in
//! `onepage_checkout::services`. This crate provides [`MemoryBackend`], an
//! in-memory implementation of all of them that records every call, and a
//! [`Harness`] that wires it into an `OrderPlacement` the way the server does.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p onepage-integration-tests
//! ```
//!
//! No database or network is needed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use onepage_checkout::config::CheckoutSettings;
use onepage_checkout::directory::CountryRegionIndex;
use onepage_checkout::models::{
    Address, AddressInput, Cart, CartTotals, CustomerAccount, Invoice, OrderItem, PaymentInput,
    PaymentMethod, PlaceOrderOutcome, PlaceOrderRequest, PlacedOrder, PlacementResult, RateGroups,
    SessionCheckoutState, UserPayload,
};
use onepage_checkout::placement::{CartLocks, OrderPlacement, PlacementContext};
use onepage_checkout::services::{
    BackendError, BillingOutcome, BillingSubmission, CartStore, CheckoutSessionService,
    Collaborators, CustomerDirectory, OrderService, PaymentOutcome, PaymentService,
    PlacementHook, RateQuotingService, SubscriptionNotices, SubscriptionService,
    SubscriptionStatus,
};
use onepage_core::{
    AddressId, CartId, CustomerId, Email, Money, OrderId, OrderItemId, OrderStatus,
};
use rust_decimal::Decimal;

/// Reference data shipped with the checkout.
const DIRECTORY_JSON: &str = include_str!("../../checkout/data/directory.json");

// =============================================================================
// In-memory backend
// =============================================================================

/// Everything the fake backend holds and everything it was asked to do.
#[derive(Debug, Default)]
pub struct BackendState {
    pub carts: HashMap<CartId, Cart>,
    /// Rates returned for every quote.
    pub rates: RateGroups,
    pub payment_methods: Vec<PaymentMethod>,

    /// When set, billing saves are rejected with these messages.
    pub billing_rejection: Option<Vec<String>>,
    /// When set, the payment save asks for this redirect.
    pub payment_redirect: Option<String>,
    /// When set, order creation hands back this hosted payment page.
    pub order_redirect: Option<String>,
    /// When set, order creation fails with this API message.
    pub place_order_failure: Option<String>,
    /// When set, invoice registration fails with this API message.
    pub invoice_failure: Option<String>,
    /// Status new orders are created in.
    pub order_status: OrderStatus,

    /// Registered accounts by email.
    pub customers: HashMap<String, CustomerId>,
    /// Subscribed emails.
    pub subscribed: HashSet<String>,
    pub subscribe_status: Option<SubscriptionStatus>,

    pub init_calls: usize,
    pub billing_submissions: Vec<BillingSubmission>,
    pub saved_payments: Vec<PaymentInput>,
    pub subscriptions: Vec<(String, SubscriptionNotices)>,
    pub placed: Vec<PlacedOrder>,
    pub invoices: Vec<Invoice>,
    pub comments: Vec<(OrderId, String)>,
}

/// In-memory commerce backend implementing every collaborator trait.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<BackendState>,
}

impl MemoryBackend {
    /// A backend holding one cart.
    #[must_use]
    pub fn with_cart(cart: Cart) -> Arc<Self> {
        let backend = Self::default();
        backend.state().carts.insert(cart.id, cart);
        Arc::new(backend)
    }

    /// Lock the state for inspection or setup.
    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stored copy of a cart.
    #[must_use]
    pub fn cart(&self, cart_id: CartId) -> Option<Cart> {
        self.state().carts.get(&cart_id).cloned()
    }

    /// Route every collaborator to this backend.
    #[must_use]
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            carts: self.clone(),
            checkout: self.clone(),
            rates: self.clone(),
            payments: self.clone(),
            orders: self.clone(),
            customers: self.clone(),
            subscriptions: self.clone(),
        }
    }
}

#[async_trait]
impl CartStore for MemoryBackend {
    async fn load(&self, cart_id: CartId) -> Result<Option<Cart>, BackendError> {
        Ok(self.cart(cart_id))
    }

    async fn save(&self, cart: &Cart) -> Result<(), BackendError> {
        self.state().carts.insert(cart.id, cart.clone());
        Ok(())
    }
}

#[async_trait]
impl CheckoutSessionService for MemoryBackend {
    async fn init_checkout(&self, _cart: &mut Cart) -> Result<(), BackendError> {
        self.state().init_calls += 1;
        Ok(())
    }

    async fn save_billing(
        &self,
        cart: &mut Cart,
        submission: &BillingSubmission,
    ) -> Result<BillingOutcome, BackendError> {
        let mut state = self.state();
        state.billing_submissions.push(submission.clone());
        if let Some(messages) = &state.billing_rejection {
            return Ok(BillingOutcome::Rejected(messages.clone()));
        }

        cart.billing_address = submission.address.clone();
        if submission.use_for_shipping {
            let method = cart.shipping_address.shipping_method.take();
            cart.shipping_address = submission.address.clone();
            cart.shipping_address.shipping_method = method;
        }
        Ok(BillingOutcome::Saved)
    }

    async fn collect_totals(&self, cart: &mut Cart) -> Result<(), BackendError> {
        let totals = &mut cart.totals;
        totals.grand_total.amount =
            totals.subtotal.amount + totals.shipping.amount - totals.discount.amount;
        cart.totals_collected = true;
        Ok(())
    }

    async fn place_order(&self, cart: &Cart) -> Result<PlaceOrderOutcome, BackendError> {
        let mut state = self.state();
        if let Some(message) = &state.place_order_failure {
            return Err(BackendError::Api {
                status: 500,
                message: message.clone(),
            });
        }

        let number = i32::try_from(state.placed.len()).unwrap_or(i32::MAX - 1) + 1;
        let order = PlacedOrder {
            id: OrderId::new(number),
            increment_id: format!("1000000{number:02}"),
            status: state.order_status,
            grand_total: cart.totals.grand_total,
            items: (1..=cart.items_count)
                .map(|n| OrderItem {
                    id: OrderItemId::new(i32::try_from(n).unwrap_or(i32::MAX)),
                    sku: format!("SKU-{n}"),
                    qty_ordered: Decimal::ONE,
                })
                .collect(),
        };
        state.placed.push(order.clone());

        Ok(PlaceOrderOutcome {
            order,
            redirect_url: state.order_redirect.clone(),
        })
    }
}

#[async_trait]
impl RateQuotingService for MemoryBackend {
    async fn quote(&self, _cart_id: CartId, _address: &Address) -> Result<RateGroups, BackendError> {
        Ok(self.state().rates.clone())
    }
}

#[async_trait]
impl PaymentService for MemoryBackend {
    async fn available_methods(&self, _cart: &Cart) -> Result<Vec<PaymentMethod>, BackendError> {
        Ok(self.state().payment_methods.clone())
    }

    async fn save_payment(
        &self,
        _cart: &mut Cart,
        payment: &PaymentInput,
    ) -> Result<PaymentOutcome, BackendError> {
        let mut state = self.state();
        state.saved_payments.push(payment.clone());
        Ok(PaymentOutcome {
            redirect_url: state.payment_redirect.clone(),
        })
    }

    async fn verification_url(&self, _cart: &Cart) -> Result<Option<String>, BackendError> {
        Ok(None)
    }
}

#[async_trait]
impl OrderService for MemoryBackend {
    async fn register_invoice(&self, invoice: &Invoice) -> Result<(), BackendError> {
        let mut state = self.state();
        if let Some(message) = &state.invoice_failure {
            return Err(BackendError::Api {
                status: 500,
                message: message.clone(),
            });
        }
        state.invoices.push(invoice.clone());
        Ok(())
    }

    async fn add_comment(&self, order_id: OrderId, comment: &str) -> Result<(), BackendError> {
        self.state().comments.push((order_id, comment.to_string()));
        Ok(())
    }
}

#[async_trait]
impl CustomerDirectory for MemoryBackend {
    async fn find_by_email(&self, email: &Email) -> Result<Option<CustomerId>, BackendError> {
        Ok(self.state().customers.get(email.as_str()).copied())
    }
}

#[async_trait]
impl SubscriptionService for MemoryBackend {
    async fn is_subscribed(&self, email: &Email) -> Result<bool, BackendError> {
        Ok(self.state().subscribed.contains(email.as_str()))
    }

    async fn subscribe(
        &self,
        email: &Email,
        notices: SubscriptionNotices,
    ) -> Result<SubscriptionStatus, BackendError> {
        let mut state = self.state();
        state.subscribed.insert(email.as_str().to_string());
        state
            .subscriptions
            .push((email.as_str().to_string(), notices));
        Ok(state
            .subscribe_status
            .unwrap_or(SubscriptionStatus::Subscribed))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Cart used by most scenarios.
pub const CART_ID: CartId = CartId::new(42);

/// An active, physical cart with `items` items and the given subtotal.
#[must_use]
pub fn cart(items: u32, subtotal: Decimal) -> Cart {
    Cart {
        id: CART_ID,
        items_count: items,
        has_error: false,
        is_multi_shipping: false,
        is_virtual: false,
        is_active: true,
        checkout_method: None,
        shipping_address: Address::default(),
        billing_address: Address::default(),
        totals: CartTotals {
            subtotal: Money {
                amount: subtotal,
                ..Money::default()
            },
            ..CartTotals::default()
        },
        totals_collected: false,
    }
}

/// A guest's `user` section.
#[must_use]
pub fn guest_payload(email: &str) -> UserPayload {
    UserPayload {
        address: AddressInput {
            street: vec!["Khreshchatyk 1".to_string(), "  ".to_string()],
            telephone: Some("+380441234567".to_string()),
            ..AddressInput::default()
        },
        name: Some("Olena Petrenko".to_string()),
        email: Some(email.to_string()),
        password: None,
        note: None,
    }
}

/// A complete place-order request for a guest.
#[must_use]
pub fn guest_request(email: &str) -> PlaceOrderRequest {
    PlaceOrderRequest {
        user: Some(guest_payload(email)),
        payment: PaymentInput {
            method: Some("checkmo".to_string()),
            ..PaymentInput::default()
        },
        shipping_method: Some("flatrate_flatrate".to_string()),
        ..PlaceOrderRequest::default()
    }
}

/// A logged-in customer with no default addresses.
///
/// # Panics
///
/// Panics if `email` is not a valid address.
#[must_use]
pub fn customer(id: i32, email: &str) -> CustomerAccount {
    CustomerAccount {
        id: CustomerId::new(id),
        email: Email::parse(email).expect("fixture email must be valid"),
        firstname: "Taras".to_string(),
        lastname: "Shevchenko".to_string(),
        default_billing: None,
        default_shipping: None,
        primary_telephone: None,
    }
}

/// Saved address id helper.
#[must_use]
pub const fn address_id(id: i32) -> AddressId {
    AddressId::new(id)
}

// =============================================================================
// Harness
// =============================================================================

/// Owns everything an [`OrderPlacement`] borrows.
pub struct Harness {
    pub settings: CheckoutSettings,
    pub directory: CountryRegionIndex,
    pub backend: Arc<MemoryBackend>,
    pub services: Collaborators,
    pub hooks: Vec<Arc<dyn PlacementHook>>,
    pub locks: CartLocks,
}

impl Harness {
    /// Default settings over `backend`, with no hooks.
    ///
    /// # Panics
    ///
    /// Panics if the bundled directory file is invalid.
    #[must_use]
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        let directory =
            CountryRegionIndex::from_json_str(DIRECTORY_JSON).expect("bundled directory is valid");
        Self {
            settings: CheckoutSettings::default(),
            directory,
            services: backend.collaborators(),
            backend,
            hooks: Vec::new(),
            locks: CartLocks::new(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: CheckoutSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn PlacementHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use]
    pub fn placement(&self) -> OrderPlacement<'_> {
        OrderPlacement::new(
            &self.settings,
            &self.directory,
            &self.services,
            &self.hooks,
            &self.locks,
        )
    }

    /// Submit `request` for [`CART_ID`] as a POST.
    pub async fn place(
        &self,
        request: &PlaceOrderRequest,
        customer: Option<&CustomerAccount>,
        session: &mut SessionCheckoutState,
    ) -> PlacementResult {
        self.placement()
            .place(
                Some(CART_ID),
                request,
                PlacementContext {
                    is_post: true,
                    customer,
                    session,
                },
            )
            .await
    }
}
