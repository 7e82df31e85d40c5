//! Order placement.
//!
//! [`OrderPlacement::place`] turns one place-order request into exactly one
//! [`PlacementResult`]. The steps run in order and stop at the first failure:
//!
//! 1. preconditions (submission, payload, live cart)
//! 2. minimum order amount
//! 3. checkout method
//! 4. backend checkout init
//! 5. address resolution and customer data
//! 6. billing save
//! 7. newsletter
//! 8. shipping method
//! 9. address flags
//! 10. totals
//! 11. payment save (may end in a payment redirect)
//! 12. terms agreements, order creation, zero-total invoice
//! 13. cart deactivation
//! 14. session cleanup
//!
//! Expected failures become an error result with their own message. Anything
//! else is reported to Sentry and shown as a generic message.

pub mod hooks;
mod invoice;
mod lock;
mod password;

use std::sync::Arc;

use onepage_core::{AddressId, CartId, CheckoutMethod, Email};
use tracing::instrument;

pub use hooks::CustomerNoteHook;
pub use invoice::{full_invoice, needs_auto_invoice};
pub use lock::CartLocks;
pub use password::derive_password;

use crate::address::AddressResolver;
use crate::config::CheckoutSettings;
use crate::directory::CountryRegionIndex;
use crate::error::{CheckoutError, GENERIC_FAILURE_MESSAGE, add_breadcrumb, report_unexpected};
use crate::location::{LocationParser, LocationQuery};
use crate::models::{
    AddressFragment, AddressInput, Cart, CustomerAccount, PlaceOrderRequest, PlacedOrder,
    PlacementResult, SessionCheckoutState, UserPayload, non_empty,
};
use crate::newsletter::NewsletterGate;
use crate::services::{BillingOutcome, BillingSubmission, Collaborators, PlacementHook};

/// Shown when a required agreement is missing.
pub const AGREEMENTS_MESSAGE: &str =
    "Please agree to all the terms and conditions before placing the order.";

/// Shown when a physical cart has no shipping method.
pub const SHIPPING_METHOD_MESSAGE: &str = "Invalid shipping method.";

/// Shown when a guest's email does not parse.
pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";

/// Per-request inputs that do not come from the request body.
#[derive(Debug)]
pub struct PlacementContext<'s> {
    /// The request was a form submission.
    pub is_post: bool,
    /// Logged-in customer, if any.
    pub customer: Option<&'s CustomerAccount>,
    /// Checkout state of the buyer's session; updated in place.
    pub session: &'s mut SessionCheckoutState,
}

/// Runs place-order requests.
#[derive(Clone, Copy)]
pub struct OrderPlacement<'a> {
    settings: &'a CheckoutSettings,
    directory: &'a CountryRegionIndex,
    services: &'a Collaborators,
    hooks: &'a [Arc<dyn PlacementHook>],
    locks: &'a CartLocks,
}

impl<'a> OrderPlacement<'a> {
    #[must_use]
    pub const fn new(
        settings: &'a CheckoutSettings,
        directory: &'a CountryRegionIndex,
        services: &'a Collaborators,
        hooks: &'a [Arc<dyn PlacementHook>],
        locks: &'a CartLocks,
    ) -> Self {
        Self {
            settings,
            directory,
            services,
            hooks,
            locks,
        }
    }

    /// Place the order for `cart_id`.
    ///
    /// Never fails: every outcome, including internal faults, is folded into
    /// the returned [`PlacementResult`].
    #[instrument(skip(self, request, ctx), fields(customer_id))]
    pub async fn place(
        &self,
        cart_id: Option<CartId>,
        request: &PlaceOrderRequest,
        ctx: PlacementContext<'_>,
    ) -> PlacementResult {
        if let Some(customer) = ctx.customer {
            tracing::Span::current().record("customer_id", customer.id.as_i32());
        }

        let outcome = match cart_id {
            Some(cart_id) if ctx.is_post && request.user.is_some() => {
                self.place_locked(cart_id, request, ctx).await
            }
            _ => Err(CheckoutError::SessionExpired),
        };

        match outcome {
            Ok(result) => result,
            Err(error) => self.conclude(&error),
        }
    }

    async fn place_locked(
        &self,
        cart_id: CartId,
        request: &PlaceOrderRequest,
        ctx: PlacementContext<'_>,
    ) -> Result<PlacementResult, CheckoutError> {
        let Some(_guard) = self.locks.try_acquire(cart_id).await else {
            tracing::warn!(cart_id = %cart_id, "Placement already in progress for cart");
            return Err(CheckoutError::Busy);
        };
        self.run(cart_id, request, ctx).await
    }

    /// Turn a failure into the single result the caller sees.
    fn conclude(&self, error: &CheckoutError) -> PlacementResult {
        let Some(message) = error.user_message() else {
            tracing::debug!("Checkout expired, redirecting to cart");
            return PlacementResult::Expired {
                redirect: self.settings.cart_url.clone(),
            };
        };

        if error.is_unexpected() {
            report_unexpected(error);
        } else {
            tracing::info!(error = %error, "Placement rejected");
        }
        PlacementResult::Error { message }
    }

    async fn run(
        &self,
        cart_id: CartId,
        request: &PlaceOrderRequest,
        ctx: PlacementContext<'_>,
    ) -> Result<PlacementResult, CheckoutError> {
        let PlacementContext {
            customer, session, ..
        } = ctx;
        let user = request.user.as_ref().ok_or(CheckoutError::SessionExpired)?;

        let mut cart = self
            .services
            .carts
            .load(cart_id)
            .await?
            .ok_or(CheckoutError::SessionExpired)?;
        if !cart.is_active || !cart.has_items() || cart.has_error || cart.is_multi_shipping {
            return Err(CheckoutError::SessionExpired);
        }

        session.last_user_payload = Some(user.clone());
        add_breadcrumb(
            "checkout",
            "Placement started",
            Some(&[("cart_id", cart_id.to_string().as_str())]),
        );

        self.check_minimum(&cart)?;

        let method = checkout_method(customer, &user.address);
        cart.checkout_method = method;
        self.services.checkout.init_checkout(&mut cart).await?;

        let fragment = self.resolve_address(user, session, &mut cart);
        tracing::debug!(country = %fragment.country_id, ?method, "Address resolved");

        let email = buyer_email(user, customer)?;
        let billing = self.billing_submission(user, customer, method, &cart, &email);
        if let BillingOutcome::Rejected(messages) =
            self.services.checkout.save_billing(&mut cart, &billing).await?
        {
            return Err(CheckoutError::Validation(rejection_message(&messages)));
        }

        NewsletterGate::new(
            self.settings,
            self.services.customers.as_ref(),
            self.services.subscriptions.as_ref(),
        )
        .maybe_subscribe(&email, request.subscribe, customer)
        .await?;

        let shipping_method = non_empty(request.shipping_method.clone());
        if shipping_method.is_none() && !cart.is_virtual {
            return Err(CheckoutError::Validation(SHIPPING_METHOD_MESSAGE.to_string()));
        }

        // Both addresses were validated by the billing save.
        cart.shipping_address.shipping_method = shipping_method;
        cart.shipping_address.should_ignore_validation = true;
        cart.shipping_address.save_in_address_book =
            customer.is_none_or(|c| c.default_shipping.is_none());
        cart.billing_address.should_ignore_validation = true;
        cart.billing_address.save_in_address_book =
            customer.is_none_or(|c| c.default_billing.is_none());

        cart.totals_collected = false;
        self.services.checkout.collect_totals(&mut cart).await?;

        let payment = self
            .services
            .payments
            .save_payment(&mut cart, &request.payment)
            .await?;
        if let Some(url) = payment.redirect_url {
            tracing::info!(cart_id = %cart_id, "Payment requires redirect before ordering");
            return Ok(PlacementResult::PaymentRedirect { url });
        }

        self.check_agreements(request)?;

        let outcome = self.services.checkout.place_order(&cart).await?;
        let order = &outcome.order;
        tracing::info!(
            cart_id = %cart_id,
            order_id = %order.id,
            increment_id = %order.increment_id,
            grand_total = %order.grand_total,
            "Order placed"
        );
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("increment_id", order.increment_id.as_str())]),
        );

        if outcome.redirect_url.is_none() {
            cart.is_active = false;
            self.services.carts.save(&cart).await?;
        }

        // The order exists from here on; later failures are logged only.
        if needs_auto_invoice(order, &self.settings.zero_subtotal) {
            match self
                .services
                .orders
                .register_invoice(&full_invoice(order))
                .await
            {
                Ok(()) => tracing::info!(order_id = %order.id, "Zero-total order invoiced"),
                Err(e) => report_unexpected(&CheckoutError::Backend(e)),
            }
        }

        self.run_hooks(order, request).await;
        session.clear_submission();

        Ok(PlacementResult::Success {
            redirect: outcome
                .redirect_url
                .unwrap_or_else(|| self.settings.success_url.clone()),
        })
    }

    fn check_minimum(&self, cart: &Cart) -> Result<(), CheckoutError> {
        if let Some(minimum) = &self.settings.minimum_order
            && cart.totals.subtotal.amount < minimum.amount
        {
            return Err(CheckoutError::Validation(minimum.message.clone()));
        }
        Ok(())
    }

    fn check_agreements(&self, request: &PlaceOrderRequest) -> Result<(), CheckoutError> {
        let missing = self
            .settings
            .required_agreements
            .iter()
            .any(|id| !request.agreement.contains_key(id));
        if missing {
            return Err(CheckoutError::Validation(AGREEMENTS_MESSAGE.to_string()));
        }
        Ok(())
    }

    /// Parse the submitted location, merge it with the session and defaults,
    /// and write it onto the cart. The result is remembered in the session.
    fn resolve_address(
        &self,
        user: &UserPayload,
        session: &mut SessionCheckoutState,
        cart: &mut Cart,
    ) -> AddressFragment {
        let query = LocationQuery::from(&user.address);
        let parsed = (!query.is_blank()).then(|| {
            LocationParser::new(self.directory, self.settings)
                .parse(&query, self.settings.location_type)
        });

        let resolver = AddressResolver::new(self.settings);
        let fragment = resolver.resolve(parsed.as_ref(), session);
        resolver.apply(&fragment, session, cart);
        session.last_address = Some(fragment.clone());
        fragment
    }

    fn billing_submission(
        &self,
        user: &UserPayload,
        customer: Option<&CustomerAccount>,
        method: Option<CheckoutMethod>,
        cart: &Cart,
        email: &Email,
    ) -> BillingSubmission {
        let mut address = cart.billing_address.clone();

        let (firstname, lastname) = match customer {
            Some(account) => (account.firstname.clone(), account.lastname.clone()),
            None => split_name(user.name.as_deref().unwrap_or_default()),
        };
        address.firstname = firstname;
        address.lastname = lastname;
        address.email = Some(email.clone());
        address.street = user
            .address
            .street
            .iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        address.telephone = non_empty(user.address.telephone.clone())
            .or_else(|| customer.and_then(|c| c.primary_telephone.clone()));

        let customer_address_id = saved_address_id(&user.address);
        address.customer_address_id = customer_address_id;

        let password = (method == Some(CheckoutMethod::Register))
            .then(|| derive_password(self.settings.password_type, user));

        BillingSubmission {
            address,
            customer_address_id,
            password,
            use_for_shipping: true,
        }
    }

    async fn run_hooks(&self, order: &PlacedOrder, request: &PlaceOrderRequest) {
        for hook in self.hooks {
            if let Err(e) = hook.after_place(order, request).await {
                tracing::warn!(
                    hook = hook.name(),
                    order_id = %order.id,
                    error = %e,
                    "Placement hook failed"
                );
            }
        }
    }
}

/// Logged-in buyers check out as customers. Guests without a saved address
/// register; guests reusing one get no method at all.
fn checkout_method(
    customer: Option<&CustomerAccount>,
    address: &AddressInput,
) -> Option<CheckoutMethod> {
    if customer.is_some() {
        Some(CheckoutMethod::Customer)
    } else if saved_address_id(address).is_none() {
        Some(CheckoutMethod::Register)
    } else {
        None
    }
}

fn saved_address_id(address: &AddressInput) -> Option<AddressId> {
    address.id.as_deref().and_then(|id| id.parse().ok())
}

fn buyer_email(
    user: &UserPayload,
    customer: Option<&CustomerAccount>,
) -> Result<Email, CheckoutError> {
    if let Some(account) = customer {
        return Ok(account.email.clone());
    }
    user.email
        .as_deref()
        .and_then(|raw| Email::parse(raw).ok())
        .ok_or_else(|| CheckoutError::Validation(INVALID_EMAIL_MESSAGE.to_string()))
}

/// One message block for a rejected billing save, lines split by `<br>`.
fn rejection_message(messages: &[String]) -> String {
    let lines: Vec<&str> = messages
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect();
    if lines.is_empty() {
        return GENERIC_FAILURE_MESSAGE.to_string();
    }
    lines.join("<br>")
}

/// Split a full name on the first space.
fn split_name(full: &str) -> (String, String) {
    let full = full.trim();
    match full.split_once(' ') {
        Some((first, last)) => (first.trim().to_string(), last.trim().to_string()),
        None => (full.to_string(), String::new()),
    }
}
