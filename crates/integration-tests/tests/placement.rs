//! Order placement against the in-memory backend.
//!
//! Run with: cargo test -p onepage-integration-tests

#![allow(clippy::unwrap_used)]

use onepage_checkout::config::{CheckoutSettings, MinimumOrder, ZeroSubtotalSettings};
use onepage_checkout::error::{BUSY_MESSAGE, GENERIC_FAILURE_MESSAGE};
use onepage_checkout::models::{PlacementResult, SessionCheckoutState};
use onepage_checkout::placement::{
    AGREEMENTS_MESSAGE, INVALID_EMAIL_MESSAGE, PlacementContext, SHIPPING_METHOD_MESSAGE,
};
use onepage_core::{CheckoutMethod, OrderStatus, PaymentAction};
use onepage_integration_tests::{
    CART_ID, Harness, MemoryBackend, address_id, cart, customer, guest_request,
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;

fn success() -> PlacementResult {
    PlacementResult::Success {
        redirect: "/checkout/success".to_string(),
    }
}

fn error(message: &str) -> PlacementResult {
    PlacementResult::Error {
        message: message.to_string(),
    }
}

fn expired() -> PlacementResult {
    PlacementResult::Expired {
        redirect: "/checkout/cart".to_string(),
    }
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_guest_places_order() {
    let backend = MemoryBackend::with_cart(cart(2, Decimal::new(4000, 2)));
    let harness = Harness::new(backend.clone());
    let mut session = SessionCheckoutState::default();

    let result = harness
        .place(&guest_request("Olena@Example.com"), None, &mut session)
        .await;
    assert_eq!(result, success());

    let state = backend.state();
    assert_eq!(state.init_calls, 1);
    assert_eq!(state.placed.len(), 1);
    assert_eq!(state.placed[0].items.len(), 2);
    assert!(state.invoices.is_empty());

    let billing = &state.billing_submissions[0];
    assert_eq!(billing.address.firstname, "Olena");
    assert_eq!(billing.address.lastname, "Petrenko");
    assert_eq!(billing.address.street, vec!["Khreshchatyk 1"]);
    assert_eq!(
        billing.address.email.as_ref().unwrap().as_str(),
        "olena@example.com"
    );
    assert!(billing.use_for_shipping);
    assert!(billing.customer_address_id.is_none());
    // A guest without a saved address registers and gets a generated password.
    assert_eq!(
        billing.password.as_ref().unwrap().expose_secret().len(),
        8
    );
    drop(state);

    let saved = backend.cart(CART_ID).unwrap();
    assert!(!saved.is_active);
    assert_eq!(saved.checkout_method, Some(CheckoutMethod::Register));
    assert_eq!(
        saved.shipping_address.shipping_method.as_deref(),
        Some("flatrate_flatrate")
    );
    assert!(saved.shipping_address.save_in_address_book);
    assert!(saved.shipping_address.should_ignore_validation);
    assert!(saved.billing_address.should_ignore_validation);
    assert_eq!(
        saved.shipping_address.country_id.as_ref().unwrap().as_str(),
        "US"
    );
    assert!(saved.totals_collected);

    assert!(session.last_user_payload.is_none());
    assert!(session.last_address.is_none());
}

#[tokio::test]
async fn test_logged_in_customer_uses_account_details() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(1500, 2)));
    let harness = Harness::new(backend.clone());
    let mut account = customer(7, "taras@example.com");
    account.default_billing = Some(address_id(3));

    let mut request = guest_request("someone-else@example.com");
    request.user.as_mut().unwrap().name = None;

    let result = harness
        .place(&request, Some(&account), &mut SessionCheckoutState::default())
        .await;
    assert_eq!(result, success());

    let state = backend.state();
    let billing = &state.billing_submissions[0];
    assert_eq!(billing.address.firstname, "Taras");
    assert_eq!(billing.address.lastname, "Shevchenko");
    assert_eq!(
        billing.address.email.as_ref().unwrap().as_str(),
        "taras@example.com"
    );
    assert!(billing.password.is_none());
    drop(state);

    let saved = backend.cart(CART_ID).unwrap();
    assert_eq!(saved.checkout_method, Some(CheckoutMethod::Customer));
    // Only the address kind without a default is saved to the address book.
    assert!(!saved.billing_address.save_in_address_book);
    assert!(saved.shipping_address.save_in_address_book);
}

#[tokio::test]
async fn test_saved_address_has_no_checkout_method() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(1500, 2)));
    let harness = Harness::new(backend.clone());

    let mut request = guest_request("olena@example.com");
    request.user.as_mut().unwrap().address.id = Some("12".to_string());

    let result = harness
        .place(&request, None, &mut SessionCheckoutState::default())
        .await;
    assert_eq!(result, success());

    let state = backend.state();
    assert_eq!(
        state.billing_submissions[0].customer_address_id,
        Some(address_id(12))
    );
    assert!(state.billing_submissions[0].password.is_none());
    drop(state);
    assert_eq!(backend.cart(CART_ID).unwrap().checkout_method, None);
}

#[tokio::test]
async fn test_order_redirect_keeps_cart_active() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(1500, 2)));
    backend.state().order_redirect = Some("https://pay.example.com/order/1".to_string());
    let harness = Harness::new(backend.clone());

    let result = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;

    assert_eq!(
        result,
        PlacementResult::Success {
            redirect: "https://pay.example.com/order/1".to_string(),
        }
    );
    assert_eq!(backend.state().placed.len(), 1);
    assert!(backend.cart(CART_ID).unwrap().is_active);
}

// ============================================================================
// Zero-total invoicing
// ============================================================================

fn zero_subtotal_settings(order_status: OrderStatus) -> CheckoutSettings {
    CheckoutSettings {
        zero_subtotal: ZeroSubtotalSettings {
            payment_action: PaymentAction::AuthorizeCapture,
            order_status,
        },
        ..CheckoutSettings::default()
    }
}

#[tokio::test]
async fn test_zero_total_order_is_invoiced() {
    let backend = MemoryBackend::with_cart(cart(3, Decimal::ZERO));
    let harness =
        Harness::new(backend.clone()).with_settings(zero_subtotal_settings(OrderStatus::Pending));

    let result = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;
    assert_eq!(result, success());

    let state = backend.state();
    assert_eq!(state.invoices.len(), 1);
    let invoice = &state.invoices[0];
    assert_eq!(invoice.order_id, state.placed[0].id);
    assert_eq!(invoice.items.len(), 3);
    assert!(invoice.capture);
    assert!(invoice.email_sent);
}

#[tokio::test]
async fn test_invoice_failure_still_completes_order() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::ZERO));
    backend.state().invoice_failure = Some("Invoice service down".to_string());
    let harness =
        Harness::new(backend.clone()).with_settings(zero_subtotal_settings(OrderStatus::Pending));
    let mut session = SessionCheckoutState {
        last_user_payload: Some(guest_request("olena@example.com").user.unwrap()),
        ..SessionCheckoutState::default()
    };

    let result = harness
        .place(&guest_request("olena@example.com"), None, &mut session)
        .await;
    assert_eq!(result, success());

    let state = backend.state();
    assert_eq!(state.placed.len(), 1);
    assert!(state.invoices.is_empty());
    drop(state);
    assert!(!backend.cart(CART_ID).unwrap().is_active);
    assert!(session.last_user_payload.is_none());
}

#[tokio::test]
async fn test_zero_total_not_invoiced_unless_pending() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::ZERO));
    let harness = Harness::new(backend.clone())
        .with_settings(zero_subtotal_settings(OrderStatus::Processing));

    let result = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;
    assert_eq!(result, success());
    assert!(backend.state().invoices.is_empty());
}

#[tokio::test]
async fn test_paid_order_is_not_invoiced() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(999, 2)));
    let harness =
        Harness::new(backend.clone()).with_settings(zero_subtotal_settings(OrderStatus::Pending));

    harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;
    assert!(backend.state().invoices.is_empty());
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_minimum_order_amount() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone()).with_settings(CheckoutSettings {
        minimum_order: Some(MinimumOrder {
            amount: Decimal::new(5000, 2),
            message: "Minimum order is $50.".to_string(),
        }),
        ..CheckoutSettings::default()
    });
    let mut session = SessionCheckoutState::default();

    let result = harness
        .place(&guest_request("olena@example.com"), None, &mut session)
        .await;

    assert_eq!(result, error("Minimum order is $50."));
    assert_eq!(backend.state().init_calls, 0);
    assert!(backend.state().placed.is_empty());
    // The form can be refilled from the session.
    assert!(session.last_user_payload.is_some());
}

#[tokio::test]
async fn test_missing_shipping_method() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone());

    let mut request = guest_request("olena@example.com");
    request.shipping_method = Some("   ".to_string());

    let result = harness
        .place(&request, None, &mut SessionCheckoutState::default())
        .await;

    assert_eq!(result, error(SHIPPING_METHOD_MESSAGE));
    assert!(backend.state().placed.is_empty());
    assert!(backend.cart(CART_ID).unwrap().is_active);
}

#[tokio::test]
async fn test_virtual_cart_needs_no_shipping_method() {
    let mut virtual_cart = cart(1, Decimal::new(2000, 2));
    virtual_cart.is_virtual = true;
    let backend = MemoryBackend::with_cart(virtual_cart);
    let harness = Harness::new(backend.clone());

    let mut request = guest_request("olena@example.com");
    request.shipping_method = None;

    let result = harness
        .place(&request, None, &mut SessionCheckoutState::default())
        .await;
    assert_eq!(result, success());
    assert_eq!(backend.state().placed.len(), 1);
}

#[tokio::test]
async fn test_invalid_guest_email() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone());

    let result = harness
        .place(
            &guest_request("not-an-email"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;

    assert_eq!(result, error(INVALID_EMAIL_MESSAGE));
    assert!(backend.state().billing_submissions.is_empty());
}

#[tokio::test]
async fn test_billing_rejection_joins_messages() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    backend.state().billing_rejection = Some(vec![
        "Please enter the street.".to_string(),
        "Please enter the telephone number.".to_string(),
    ]);
    let harness = Harness::new(backend.clone());

    let result = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;

    assert_eq!(
        result,
        error("Please enter the street.<br>Please enter the telephone number.")
    );
    assert!(backend.state().placed.is_empty());
}

#[tokio::test]
async fn test_empty_billing_rejection_uses_generic_message() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    backend.state().billing_rejection = Some(Vec::new());
    let harness = Harness::new(backend.clone());

    let result = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;

    assert_eq!(result, error(GENERIC_FAILURE_MESSAGE));
    assert!(backend.state().placed.is_empty());
}

#[tokio::test]
async fn test_payment_redirect_creates_no_order() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    backend.state().payment_redirect = Some("https://pay.example.com/hosted".to_string());
    let harness = Harness::new(backend.clone());

    let result = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;

    assert_eq!(
        result,
        PlacementResult::PaymentRedirect {
            url: "https://pay.example.com/hosted".to_string(),
        }
    );
    let state = backend.state();
    assert!(state.placed.is_empty());
    assert_eq!(
        state.saved_payments[0].method.as_deref(),
        Some("checkmo")
    );
}

#[tokio::test]
async fn test_required_agreements() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone()).with_settings(CheckoutSettings {
        required_agreements: vec!["1".to_string(), "2".to_string()],
        ..CheckoutSettings::default()
    });

    let mut request = guest_request("olena@example.com");
    request.agreement.insert("1".to_string(), "1".to_string());

    let result = harness
        .place(&request, None, &mut SessionCheckoutState::default())
        .await;
    assert_eq!(result, error(AGREEMENTS_MESSAGE));
    assert!(backend.state().placed.is_empty());

    request.agreement.insert("2".to_string(), "1".to_string());
    let result = harness
        .place(&request, None, &mut SessionCheckoutState::default())
        .await;
    assert_eq!(result, success());
}

#[tokio::test]
async fn test_backend_failure_shows_generic_message() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    backend.state().place_order_failure = Some("SQLSTATE[40001]: deadlock".to_string());
    let harness = Harness::new(backend.clone());

    let result = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;

    assert_eq!(result, error(GENERIC_FAILURE_MESSAGE));
    assert!(backend.cart(CART_ID).unwrap().is_active);
}

// ============================================================================
// Expired checkouts
// ============================================================================

#[tokio::test]
async fn test_expired_without_submission() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone());
    let request = guest_request("olena@example.com");

    let no_cart = harness
        .placement()
        .place(
            None,
            &request,
            PlacementContext {
                is_post: true,
                customer: None,
                session: &mut SessionCheckoutState::default(),
            },
        )
        .await;
    assert_eq!(no_cart, expired());

    let not_posted = harness
        .placement()
        .place(
            Some(CART_ID),
            &request,
            PlacementContext {
                is_post: false,
                customer: None,
                session: &mut SessionCheckoutState::default(),
            },
        )
        .await;
    assert_eq!(not_posted, expired());

    let mut no_user = request.clone();
    no_user.user = None;
    let result = harness
        .place(&no_user, None, &mut SessionCheckoutState::default())
        .await;
    assert_eq!(result, expired());

    assert_eq!(backend.state().init_calls, 0);
}

#[tokio::test]
async fn test_expired_for_unusable_carts() {
    let empty = cart(0, Decimal::ZERO);
    let mut inactive = cart(1, Decimal::ONE);
    inactive.is_active = false;
    let mut flagged = cart(1, Decimal::ONE);
    flagged.has_error = true;
    let mut multi = cart(1, Decimal::ONE);
    multi.is_multi_shipping = true;

    for unusable in [empty, inactive, flagged, multi] {
        let backend = MemoryBackend::with_cart(unusable);
        let harness = Harness::new(backend.clone());
        let mut session = SessionCheckoutState::default();

        let result = harness
            .place(&guest_request("olena@example.com"), None, &mut session)
            .await;

        assert_eq!(result, expired());
        assert!(session.is_empty());
        assert!(backend.state().placed.is_empty());
    }

    let harness = Harness::new(std::sync::Arc::new(MemoryBackend::default()));
    let missing = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;
    assert_eq!(missing, expired());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_placement_is_busy() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone());

    let guard = harness.locks.try_acquire(CART_ID).await.unwrap();
    let result = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;
    assert_eq!(result, error(BUSY_MESSAGE));
    assert!(backend.state().placed.is_empty());

    drop(guard);
    let result = harness
        .place(
            &guest_request("olena@example.com"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;
    assert_eq!(result, success());
}

#[tokio::test]
async fn test_second_placement_of_same_cart_expires() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone());
    let request = guest_request("olena@example.com");

    let first = harness
        .place(&request, None, &mut SessionCheckoutState::default())
        .await;
    let second = harness
        .place(&request, None, &mut SessionCheckoutState::default())
        .await;

    assert_eq!(first, success());
    assert_eq!(second, expired());
    assert_eq!(backend.state().placed.len(), 1);
}
