//! Newsletter opt-in during placement.

#![allow(clippy::unwrap_used)]

use onepage_checkout::config::{CheckoutSettings, NewsletterVisibility};
use onepage_checkout::error::SUBSCRIPTION_CONFLICT_MESSAGE;
use onepage_checkout::models::{PlaceOrderRequest, PlacementResult, SessionCheckoutState};
use onepage_checkout::services::SubscriptionNotices;
use onepage_core::CustomerId;
use onepage_integration_tests::{Harness, MemoryBackend, cart, customer, guest_request};
use rust_decimal::Decimal;

fn subscribing(email: &str) -> PlaceOrderRequest {
    PlaceOrderRequest {
        subscribe: true,
        ..guest_request(email)
    }
}

async fn place(harness: &Harness, request: &PlaceOrderRequest) -> PlacementResult {
    harness
        .place(request, None, &mut SessionCheckoutState::default())
        .await
}

#[tokio::test]
async fn test_guest_subscribes_with_configured_notices() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone()).with_settings(CheckoutSettings {
        newsletter_send_request: true,
        newsletter_send_success: false,
        ..CheckoutSettings::default()
    });

    let result = place(&harness, &subscribing("olena@example.com")).await;
    assert!(result.is_success());

    let state = backend.state();
    assert_eq!(
        state.subscriptions,
        vec![(
            "olena@example.com".to_string(),
            SubscriptionNotices {
                request: true,
                success: false,
            }
        )]
    );
    assert_eq!(state.placed.len(), 1);
}

#[tokio::test]
async fn test_email_of_another_account_blocks_the_order() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    backend
        .state()
        .customers
        .insert("olena@example.com".to_string(), CustomerId::new(99));
    let harness = Harness::new(backend.clone());

    let result = place(&harness, &subscribing("olena@example.com")).await;

    assert_eq!(
        result,
        PlacementResult::Error {
            message: SUBSCRIPTION_CONFLICT_MESSAGE.to_string(),
        }
    );
    let state = backend.state();
    assert!(state.subscriptions.is_empty());
    assert!(state.placed.is_empty());
}

#[tokio::test]
async fn test_account_owner_may_subscribe_own_email() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    backend
        .state()
        .customers
        .insert("taras@example.com".to_string(), CustomerId::new(7));
    let harness = Harness::new(backend.clone());
    let account = customer(7, "taras@example.com");

    let result = harness
        .place(
            &subscribing("ignored@example.com"),
            Some(&account),
            &mut SessionCheckoutState::default(),
        )
        .await;

    assert!(result.is_success());
    assert_eq!(backend.state().subscriptions[0].0, "taras@example.com");
}

#[tokio::test]
async fn test_no_subscription_without_opt_in() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone());

    let result = place(&harness, &guest_request("olena@example.com")).await;

    assert!(result.is_success());
    assert!(backend.state().subscriptions.is_empty());
}

#[tokio::test]
async fn test_skipped_when_checkbox_hidden_or_guests_disallowed() {
    for settings in [
        CheckoutSettings {
            newsletter: NewsletterVisibility::Invisible,
            ..CheckoutSettings::default()
        },
        CheckoutSettings {
            guest_may_subscribe: false,
            ..CheckoutSettings::default()
        },
    ] {
        let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
        // Ownership is not even checked when the gate is closed.
        backend
            .state()
            .customers
            .insert("olena@example.com".to_string(), CustomerId::new(99));
        let harness = Harness::new(backend.clone()).with_settings(settings);

        let result = place(&harness, &subscribing("olena@example.com")).await;

        assert!(result.is_success());
        assert!(backend.state().subscriptions.is_empty());
    }
}

#[tokio::test]
async fn test_already_subscribed_is_left_alone() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    backend
        .state()
        .subscribed
        .insert("olena@example.com".to_string());
    let harness = Harness::new(backend.clone());

    let result = place(&harness, &subscribing("olena@example.com")).await;

    assert!(result.is_success());
    assert!(backend.state().subscriptions.is_empty());
}
