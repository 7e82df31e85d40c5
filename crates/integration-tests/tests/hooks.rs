//! Post-placement hooks.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use onepage_checkout::models::{PlaceOrderRequest, PlacedOrder, SessionCheckoutState};
use onepage_checkout::placement::CustomerNoteHook;
use onepage_checkout::services::{BackendError, PlacementHook};
use onepage_integration_tests::{CART_ID, Harness, MemoryBackend, cart, guest_request};
use rust_decimal::Decimal;

struct FailingHook {
    calls: AtomicUsize,
}

#[async_trait]
impl PlacementHook for FailingHook {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn after_place(
        &self,
        _order: &PlacedOrder,
        _request: &PlaceOrderRequest,
    ) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Unavailable("crm offline".to_string()))
    }
}

fn with_note(note: &str) -> PlaceOrderRequest {
    let mut request = guest_request("olena@example.com");
    request.user.as_mut().unwrap().note = Some(note.to_string());
    request
}

#[tokio::test]
async fn test_customer_note_is_attached_without_markup() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone())
        .with_hook(Arc::new(CustomerNoteHook::new(backend.clone())));

    let result = harness
        .place(
            &with_note("  <b>Leave at the door</b><script>x</script> "),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;
    assert!(result.is_success());

    let state = backend.state();
    assert_eq!(state.comments.len(), 1);
    assert_eq!(state.comments[0].0, state.placed[0].id);
    assert_eq!(state.comments[0].1, "Leave at the doorx");
}

#[tokio::test]
async fn test_blank_note_adds_no_comment() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let harness = Harness::new(backend.clone())
        .with_hook(Arc::new(CustomerNoteHook::new(backend.clone())));

    harness
        .place(
            &with_note("<br/>  "),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;

    assert!(backend.state().comments.is_empty());
}

#[tokio::test]
async fn test_failing_hook_does_not_undo_the_order() {
    let backend = MemoryBackend::with_cart(cart(1, Decimal::new(2000, 2)));
    let failing = Arc::new(FailingHook {
        calls: AtomicUsize::new(0),
    });
    let harness = Harness::new(backend.clone())
        .with_hook(failing.clone())
        .with_hook(Arc::new(CustomerNoteHook::new(backend.clone())));

    let result = harness
        .place(
            &with_note("Call before delivery"),
            None,
            &mut SessionCheckoutState::default(),
        )
        .await;

    assert!(result.is_success());
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    // Later hooks still run.
    assert_eq!(backend.state().comments[0].1, "Call before delivery");
    assert!(!backend.cart(CART_ID).unwrap().is_active);
}
