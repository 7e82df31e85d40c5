//! Post-placement hooks.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::models::{PlaceOrderRequest, PlacedOrder};
use crate::services::{BackendError, OrderService, PlacementHook};

/// Regex for markup tags in buyer notes.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

/// Attaches the buyer's `user[note]` to the order as a comment.
pub struct CustomerNoteHook {
    orders: Arc<dyn OrderService>,
}

impl CustomerNoteHook {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderService>) -> Self {
        Self { orders }
    }
}

/// Note text with markup removed, or `None` when nothing is left.
#[must_use]
pub fn clean_note(raw: &str) -> Option<String> {
    let stripped = TAG_RE.replace_all(raw, "");
    let trimmed = stripped.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[async_trait]
impl PlacementHook for CustomerNoteHook {
    fn name(&self) -> &'static str {
        "customer_note"
    }

    async fn after_place(
        &self,
        order: &PlacedOrder,
        request: &PlaceOrderRequest,
    ) -> Result<(), BackendError> {
        let Some(note) = request
            .user
            .as_ref()
            .and_then(|u| u.note.as_deref())
            .and_then(clean_note)
        else {
            return Ok(());
        };

        self.orders.add_comment(order.id, &note).await?;
        tracing::debug!(order_id = %order.id, "Customer note attached");
        Ok(())
    }
}
