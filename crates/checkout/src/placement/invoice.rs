//! Automatic invoicing of zero-total orders.

use crate::config::ZeroSubtotalSettings;
use crate::models::{Invoice, InvoiceItem, PlacedOrder};

/// True when `order` must be invoiced right after placement.
///
/// All three must hold: the order is free, the store captures zero-subtotal
/// payments automatically, and such orders start out pending.
#[must_use]
pub fn needs_auto_invoice(order: &PlacedOrder, settings: &ZeroSubtotalSettings) -> bool {
    order.grand_total.is_zero() && settings.auto_invoice()
}

/// An invoice covering every ordered item in full.
#[must_use]
pub fn full_invoice(order: &PlacedOrder) -> Invoice {
    Invoice {
        order_id: order.id,
        items: order
            .items
            .iter()
            .map(|item| InvoiceItem {
                order_item_id: item.id,
                qty: item.qty_ordered,
            })
            .collect(),
        capture: true,
        email_sent: true,
    }
}
