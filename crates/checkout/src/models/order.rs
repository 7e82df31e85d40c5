//! Orders and invoices produced by placement.

use onepage_core::{Money, OrderId, OrderItemId, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An order created from a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    /// Customer-facing order number.
    pub increment_id: String,
    pub status: OrderStatus,
    pub grand_total: Money,
    pub items: Vec<OrderItem>,
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub sku: String,
    pub qty_ordered: Decimal,
}

/// What the backend returns from order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderOutcome {
    pub order: PlacedOrder,
    /// Hosted payment page the buyer must still visit.
    pub redirect_url: Option<String>,
}

/// An invoice registered against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub order_id: OrderId,
    pub items: Vec<InvoiceItem>,
    pub capture: bool,
    pub email_sent: bool,
}

/// Quantity of one order item covered by an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub order_item_id: OrderItemId,
    pub qty: Decimal,
}
