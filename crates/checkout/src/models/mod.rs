//! Domain models for the checkout.

mod address;
mod cart;
mod order;
mod placement;
mod request;
pub mod session;

pub use address::{Address, AddressFragment, non_empty};
pub use cart::{Cart, CartTotals, PaymentMethod, RateGroups, ShippingRate};
pub use order::{Invoice, InvoiceItem, OrderItem, PlaceOrderOutcome, PlacedOrder};
pub use placement::{PlacementResponse, PlacementResult};
pub use request::{AddressInput, PaymentInput, PlaceOrderRequest, UserPayload};
pub use session::{CustomerAccount, SessionCheckoutState, keys as session_keys};
