//! Status and mode enums shared by the checkout engine and its collaborators.

use serde::{Deserialize, Serialize};

/// How the buyer checks out.
///
/// A guest that reuses a saved address carries no method at all; see
/// `Cart::checkout_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMethod {
    /// Logged-in customer.
    Customer,
    /// Guest whose order creates a new account.
    Register,
    /// Guest without an account.
    Guest,
}

impl std::fmt::Display for CheckoutMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Register => write!(f, "register"),
            Self::Guest => write!(f, "guest"),
        }
    }
}

/// Payment action configured for zero-subtotal orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAction {
    #[default]
    Authorize,
    AuthorizeCapture,
}

impl std::str::FromStr for PaymentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "authorize" => Ok(Self::Authorize),
            "authorize_capture" => Ok(Self::AuthorizeCapture),
            _ => Err(format!("invalid payment action: {s}")),
        }
    }
}

/// Order status assigned after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Holded,
    Complete,
    Closed,
    Canceled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Holded => "holded",
            Self::Complete => "complete",
            Self::Closed => "closed",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "holded" => Ok(Self::Holded),
            "complete" => Ok(Self::Complete),
            "closed" => Ok(Self::Closed),
            "canceled" => Ok(Self::Canceled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
