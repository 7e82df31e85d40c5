//! Terminal outcome of an order placement.

use serde::Serialize;

/// Exactly one of these is produced per place-order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementResult {
    /// Nothing to check out; send the buyer back to the cart.
    Expired { redirect: String },
    /// Placement stopped; show `message`.
    Error { message: String },
    /// Payment needs an external page before an order can exist.
    PaymentRedirect { url: String },
    /// Order placed.
    Success { redirect: String },
}

impl PlacementResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// JSON body returned by `POST /checkout/place`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementResponse {
    pub success: bool,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<PlacementResult> for PlacementResponse {
    fn from(result: PlacementResult) -> Self {
        match result {
            PlacementResult::Expired { redirect } => Self {
                success: false,
                error: false,
                redirect: Some(redirect),
                error_message: None,
            },
            PlacementResult::Error { message } => Self {
                success: false,
                error: true,
                redirect: None,
                error_message: Some(message),
            },
            PlacementResult::PaymentRedirect { url } => Self {
                success: true,
                error: false,
                redirect: Some(url),
                error_message: None,
            },
            PlacementResult::Success { redirect } => Self {
                success: true,
                error: false,
                redirect: Some(redirect),
                error_message: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let response = PlacementResponse::from(PlacementResult::Error {
            message: "Invalid shipping method.".to_string(),
        });
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": true,
                "error_message": "Invalid shipping method."
            })
        );
    }

    #[test]
    fn test_expired_is_redirect_without_message() {
        let response = PlacementResponse::from(PlacementResult::Expired {
            redirect: "/checkout/cart".to_string(),
        });
        assert!(!response.success);
        assert!(!response.error);
        assert_eq!(response.redirect.as_deref(), Some("/checkout/cart"));
        assert!(response.error_message.is_none());
    }
}
