//! Unified error handling with Sentry integration.
//!
//! Two layers live here:
//!
//! - [`CheckoutError`], the engine taxonomy. The placement boundary turns it
//!   into exactly one [`PlacementResult`](crate::models::PlacementResult).
//! - [`AppError`], the HTTP boundary for the remaining endpoints. It captures
//!   server errors to Sentry before responding and never exposes internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::BackendError;

/// Message shown for any fault the buyer cannot act on.
pub const GENERIC_FAILURE_MESSAGE: &str = "Unable to process your order. Please try again later";

/// Message for a placement that races another one on the same cart.
pub const BUSY_MESSAGE: &str = "Your order is already being processed. Please wait.";

/// Message for an opt-in with an email owned by someone else.
pub const SUBSCRIPTION_CONFLICT_MESSAGE: &str =
    "Sorry, you are trying to subscribe email assigned to another user";

/// Failures of the checkout engine.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Buyer-correctable problem; the message is shown as-is.
    #[error("{0}")]
    Validation(String),

    /// Newsletter opt-in for an email that belongs to another account.
    #[error("{SUBSCRIPTION_CONFLICT_MESSAGE}")]
    SubscriptionConflict,

    /// Cart is gone, empty, flagged or mid multi-address checkout.
    #[error("checkout session expired")]
    SessionExpired,

    /// Another placement holds the cart.
    #[error("{BUSY_MESSAGE}")]
    Busy,

    /// A collaborator failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Programming fault or broken invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Message safe to show the buyer, or `None` for a silent redirect.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Validation(message) => Some(message.clone()),
            Self::SubscriptionConflict | Self::Busy => Some(self.to_string()),
            Self::SessionExpired => None,
            Self::Backend(_) | Self::Internal(_) => Some(GENERIC_FAILURE_MESSAGE.to_string()),
        }
    }

    /// True for faults that must be reported to operators.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Internal(_))
    }
}

/// Application-level error type for HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Commerce backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Backend(_) => "External service error".to_string(),
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Capture an unexpected engine fault and log it with the Sentry event id.
pub fn report_unexpected(error: &CheckoutError) {
    let event_id = sentry::capture_error(error);
    tracing::error!(
        error = %error,
        sentry_event_id = %event_id,
        "Unexpected checkout failure"
    );
}

/// Set the Sentry user context for a logged-in customer.
pub fn set_sentry_user(customer_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb marking a checkout step.
///
/// Breadcrumbs appear in Sentry reports as the trail leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
