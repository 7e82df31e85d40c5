//! Newsletter opt-in during checkout.

use onepage_core::Email;

use crate::config::CheckoutSettings;
use crate::error::CheckoutError;
use crate::models::CustomerAccount;
use crate::services::{
    CustomerDirectory, SubscriptionNotices, SubscriptionService, SubscriptionStatus,
};

/// What the gate did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Skipped,
    Subscribed(SubscriptionStatus),
}

/// Decides whether the submitted email gets subscribed.
pub struct NewsletterGate<'a> {
    settings: &'a CheckoutSettings,
    customers: &'a dyn CustomerDirectory,
    subscriptions: &'a dyn SubscriptionService,
}

impl<'a> NewsletterGate<'a> {
    #[must_use]
    pub fn new(
        settings: &'a CheckoutSettings,
        customers: &'a dyn CustomerDirectory,
        subscriptions: &'a dyn SubscriptionService,
    ) -> Self {
        Self {
            settings,
            customers,
            subscriptions,
        }
    }

    /// Subscribe `email` if the buyer opted in.
    ///
    /// An email that belongs to an account other than `customer` is
    /// refused, so nobody can subscribe someone else's address.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::SubscriptionConflict`] for an email owned by
    /// another account, or [`CheckoutError::Backend`] if a lookup fails.
    pub async fn maybe_subscribe(
        &self,
        email: &Email,
        wants_subscribe: bool,
        customer: Option<&CustomerAccount>,
    ) -> Result<GateOutcome, CheckoutError> {
        if !wants_subscribe || !self.settings.newsletter.is_visible() {
            return Ok(GateOutcome::Skipped);
        }
        if customer.is_none() && !self.settings.guest_may_subscribe {
            tracing::debug!(email = %email, "Guest subscriptions disabled");
            return Ok(GateOutcome::Skipped);
        }
        if self.subscriptions.is_subscribed(email).await? {
            return Ok(GateOutcome::Skipped);
        }

        let owner = self.customers.find_by_email(email).await?;
        if let Some(owner) = owner
            && customer.is_none_or(|c| c.id != owner)
        {
            tracing::warn!(email = %email, owner = %owner, "Newsletter email belongs to another account");
            return Err(CheckoutError::SubscriptionConflict);
        }

        let notices = SubscriptionNotices {
            request: self.settings.newsletter_send_request,
            success: self.settings.newsletter_send_success,
        };
        let status = self.subscriptions.subscribe(email, notices).await?;
        tracing::info!(email = %email, ?status, "Newsletter subscription created");

        Ok(GateOutcome::Subscribed(status))
    }
}
