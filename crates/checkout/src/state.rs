//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{CheckoutConfig, CheckoutSettings};
use crate::directory::CountryRegionIndex;
use crate::placement::{CartLocks, OrderPlacement};
use crate::services::{Collaborators, PlacementHook};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CheckoutConfig,
    pool: PgPool,
    directory: CountryRegionIndex,
    services: Collaborators,
    hooks: Vec<Arc<dyn PlacementHook>>,
    locks: CartLocks,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Checkout configuration
    /// * `pool` - `PostgreSQL` pool backing the session store
    /// * `directory` - Country/region reference data
    /// * `services` - Commerce collaborators
    /// * `hooks` - Run after each placed order, in order
    #[must_use]
    pub fn new(
        config: CheckoutConfig,
        pool: PgPool,
        directory: CountryRegionIndex,
        services: Collaborators,
        hooks: Vec<Arc<dyn PlacementHook>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                directory,
                services,
                hooks,
                locks: CartLocks::new(),
            }),
        }
    }

    /// Get a reference to the checkout configuration.
    #[must_use]
    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    /// Store behaviour settings.
    #[must_use]
    pub fn settings(&self) -> &CheckoutSettings {
        &self.inner.config.settings
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Country/region reference data.
    #[must_use]
    pub fn directory(&self) -> &CountryRegionIndex {
        &self.inner.directory
    }

    /// Commerce collaborators.
    #[must_use]
    pub fn services(&self) -> &Collaborators {
        &self.inner.services
    }

    /// Order placement wired to this state.
    #[must_use]
    pub fn placement(&self) -> OrderPlacement<'_> {
        OrderPlacement::new(
            &self.inner.config.settings,
            &self.inner.directory,
            &self.inner.services,
            &self.inner.hooks,
            &self.inner.locks,
        )
    }
}
