//! Onepage checkout library.
//!
//! A single-page checkout front end for a commerce backend: free-text
//! location parsing and autocomplete, address resolution against the
//! country/region directory, shipping auto-selection, newsletter opt-in and
//! the order placement workflow. Carts, orders and customers live in the
//! backend and are reached through the traits in [`services`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod location;
pub mod middleware;
pub mod models;
pub mod newsletter;
pub mod placement;
pub mod routes;
pub mod services;
pub mod shipping;
pub mod state;
