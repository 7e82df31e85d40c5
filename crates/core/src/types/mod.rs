//! Core types for Onepage Checkout.
//!
//! This module provides type-safe wrappers for common checkout concepts.

pub mod country;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use country::{CountryCode, CountryCodeError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money};
pub use status::*;
