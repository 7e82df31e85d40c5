//! Onepage Core - Shared checkout types.
//!
//! This crate provides the domain vocabulary used across all Onepage components:
//! - `checkout` - The checkout engine and its HTTP surface
//! - `cli` - Operator tooling (session migrations, reference data checks)
//! - `integration-tests` - End-to-end placement scenarios
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, money, country codes and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
