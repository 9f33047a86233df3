//! # warden_core
//!
//! Core authentication logic for Warden: password credentials, signed
//! session tokens, account storage and Linux.do sign-in.

pub mod auth;
pub mod config;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
