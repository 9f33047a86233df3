//! Domain models shared across the auth components.

pub mod auth;
