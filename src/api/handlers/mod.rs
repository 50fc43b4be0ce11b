//! HTTP handlers for the storefront.
//!
//! `catalog` serves the public read-only surface, `admin` the cookie-gated
//! back office and `health` the liveness probe.

pub mod admin;
pub mod catalog;
pub mod health;
