//! # Storefront (Streetwear Catalog & Back Office)
//!
//! `storefront` serves a public read-only catalog of brands, categories and
//! products, plus a small admin back office gated by a single shared password.
//!
//! ## Slugs
//!
//! Every brand, category and product is addressed by a URL slug (`[a-z0-9-]`,
//! at most 96 characters). Slugs are derived from the display name,
//! transliterated to ASCII and made unique per namespace by appending `-2`,
//! `-3`, ... The database unique constraints stay authoritative: a racing
//! insert that loses is retried with the next candidate.
//!
//! ## Admin Session
//!
//! The back office uses one `HttpOnly` cookie holding the lowercase hex
//! SHA-256 of `password:salt`. Both values come from the environment
//! (`ADMIN_PASSWORD`, `ADMIN_TOKEN_SALT`); when either is missing no request
//! can authenticate.
//!
//! ## Images
//!
//! Product images are uploaded to an object-storage bucket and referenced by
//! their public URL. Gallery order is the order the admin submitted.

pub mod api;
pub mod bucket;
pub mod catalog;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
