//! Admin back office endpoints.
//!
//! Every handler runs [`require_admin`] before touching the catalog, so an
//! unauthenticated request never reaches a read or a write. Path and body
//! extractors are taken as `Result`s and only inspected through [`accepted`]
//! after the gate, so a malformed request without a session still gets the
//! login redirect. Pages redirect to
//! the login entry point; the upload endpoint answers `401` instead because
//! its caller is a script, not a browser navigation.
//!
//! Flow Overview:
//! 1) Read the `admin` cookie and check it against the gate.
//! 2) Validate and normalize the payload.
//! 3) Allocate a slug where a record is created.
//! 4) Write through the injected catalog store.

pub(crate) mod facets;
pub(crate) mod gate;
pub(crate) mod products;
pub(crate) mod session;
pub(crate) mod types;
pub(crate) mod upload;
pub(crate) mod variants;


use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, error};
use url::Url;

use crate::{
    bucket::BucketError,
    catalog::{DEFAULT_CURRENCY, StoreError, slug::SlugError},
};

pub use gate::{AdminGate, GateError};

pub const LOGIN_PATH: &str = "/admin/login";
pub const LOGIN_FAILED_PATH: &str = "/admin/login?error=1";
pub const HOME_PATH: &str = "/admin";

/// Admin listing cap for products.
pub const ADMIN_PRODUCT_LIMIT: i64 = 100;

#[derive(Debug)]
pub(crate) enum AdminError {
    BadRequest(&'static str),
    NotFound,
    Conflict(&'static str),
    Slug(SlugError),
    Store(StoreError),
    Bucket(BucketError),
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<SlugError> for AdminError {
    fn from(err: SlugError) -> Self {
        match err {
            SlugError::Store(err) => Self::Store(err),
            err @ SlugError::Exhausted { .. } => Self::Slug(err),
        }
    }
}

impl From<BucketError> for AdminError {
    fn from(err: BucketError) -> Self {
        Self::Bucket(err)
    }
}

impl IntoResponse for AdminError {
    /// Maps admin failures into stable HTTP responses.
    /// Server-side failures are logged and surfaced without details.
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Conflict(message) => (StatusCode::CONFLICT, message).into_response(),
            Self::Store(StoreError::SlugTaken) => {
                (StatusCode::CONFLICT, "Slug is already taken.").into_response()
            }
            Self::Store(StoreError::SkuTaken) => {
                (StatusCode::CONFLICT, "SKU is already taken.").into_response()
            }
            Self::Store(StoreError::NotFound) => StatusCode::NOT_FOUND.into_response(),
            Self::Store(StoreError::ForeignKey) => {
                (StatusCode::BAD_REQUEST, "Unknown brand or category.").into_response()
            }
            Self::Store(StoreError::Database(err)) => {
                error!("Database error: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Slug(err) => {
                error!("Slug allocation failed: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Bucket(BucketError::NotConfigured) => {
                error!("Image upload attempted without object storage configuration");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Bucket(err) => {
                error!("Image upload failed: {err}");
                StatusCode::BAD_GATEWAY.into_response()
            }
        }
    }
}

/// Gate for admin pages: redirects to the login entry point unless the
/// request carries a valid `admin` cookie.
pub(crate) fn require_admin(headers: &HeaderMap, gate: &AdminGate) -> Result<(), Response> {
    if is_admin(headers, gate) {
        Ok(())
    } else {
        debug!("admin request without a valid session, redirecting to login");
        Err(Redirect::to(LOGIN_PATH).into_response())
    }
}

/// Unwraps an extractor once the gate has passed; a rejection is answered
/// with its own status and message.
pub(crate) fn accepted<T, R>(extracted: Result<T, R>) -> Result<T, Response>
where
    R: IntoResponse + std::fmt::Display,
{
    extracted.map_err(|rejection| {
        debug!("admin request rejected: {rejection}");
        rejection.into_response()
    })
}

pub(crate) fn is_admin(headers: &HeaderMap, gate: &AdminGate) -> bool {
    let token = gate::extract_admin_token(headers);
    gate.is_authenticated(token.as_deref())
}

/// Trimmed, non-empty text or `None`.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Uppercase ISO-4217 style code; defaults when absent or blank.
pub(crate) fn normalize_currency(value: Option<&str>) -> Result<String, AdminError> {
    let Some(code) = non_empty(value) else {
        return Ok(DEFAULT_CURRENCY.to_string());
    };
    if code.len() == 3 && code.chars().all(|ch| ch.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(AdminError::BadRequest("Invalid currency."))
    }
}

pub(crate) fn validate_price(price_cents: i64) -> Result<i64, AdminError> {
    if price_cents > 0 {
        Ok(price_cents)
    } else {
        Err(AdminError::BadRequest("Price must be positive."))
    }
}

/// Keeps gallery order; blank entries are dropped, anything else must be an http(s) URL.
pub(crate) fn validate_images(images: &[String]) -> Result<Vec<String>, AdminError> {
    images
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(|url| match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url.to_string()),
            _ => Err(AdminError::BadRequest("Invalid image URL.")),
        })
        .collect()
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn currency_defaults_and_uppercases() {
        assert!(matches!(normalize_currency(None), Ok(code) if code == "RUB"));
        assert!(matches!(normalize_currency(Some("  ")), Ok(code) if code == "RUB"));
        assert!(matches!(normalize_currency(Some("usd")), Ok(code) if code == "USD"));
        assert!(normalize_currency(Some("rubles")).is_err());
        assert!(normalize_currency(Some("U$D")).is_err());
    }

    #[test]
    fn price_must_be_positive() {
        assert!(validate_price(1).is_ok());
        assert!(validate_price(0).is_err());
        assert!(validate_price(-100).is_err());
    }

    #[test]
    fn images_keep_order_and_reject_non_http() {
        let images = vec![
            " https://cdn.example.com/b.png ".to_string(),
            String::new(),
            "http://cdn.example.com/a.png".to_string(),
        ];
        assert!(matches!(
            validate_images(&images),
            Ok(urls) if urls == ["https://cdn.example.com/b.png", "http://cdn.example.com/a.png"]
        ));
        assert!(validate_images(&["javascript:alert(1)".to_string()]).is_err());
        assert!(validate_images(&["not a url".to_string()]).is_err());
    }
}
