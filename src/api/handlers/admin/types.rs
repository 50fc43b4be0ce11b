//! Request/response payloads for the admin API.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginStatus {
    pub authenticated: bool,
    pub error: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFacetRequest {
    pub name: String,
    /// Optional slug source; the name is used when absent.
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFacetRequest {
    pub name: Option<String>,
    /// Replaces the slug verbatim after normalization. Never suffixed.
    pub slug_override: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: Option<String>,
    pub brand_id: Uuid,
    pub category_id: Uuid,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub slug_override: Option<String>,
    /// `null` clears the description; an absent field leaves it unchanged.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub brand_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    /// Replaces the whole gallery when present.
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VariantRequest {
    pub sku: String,
    /// One of XS, S, M, L, XL, XXL; anything else stores no size.
    pub size: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub stock: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
