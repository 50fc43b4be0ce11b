//! Catalog domain: brands, categories, products and variants.
//!
//! Brands and categories share one shape (a "facet") and differ only by the
//! table and slug namespace they live in. Every read and write goes through
//! the [`CatalogStore`] trait so the storage handle can be constructed once at
//! bootstrap and injected into handlers.
//!
//! Slugs are unique per namespace. The store is the authoritative guard: a
//! unique-slug violation surfaces as [`StoreError::SlugTaken`] and the
//! allocator in [`slug`] decides whether to retry.

#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;
pub mod slug;
#[cfg(test)]
pub(crate) mod test_postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use utoipa::ToSchema;
use uuid::Uuid;

/// Shared handle to the catalog store.
pub type Catalog = Arc<dyn CatalogStore>;

pub const DEFAULT_CURRENCY: &str = "RUB";

/// Scope within which slugs must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlugNamespace {
    Brands,
    Categories,
    Products,
}

impl SlugNamespace {
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Brands => "brands",
            Self::Categories => "categories",
            Self::Products => "products",
        }
    }
}

impl fmt::Display for SlugNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Brand or category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    Brand,
    Category,
}

impl FacetKind {
    #[must_use]
    pub const fn namespace(self) -> SlugNamespace {
        match self {
            Self::Brand => SlugNamespace::Brands,
            Self::Category => SlugNamespace::Categories,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Category => "category",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Facet {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

/// Compact facet reference embedded in product listings.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct FacetRef {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<&Facet> for FacetRef {
    fn from(facet: &Facet) -> Self {
        Self {
            id: facet.id,
            name: facet.name.clone(),
            slug: facet.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub enum Size {
    #[serde(rename = "XS")]
    Xs,
    #[serde(rename = "S")]
    S,
    #[serde(rename = "M")]
    M,
    #[serde(rename = "L")]
    L,
    #[serde(rename = "XL")]
    Xl,
    #[serde(rename = "XXL")]
    Xxl,
}

impl Size {
    /// Canonical value stored in the `product_variants.size` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xs => "XS",
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
            Self::Xl => "XL",
            Self::Xxl => "XXL",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "XS" => Some(Self::Xs),
            "S" => Some(Self::S),
            "M" => Some(Self::M),
            "L" => Some(Self::L),
            "XL" => Some(Self::Xl),
            "XXL" => Some(Self::Xxl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ProductImage {
    pub url: String,
    pub alt: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub size: Option<Size>,
    pub color: Option<String>,
    pub stock: i32,
}

/// Listing row: product plus its brand, category and cover image.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub price_cents: i64,
    pub currency: String,
    pub brand: FacetRef,
    pub category: FacetRef,
    pub cover_image: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ProductDetail {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub brand: FacetRef,
    pub category: FacetRef,
    pub images: Vec<ProductImage>,
    pub variants: Vec<Variant>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct CatalogCounts {
    pub brands: i64,
    pub categories: i64,
    pub products: i64,
}

/// Optional narrowing of product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub brand_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

/// Validated input for a product insert. The slug is allocated separately.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub brand_id: Uuid,
    pub category_id: Uuid,
    pub images: Vec<String>,
}

/// Facet edit. `slug` is an explicit admin override, already normalized.
#[derive(Debug, Clone, Default)]
pub struct FacetChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
}

/// Product edit. `images` replaces the whole gallery when present.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub brand_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct VariantInput {
    pub sku: String,
    pub size: Option<Size>,
    pub color: Option<String>,
    pub stock: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("slug is already taken")]
    SlugTaken,
    #[error("sku is already taken")]
    SkuTaken,
    #[error("record not found")]
    NotFound,
    #[error("foreign key constraint violated")]
    ForeignKey,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistent catalog storage.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// Uniqueness oracle for slug allocation.
    async fn slug_exists(&self, namespace: SlugNamespace, slug: &str) -> Result<bool, StoreError>;

    async fn counts(&self) -> Result<CatalogCounts, StoreError>;

    async fn list_facets(&self, kind: FacetKind) -> Result<Vec<Facet>, StoreError>;
    async fn facet_by_slug(&self, kind: FacetKind, slug: &str) -> Result<Option<Facet>, StoreError>;
    async fn insert_facet(&self, kind: FacetKind, name: &str, slug: &str)
    -> Result<Facet, StoreError>;
    async fn update_facet(
        &self,
        kind: FacetKind,
        id: Uuid,
        changes: &FacetChanges,
    ) -> Result<Facet, StoreError>;
    async fn delete_facet(&self, kind: FacetKind, id: Uuid) -> Result<(), StoreError>;

    /// Newest first, at most `limit` rows.
    async fn list_products(
        &self,
        filter: ProductFilter,
        limit: i64,
    ) -> Result<Vec<ProductSummary>, StoreError>;
    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductDetail>, StoreError>;
    async fn product_by_id(&self, id: Uuid) -> Result<Option<ProductDetail>, StoreError>;
    /// Inserts the product and its images atomically.
    async fn insert_product(
        &self,
        product: &NewProduct,
        slug: &str,
    ) -> Result<ProductDetail, StoreError>;
    /// Applies the edit and any image replacement atomically.
    async fn update_product(
        &self,
        id: Uuid,
        changes: &ProductChanges,
    ) -> Result<ProductDetail, StoreError>;
    async fn delete_product(&self, id: Uuid) -> Result<(), StoreError>;

    async fn insert_variant(
        &self,
        product_id: Uuid,
        variant: &VariantInput,
    ) -> Result<Variant, StoreError>;
    async fn update_variant(&self, id: Uuid, variant: &VariantInput)
    -> Result<Variant, StoreError>;
    async fn delete_variant(&self, id: Uuid) -> Result<(), StoreError>;
}
