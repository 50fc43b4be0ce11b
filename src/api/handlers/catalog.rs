//! Public catalog endpoints.
//!
//! No authentication. Unknown filter slugs are ignored rather than rejected,
//! so a stale link still renders the unfiltered page. Path segments that are
//! not shaped like a slug answer `404` without a store lookup.

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::catalog::{
    Catalog, CatalogStore, Facet, FacetKind, ProductDetail, ProductFilter, ProductSummary,
    StoreError, slug::is_valid,
};

/// Storefront listing cap.
pub const PUBLIC_PRODUCT_LIMIT: i64 = 50;
/// Cap for a single brand or category page.
pub const FACET_PRODUCT_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct BrandPageQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryPageQuery {
    pub brand: Option<String>,
}

/// A brand or category with the products filed under it.
#[derive(Debug, Serialize, ToSchema)]
pub struct FacetPage {
    #[serde(flatten)]
    pub facet: Facet,
    /// The other facet the listing was narrowed by, when it resolved.
    pub filter: Option<Facet>,
    pub products: Vec<ProductSummary>,
}

fn internal_error(context: &str, err: &StoreError) -> axum::response::Response {
    error!("Failed to {context}: {err}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

async fn facet_page(
    catalog: &dyn CatalogStore,
    kind: FacetKind,
    slug: &str,
    filter_slug: Option<&str>,
) -> Result<Option<FacetPage>, StoreError> {
    if !is_valid(slug) {
        return Ok(None);
    }
    let Some(facet) = catalog.facet_by_slug(kind, slug).await? else {
        return Ok(None);
    };

    let filter_kind = match kind {
        FacetKind::Brand => FacetKind::Category,
        FacetKind::Category => FacetKind::Brand,
    };
    let filter = match filter_slug.map(str::trim).filter(|value| is_valid(value)) {
        Some(value) => catalog.facet_by_slug(filter_kind, value).await?,
        None => None,
    };

    let filter_id = filter.as_ref().map(|other| other.id);
    let product_filter = match kind {
        FacetKind::Brand => ProductFilter {
            brand_id: Some(facet.id),
            category_id: filter_id,
        },
        FacetKind::Category => ProductFilter {
            brand_id: filter_id,
            category_id: Some(facet.id),
        },
    };

    let products = catalog
        .list_products(product_filter, FACET_PRODUCT_LIMIT)
        .await?;
    Ok(Some(FacetPage {
        facet,
        filter,
        products,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/brands",
    responses((status = 200, description = "All brands ordered by name.", body = [Facet])),
    tag = "catalog"
)]
pub async fn list_brands(catalog: Extension<Catalog>) -> impl IntoResponse {
    match catalog.list_facets(FacetKind::Brand).await {
        Ok(brands) => Json(brands).into_response(),
        Err(err) => internal_error("list brands", &err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/brands/{slug}",
    params(
        ("slug" = String, Path, description = "Brand slug"),
        ("category" = Option<String>, Query, description = "Narrow to a category slug"),
    ),
    responses(
        (status = 200, description = "Brand and its products, newest first.", body = FacetPage),
        (status = 404, description = "Brand not found."),
    ),
    tag = "catalog"
)]
pub async fn brand_page(
    Path(slug): Path<String>,
    Query(query): Query<BrandPageQuery>,
    catalog: Extension<Catalog>,
) -> impl IntoResponse {
    match facet_page(
        catalog.as_ref(),
        FacetKind::Brand,
        &slug,
        query.category.as_deref(),
    )
    .await
    {
        Ok(Some(page)) => Json(page).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => internal_error("load brand page", &err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/categories",
    responses((status = 200, description = "All categories ordered by name.", body = [Facet])),
    tag = "catalog"
)]
pub async fn list_categories(catalog: Extension<Catalog>) -> impl IntoResponse {
    match catalog.list_facets(FacetKind::Category).await {
        Ok(categories) => Json(categories).into_response(),
        Err(err) => internal_error("list categories", &err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/categories/{slug}",
    params(
        ("slug" = String, Path, description = "Category slug"),
        ("brand" = Option<String>, Query, description = "Narrow to a brand slug"),
    ),
    responses(
        (status = 200, description = "Category and its products, newest first.", body = FacetPage),
        (status = 404, description = "Category not found."),
    ),
    tag = "catalog"
)]
pub async fn category_page(
    Path(slug): Path<String>,
    Query(query): Query<CategoryPageQuery>,
    catalog: Extension<Catalog>,
) -> impl IntoResponse {
    match facet_page(
        catalog.as_ref(),
        FacetKind::Category,
        &slug,
        query.brand.as_deref(),
    )
    .await
    {
        Ok(Some(page)) => Json(page).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => internal_error("load category page", &err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/products",
    responses((status = 200, description = "Newest 50 products.", body = [ProductSummary])),
    tag = "catalog"
)]
pub async fn list_products(catalog: Extension<Catalog>) -> impl IntoResponse {
    match catalog
        .list_products(ProductFilter::default(), PUBLIC_PRODUCT_LIMIT)
        .await
    {
        Ok(products) => Json(products).into_response(),
        Err(err) => internal_error("list products", &err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product with ordered images and variants.", body = ProductDetail),
        (status = 404, description = "Product not found."),
    ),
    tag = "catalog"
)]
pub async fn product_page(
    Path(slug): Path<String>,
    catalog: Extension<Catalog>,
) -> impl IntoResponse {
    if !is_valid(&slug) {
        return StatusCode::NOT_FOUND.into_response();
    }
    match catalog.product_by_slug(&slug).await {
        Ok(Some(product)) => Json(product).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => internal_error("load product", &err),
    }
}
