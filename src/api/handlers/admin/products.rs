//! Product management.
//!
//! A product row and its gallery are written in one store call so a failed
//! write never leaves a half-created product behind.

use axum::{
    Json,
    extract::{
        Extension, Path,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{
    ADMIN_PRODUCT_LIMIT, AdminError, AdminGate, accepted, non_empty, normalize_currency, require_admin,
    types::{CreateProductRequest, UpdateProductRequest},
    validate_images, validate_price,
};
use crate::catalog::{
    Catalog, CatalogStore, NewProduct, ProductChanges, ProductDetail, ProductFilter,
    ProductSummary, SlugNamespace,
    slug::{NamespaceOracle, SlugAllocator, normalize},
};

async fn create(
    catalog: &dyn CatalogStore,
    payload: &CreateProductRequest,
) -> Result<ProductDetail, AdminError> {
    let Some(title) = non_empty(Some(&payload.title)) else {
        return Err(AdminError::BadRequest("Title is required."));
    };
    let product = NewProduct {
        description: non_empty(payload.description.as_deref()),
        price_cents: validate_price(payload.price_cents)?,
        currency: normalize_currency(payload.currency.as_deref())?,
        brand_id: payload.brand_id,
        category_id: payload.category_id,
        images: validate_images(&payload.images)?,
        title,
    };
    let source = non_empty(payload.slug.as_deref()).unwrap_or_else(|| product.title.clone());

    let oracle = NamespaceOracle::new(catalog, SlugNamespace::Products);
    let new_product = &product;
    let detail = SlugAllocator::default()
        .insert_unique(&source, &oracle, move |slug: String| async move {
            catalog.insert_product(new_product, &slug).await
        })
        .await?;

    info!(slug = %detail.slug, images = detail.images.len(), "created product");
    Ok(detail)
}

fn changes_from(payload: &UpdateProductRequest) -> Result<ProductChanges, AdminError> {
    if payload.title.is_some() && non_empty(payload.title.as_deref()).is_none() {
        return Err(AdminError::BadRequest("Title is required."));
    }
    let slug = match payload.slug_override.as_deref() {
        Some(value) => Some(normalize(value).ok_or(AdminError::BadRequest("Invalid slug."))?),
        None => None,
    };
    let currency = match payload.currency.as_deref() {
        Some(value) => Some(normalize_currency(Some(value))?),
        None => None,
    };
    let price_cents = payload.price_cents.map(validate_price).transpose()?;
    let images = payload
        .images
        .as_deref()
        .map(validate_images)
        .transpose()?;

    Ok(ProductChanges {
        title: non_empty(payload.title.as_deref()),
        slug,
        description: payload
            .description
            .as_ref()
            .map(|description| non_empty(description.as_deref())),
        price_cents,
        currency,
        brand_id: payload.brand_id,
        category_id: payload.category_id,
        images,
    })
}

#[utoipa::path(
    get,
    path = "/admin/products",
    responses(
        (status = 200, description = "Newest products first, at most 100.", body = [ProductSummary]),
        (status = 303, description = "Not signed in, redirect to login."),
    ),
    tag = "admin"
)]
pub async fn list_products(
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }

    match catalog
        .list_products(ProductFilter::default(), ADMIN_PRODUCT_LIMIT)
        .await
    {
        Ok(products) => Json(products).into_response(),
        Err(err) => AdminError::from(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created with a unique slug.", body = ProductDetail),
        (status = 400, description = "Invalid input or unknown brand/category.", body = String),
        (status = 303, description = "Not signed in, redirect to login."),
    ),
    tag = "admin"
)]
/// Creates a product with its gallery. The slug comes from `slug` or the title
/// and is suffixed until unique, retrying when a concurrent insert claims it.
pub async fn create_product(
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let Json(payload) = match accepted(payload) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };

    match create(catalog.as_ref(), &payload).await {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with images and variants.", body = ProductDetail),
        (status = 404, description = "Product not found."),
    ),
    tag = "admin"
)]
pub async fn get_product(
    id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let Path(id) = match accepted(id) {
        Ok(id) => id,
        Err(rejection) => return rejection,
    };

    match catalog.product_by_id(id).await {
        Ok(Some(detail)) => Json(detail).into_response(),
        Ok(None) => AdminError::NotFound.into_response(),
        Err(err) => AdminError::from(err).into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/admin/products/{id}",
    request_body = UpdateProductRequest,
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product updated.", body = ProductDetail),
        (status = 400, description = "Invalid input or unknown brand/category.", body = String),
        (status = 404, description = "Product not found."),
        (status = 409, description = "Slug override is already taken.", body = String),
    ),
    tag = "admin"
)]
/// Applies a partial edit. `slug_override` replaces the slug as given (after
/// normalization) and conflicts with `409` instead of being suffixed.
pub async fn update_product(
    id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let (Path(id), Json(payload)) = match (accepted(id), accepted(payload)) {
        (Ok(id), Ok(payload)) => (id, payload),
        (Err(rejection), _) | (_, Err(rejection)) => return rejection,
    };

    let changes = match changes_from(&payload) {
        Ok(changes) => changes,
        Err(err) => return err.into_response(),
    };

    match catalog.update_product(id, &changes).await {
        Ok(detail) => {
            info!(%id, slug = %detail.slug, "updated product");
            Json(detail).into_response()
        }
        Err(err) => AdminError::from(err).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product, images and variants deleted."),
        (status = 404, description = "Product not found."),
    ),
    tag = "admin"
)]
pub async fn delete_product(
    id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let Path(id) = match accepted(id) {
        Ok(id) => id,
        Err(rejection) => return rejection,
    };

    match catalog.delete_product(id).await {
        Ok(()) => {
            info!(%id, "deleted product");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => AdminError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_normalize_override_and_currency() {
        let payload = UpdateProductRequest {
            slug_override: Some("Summer Drop 2024".to_string()),
            currency: Some("eur".to_string()),
            ..UpdateProductRequest::default()
        };
        let changes = changes_from(&payload);
        assert!(matches!(
            changes,
            Ok(ProductChanges { slug: Some(ref slug), currency: Some(ref currency), .. })
                if slug == "summer-drop-2024" && currency == "EUR"
        ));
    }

    #[test]
    fn changes_reject_unusable_override() {
        let payload = UpdateProductRequest {
            slug_override: Some("!!!".to_string()),
            ..UpdateProductRequest::default()
        };
        assert!(matches!(
            changes_from(&payload),
            Err(AdminError::BadRequest("Invalid slug."))
        ));
    }

    #[test]
    fn changes_reject_blank_title_and_bad_price() {
        let payload = UpdateProductRequest {
            title: Some("   ".to_string()),
            ..UpdateProductRequest::default()
        };
        assert!(changes_from(&payload).is_err());

        let payload = UpdateProductRequest {
            price_cents: Some(0),
            ..UpdateProductRequest::default()
        };
        assert!(changes_from(&payload).is_err());
    }

    #[test]
    fn blank_description_clears_it() {
        let payload = UpdateProductRequest {
            description: Some(Some("  ".to_string())),
            ..UpdateProductRequest::default()
        };
        assert!(matches!(
            changes_from(&payload),
            Ok(ProductChanges {
                description: Some(None),
                ..
            })
        ));
    }
}
