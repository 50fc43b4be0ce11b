//! Product variant management.

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
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    AdminError, AdminGate, accepted, non_empty, require_admin, types::VariantRequest,
};
use crate::catalog::{Catalog, Size, StoreError, Variant, VariantInput};

/// SKU is trimmed and required, stock must not be negative. An unknown size
/// is dropped rather than rejected.
fn variant_input(payload: &VariantRequest) -> Result<VariantInput, AdminError> {
    let Some(sku) = non_empty(Some(&payload.sku)) else {
        return Err(AdminError::BadRequest("SKU is required."));
    };
    if payload.stock < 0 {
        return Err(AdminError::BadRequest("Stock must not be negative."));
    }
    let size = non_empty(payload.size.as_deref()).and_then(|value| {
        let parsed = Size::parse(&value.to_ascii_uppercase());
        if parsed.is_none() {
            debug!(size = %value, "ignoring unknown variant size");
        }
        parsed
    });
    Ok(VariantInput {
        sku,
        size,
        color: non_empty(payload.color.as_deref()),
        stock: payload.stock,
    })
}

#[utoipa::path(
    post,
    path = "/admin/products/{id}/variants",
    request_body = VariantRequest,
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 201, description = "Variant created.", body = Variant),
        (status = 400, description = "Invalid input.", body = String),
        (status = 404, description = "Product not found."),
        (status = 409, description = "SKU is already taken.", body = String),
    ),
    tag = "admin"
)]
pub async fn create_variant(
    product_id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
    payload: Result<Json<VariantRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let (Path(product_id), Json(payload)) = match (accepted(product_id), accepted(payload)) {
        (Ok(product_id), Ok(payload)) => (product_id, payload),
        (Err(rejection), _) | (_, Err(rejection)) => return rejection,
    };

    let input = match variant_input(&payload) {
        Ok(input) => input,
        Err(err) => return err.into_response(),
    };

    match catalog.insert_variant(product_id, &input).await {
        Ok(variant) => {
            info!(%product_id, sku = %variant.sku, "created variant");
            (StatusCode::CREATED, Json(variant)).into_response()
        }
        Err(StoreError::ForeignKey) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => AdminError::from(err).into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/admin/variants/{id}",
    request_body = VariantRequest,
    params(("id" = Uuid, Path, description = "Variant id")),
    responses(
        (status = 200, description = "Variant updated.", body = Variant),
        (status = 400, description = "Invalid input.", body = String),
        (status = 404, description = "Variant not found."),
        (status = 409, description = "SKU is already taken.", body = String),
    ),
    tag = "admin"
)]
pub async fn update_variant(
    id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
    payload: Result<Json<VariantRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let (Path(id), Json(payload)) = match (accepted(id), accepted(payload)) {
        (Ok(id), Ok(payload)) => (id, payload),
        (Err(rejection), _) | (_, Err(rejection)) => return rejection,
    };

    let input = match variant_input(&payload) {
        Ok(input) => input,
        Err(err) => return err.into_response(),
    };

    match catalog.update_variant(id, &input).await {
        Ok(variant) => Json(variant).into_response(),
        Err(err) => AdminError::from(err).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/variants/{id}",
    params(("id" = Uuid, Path, description = "Variant id")),
    responses(
        (status = 204, description = "Variant deleted."),
        (status = 404, description = "Variant not found."),
    ),
    tag = "admin"
)]
pub async fn delete_variant(
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

    match catalog.delete_variant(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => AdminError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sku: &str, size: Option<&str>, stock: i32) -> VariantRequest {
        VariantRequest {
            sku: sku.to_string(),
            size: size.map(str::to_string),
            color: Some("  ".to_string()),
            stock,
        }
    }

    #[test]
    fn sku_is_trimmed_and_required() {
        assert!(matches!(
            variant_input(&request("  TEE-BLK-M ", None, 3)),
            Ok(VariantInput { ref sku, stock: 3, .. }) if sku == "TEE-BLK-M"
        ));
        assert!(variant_input(&request("   ", None, 0)).is_err());
    }

    #[test]
    fn negative_stock_is_rejected() {
        assert!(matches!(
            variant_input(&request("TEE", None, -1)),
            Err(AdminError::BadRequest(_))
        ));
    }

    #[test]
    fn unknown_sizes_are_dropped_and_known_ones_kept() {
        assert!(matches!(
            variant_input(&request("TEE", Some("xl"), 1)),
            Ok(VariantInput { size: Some(Size::Xl), color: None, .. })
        ));
        assert!(matches!(
            variant_input(&request("TEE", Some("XXXL"), 1)),
            Ok(VariantInput { size: None, .. })
        ));
    }
}
