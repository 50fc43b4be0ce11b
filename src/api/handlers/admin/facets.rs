//! Brand and category management.
//!
//! Both facets share the same flow and differ only by [`FacetKind`]; the
//! per-kind handlers exist so each route is documented on its own path.

use axum::{
    Json,
    extract::{
        Extension, Path,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{
    AdminError, AdminGate, accepted, non_empty, require_admin,
    types::{CreateFacetRequest, UpdateFacetRequest},
};
use crate::catalog::{
    Catalog, CatalogStore, Facet, FacetChanges, FacetKind, StoreError,
    slug::{NamespaceOracle, SlugAllocator, normalize},
};

async fn list(kind: FacetKind, catalog: &dyn CatalogStore) -> Result<Vec<Facet>, AdminError> {
    Ok(catalog.list_facets(kind).await?)
}

async fn create(
    kind: FacetKind,
    catalog: &dyn CatalogStore,
    payload: &CreateFacetRequest,
) -> Result<Facet, AdminError> {
    let Some(name) = non_empty(Some(&payload.name)) else {
        return Err(AdminError::BadRequest("Name is required."));
    };
    let source = non_empty(payload.slug.as_deref()).unwrap_or_else(|| name.clone());

    let oracle = NamespaceOracle::new(catalog, kind.namespace());
    let name = name.as_str();
    let facet = SlugAllocator::default()
        .insert_unique(&source, &oracle, move |slug: String| async move {
            catalog.insert_facet(kind, name, &slug).await
        })
        .await?;

    info!(kind = kind.label(), slug = %facet.slug, "created facet");
    Ok(facet)
}

async fn update(
    kind: FacetKind,
    catalog: &dyn CatalogStore,
    id: Uuid,
    payload: &UpdateFacetRequest,
) -> Result<Facet, AdminError> {
    if payload.name.is_some() && non_empty(payload.name.as_deref()).is_none() {
        return Err(AdminError::BadRequest("Name is required."));
    }
    let slug = match payload.slug_override.as_deref() {
        Some(value) => Some(normalize(value).ok_or(AdminError::BadRequest("Invalid slug."))?),
        None => None,
    };
    let changes = FacetChanges {
        name: non_empty(payload.name.as_deref()),
        slug,
    };
    if changes.name.is_none() && changes.slug.is_none() {
        return Err(AdminError::BadRequest("No updates provided."));
    }

    Ok(catalog.update_facet(kind, id, &changes).await?)
}

async fn delete(kind: FacetKind, catalog: &dyn CatalogStore, id: Uuid) -> Result<(), AdminError> {
    match catalog.delete_facet(kind, id).await {
        Ok(()) => {
            info!(kind = kind.label(), %id, "deleted facet");
            Ok(())
        }
        Err(StoreError::ForeignKey) => Err(AdminError::Conflict("Facet still has products.")),
        Err(err) => Err(err.into()),
    }
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, AdminError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn respond_empty(result: Result<(), AdminError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/admin/brands",
    responses(
        (status = 200, description = "All brands ordered by name.", body = [Facet]),
        (status = 303, description = "Not signed in, redirect to login."),
    ),
    tag = "admin"
)]
pub async fn list_brands(
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    respond(StatusCode::OK, list(FacetKind::Brand, catalog.as_ref()).await)
}

#[utoipa::path(
    post,
    path = "/admin/brands",
    request_body = CreateFacetRequest,
    responses(
        (status = 201, description = "Brand created with a unique slug.", body = Facet),
        (status = 400, description = "Invalid input.", body = String),
        (status = 303, description = "Not signed in, redirect to login."),
    ),
    tag = "admin"
)]
/// Creates a brand. The slug is derived from `slug` or the name and suffixed until unique.
pub async fn create_brand(
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
    payload: Result<Json<CreateFacetRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let Json(payload) = match accepted(payload) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };
    respond(
        StatusCode::CREATED,
        create(FacetKind::Brand, catalog.as_ref(), &payload).await,
    )
}

#[utoipa::path(
    patch,
    path = "/admin/brands/{id}",
    request_body = UpdateFacetRequest,
    params(("id" = Uuid, Path, description = "Brand id")),
    responses(
        (status = 200, description = "Brand updated.", body = Facet),
        (status = 400, description = "Invalid input.", body = String),
        (status = 404, description = "Brand not found."),
        (status = 409, description = "Slug override is already taken.", body = String),
    ),
    tag = "admin"
)]
pub async fn update_brand(
    id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
    payload: Result<Json<UpdateFacetRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let (Path(id), Json(payload)) = match (accepted(id), accepted(payload)) {
        (Ok(id), Ok(payload)) => (id, payload),
        (Err(rejection), _) | (_, Err(rejection)) => return rejection,
    };
    respond(
        StatusCode::OK,
        update(FacetKind::Brand, catalog.as_ref(), id, &payload).await,
    )
}

#[utoipa::path(
    delete,
    path = "/admin/brands/{id}",
    params(("id" = Uuid, Path, description = "Brand id")),
    responses(
        (status = 204, description = "Brand deleted."),
        (status = 404, description = "Brand not found."),
        (status = 409, description = "Brand still has products.", body = String),
    ),
    tag = "admin"
)]
pub async fn delete_brand(
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
    respond_empty(delete(FacetKind::Brand, catalog.as_ref(), id).await)
}

#[utoipa::path(
    get,
    path = "/admin/categories",
    responses(
        (status = 200, description = "All categories ordered by name.", body = [Facet]),
        (status = 303, description = "Not signed in, redirect to login."),
    ),
    tag = "admin"
)]
pub async fn list_categories(
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    respond(
        StatusCode::OK,
        list(FacetKind::Category, catalog.as_ref()).await,
    )
}

#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateFacetRequest,
    responses(
        (status = 201, description = "Category created with a unique slug.", body = Facet),
        (status = 400, description = "Invalid input.", body = String),
        (status = 303, description = "Not signed in, redirect to login."),
    ),
    tag = "admin"
)]
pub async fn create_category(
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
    payload: Result<Json<CreateFacetRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let Json(payload) = match accepted(payload) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };
    respond(
        StatusCode::CREATED,
        create(FacetKind::Category, catalog.as_ref(), &payload).await,
    )
}

#[utoipa::path(
    patch,
    path = "/admin/categories/{id}",
    request_body = UpdateFacetRequest,
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category updated.", body = Facet),
        (status = 400, description = "Invalid input.", body = String),
        (status = 404, description = "Category not found."),
        (status = 409, description = "Slug override is already taken.", body = String),
    ),
    tag = "admin"
)]
pub async fn update_category(
    id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
    payload: Result<Json<UpdateFacetRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }
    let (Path(id), Json(payload)) = match (accepted(id), accepted(payload)) {
        (Ok(id), Ok(payload)) => (id, payload),
        (Err(rejection), _) | (_, Err(rejection)) => return rejection,
    };
    respond(
        StatusCode::OK,
        update(FacetKind::Category, catalog.as_ref(), id, &payload).await,
    )
}

#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted."),
        (status = 404, description = "Category not found."),
        (status = 409, description = "Category still has products.", body = String),
    ),
    tag = "admin"
)]
pub async fn delete_category(
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
    respond_empty(delete(FacetKind::Category, catalog.as_ref(), id).await)
}
