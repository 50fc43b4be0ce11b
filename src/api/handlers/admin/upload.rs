//! Image upload to the object-storage bucket.

use axum::{
    Json,
    extract::{Extension, Multipart, multipart::MultipartRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::{AdminError, AdminGate, is_admin, types::UploadResponse};
use crate::bucket::{DEFAULT_CONTENT_TYPE, ImageBucket, object_name};

pub const FILE_FIELD: &str = "file";

#[utoipa::path(
    post,
    path = "/admin/upload",
    request_body(content = String, description = "Multipart form with a `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Uploaded; returns the public URL.", body = UploadResponse),
        (status = 400, description = "Not multipart or no file provided.", body = String),
        (status = 401, description = "Not signed in."),
        (status = 500, description = "Object storage is not configured."),
        (status = 502, description = "Object storage rejected the upload."),
    ),
    tag = "admin"
)]
/// Stores the `file` field under a fresh object name and returns its public URL.
/// Existing objects are never overwritten.
pub async fn upload_image(
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    bucket: Extension<Arc<dyn ImageBucket>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    if !is_admin(&headers, &gate) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("upload rejected: {rejection}");
            return (StatusCode::BAD_REQUEST, "Expected multipart/form-data.").into_response();
        }
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return (err.status(), err.body_text()).into_response(),
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(err) => return (err.status(), err.body_text()).into_response(),
        };
        if data.is_empty() {
            break;
        }

        let name = object_name(&file_name);
        let size = data.len();
        return match bucket.upload(&name, &content_type, data).await {
            Ok(url) => {
                info!(object = %name, size, "uploaded image");
                Json(UploadResponse { url }).into_response()
            }
            Err(err) => AdminError::from(err).into_response(),
        };
    }

    (StatusCode::BAD_REQUEST, "No file provided.").into_response()
}
