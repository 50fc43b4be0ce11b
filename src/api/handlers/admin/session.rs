//! Login, logout and the admin dashboard.

use axum::{
    Form, Json,
    extract::{Extension, Query, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    AdminError, HOME_PATH, LOGIN_FAILED_PATH, LOGIN_PATH,
    gate::{AdminGate, GateError, clear_session_cookie, session_cookie},
    is_admin, require_admin,
    types::{LoginForm, LoginQuery, LoginStatus},
};
use crate::catalog::{Catalog, CatalogCounts};

#[utoipa::path(
    get,
    path = "/admin/login",
    params(("error" = Option<String>, Query, description = "Set after a failed attempt")),
    responses(
        (status = 200, description = "Not signed in.", body = LoginStatus),
        (status = 303, description = "Already signed in, redirect to the dashboard."),
    ),
    tag = "admin"
)]
pub async fn login_page(
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    if is_admin(&headers, &gate) {
        return Redirect::to(HOME_PATH).into_response();
    }
    Json(LoginStatus {
        authenticated: false,
        error: query.error.is_some(),
    })
    .into_response()
}

#[utoipa::path(
    post,
    path = "/admin/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the dashboard on success, back to login with `?error=1` on failure."),
        (status = 500, description = "Admin credentials are not configured."),
    ),
    tag = "admin"
)]
/// Checks the submitted password and sets the `admin` cookie on success.
/// Misconfiguration is logged and answered with `500`, never as a bad password.
/// A body that is not a login form counts as a failed attempt.
pub async fn login(
    gate: Extension<Arc<AdminGate>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> impl IntoResponse {
    let outcome = match form {
        Ok(Form(form)) => gate.login(&form.password),
        Err(rejection) => {
            debug!("login form rejected: {rejection}");
            // Configuration errors still take precedence.
            gate.login("").and(Err(GateError::AuthFailure))
        }
    };
    match outcome {
        Ok(artifact) => match session_cookie(&artifact) {
            Ok(cookie) => {
                info!("admin signed in");
                let mut response = Redirect::to(HOME_PATH).into_response();
                response.headers_mut().insert(SET_COOKIE, cookie);
                response
            }
            Err(err) => {
                error!("Failed to build admin cookie: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Err(GateError::AuthFailure) => {
            warn!("admin login rejected");
            Redirect::to(LOGIN_FAILED_PATH).into_response()
        }
        Err(GateError::Configuration(variable)) => {
            error!(variable, "admin login is not configured");
            (StatusCode::INTERNAL_SERVER_ERROR, "Admin login is unavailable.").into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/admin/logout",
    responses((status = 303, description = "Cookie cleared, redirect to login.")),
    tag = "admin"
)]
/// Clears the `admin` cookie unconditionally.
pub async fn logout() -> impl IntoResponse {
    let mut response = Redirect::to(LOGIN_PATH).into_response();
    response
        .headers_mut()
        .insert(SET_COOKIE, clear_session_cookie());
    response
}

#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Catalog totals.", body = CatalogCounts),
        (status = 303, description = "Not signed in, redirect to login."),
    ),
    tag = "admin"
)]
pub async fn dashboard(
    headers: HeaderMap,
    gate: Extension<Arc<AdminGate>>,
    catalog: Extension<Catalog>,
) -> impl IntoResponse {
    if let Err(redirect) = require_admin(&headers, &gate) {
        return redirect;
    }

    match catalog.counts().await {
        Ok(counts) => Json(counts).into_response(),
        Err(err) => AdminError::from(err).into_response(),
    }
}
