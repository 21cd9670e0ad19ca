//! Bearer token authentication middleware.

use axum::{
    extract::{FromRequestParts, Request},
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;
use serde_json::json;

use crate::error::AppError;

/// Identity of the caller, inserted into request extensions by [`layer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Authenticates requests using Bearer tokens from the Authorization header.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// There is no token store: any non-empty token is accepted and used verbatim
/// as the owning-user identifier for the request. Handlers read it through the
/// [`CurrentUser`] extension.
///
/// # Errors
///
/// Returns `401 Unauthorized` with `WWW-Authenticate: Bearer` if the header is
/// missing, not a Bearer credential, or carries an empty token.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, routing::get, middleware};
/// use crate::api::middleware::auth;
///
/// let protected = Router::new()
///     .route("/links", get(list_links_handler))
///     .route_layer(middleware::from_fn(auth::layer));
/// ```
pub async fn layer(req: Request, next: Next) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let AuthBearer(token) = AuthBearer::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            AppError::unauthorized(
                "Unauthorized",
                json!({"reason": "Authorization header is missing or invalid"}),
            )
        })?;

    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized(
            "Unauthorized",
            json!({"reason": "Bearer token is empty"}),
        ));
    }

    parts.extensions.insert(CurrentUser(token.to_string()));

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}
