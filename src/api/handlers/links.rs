//! Handlers for link management endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::link::{CreateLinkRequest, LinkResponse, UpdateLinkRequest};
use crate::api::dto::pagination::PaginationParams;
use crate::api::middleware::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

/// Lists the caller's links, newest first.
///
/// # Endpoint
///
/// `GET /api/links?page=1&pageSize=10`
pub async fn list_links_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<LinkResponse>>, AppError> {
    let (limit, offset) = params.limit_offset();

    let links = state
        .link_service
        .list_links(user.id(), limit, offset)
        .await?;

    Ok(Json(links.into_iter().map(LinkResponse::from).collect()))
}

/// Creates a link owned by the caller.
///
/// # Endpoint
///
/// `POST /api/links`
///
/// # Request Body
///
/// ```json
/// {
///   "title": "My site",
///   "url": "https://example.com",
///   "expiresAt": "2030-01-01T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if the title is empty or the URL is not absolute
/// `http`/`https`.
pub async fn create_link_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    payload.validate()?;

    let link = state
        .link_service
        .create_link(user.id(), payload.title, payload.url, payload.expires_at)
        .await?;

    Ok((StatusCode::CREATED, Json(link.into())))
}

/// Returns a single link.
///
/// # Endpoint
///
/// `GET /api/links/{id}`
pub async fn get_link_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state.link_service.get_link(&id).await?;
    Ok(Json(link.into()))
}

/// Partially updates a link.
///
/// # Endpoint
///
/// `PUT /api/links/{id}`
///
/// Only provided, non-empty fields are changed. Returns 204 No Content.
pub async fn update_link_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<StatusCode, AppError> {
    state.link_service.update_link(&id, payload.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deletes a link. Its recorded visits are kept.
///
/// # Endpoint
///
/// `DELETE /api/links/{id}`
///
/// # Errors
///
/// Returns 404 Not Found if the link doesn't exist or is already deleted.
pub async fn delete_link_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete_link(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
