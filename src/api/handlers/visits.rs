//! Handler for visit listing.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::api::dto::pagination::PaginationParams;
use crate::api::dto::visit::VisitResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Lists visits recorded against a link, most recent first.
///
/// # Endpoint
///
/// `GET /api/links/{id}/visits?page=1&pageSize=10`
///
/// Visits of a deleted link are still listed.
pub async fn list_visits_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<VisitResponse>>, AppError> {
    let (limit, offset) = params.limit_offset();

    let visits = state
        .visit_service
        .list_visits(&id, limit, offset)
        .await?;

    Ok(Json(visits.into_iter().map(VisitResponse::from).collect()))
}
