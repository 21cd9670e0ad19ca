//! Handler for the public visit redirect.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{Extensions, HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{debug, error};

use crate::domain::entities::ClientInfo;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::{client_ip, header_string};

/// Records a visit and redirects to the link's destination.
///
/// # Endpoint
///
/// `GET /visit/{id}`
///
/// # Request Flow
///
/// 1. Collect user agent, referrer and client IP from the request
/// 2. Hand off to [`crate::application::services::VisitService::record_visit`],
///    which checks expiry, logs the visit and bumps the click counter
/// 3. Return 302 Found with `Location` set to the destination URL
///
/// The wait for the visit-log write ends at server shutdown or after
/// [`AppState::visit_wait`], whichever comes first. Either way the visitor
/// still gets the redirect and the write carries on in the background.
///
/// # Errors
///
/// Returns 404 Not Found for malformed ids, unknown links and expired links,
/// all with the same body.
/// Returns 500 Internal Server Error if the click counter cannot be updated.
pub async fn redirect_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Result<Response, AppError> {
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let client = ClientInfo::new(
        header_string(&headers, header::USER_AGENT),
        client_ip(&headers, peer, state.behind_proxy),
        header_string(&headers, header::REFERER),
    );

    let cancel = state.shutdown.child_token();
    let wait_deadline = async {
        tokio::time::sleep(state.visit_wait).await;
        cancel.cancel();
        std::future::pending::<Infallible>().await
    };

    let recorded = tokio::select! {
        recorded = state.visit_service.record_visit(&id, client, &cancel) => recorded,
        never = wait_deadline => match never {},
    };

    match recorded {
        Ok(link) => {
            metrics::counter!("linkbio_redirects_total", "outcome" => "found").increment(1);
            debug!(link_id = link.id, clicks = link.clicks, "Redirecting visit");
            Ok((StatusCode::FOUND, [(header::LOCATION, link.url)]).into_response())
        }
        Err(e) if e.is_not_found_like() => {
            metrics::counter!("linkbio_redirects_total", "outcome" => "not_found").increment(1);
            debug!(id = %id, error = %e, "Redirect rejected");
            Err(e)
        }
        Err(e) => {
            metrics::counter!("linkbio_redirects_total", "outcome" => "error").increment(1);
            error!(id = %id, error = %e, "Redirect failed");
            Err(e)
        }
    }
}
