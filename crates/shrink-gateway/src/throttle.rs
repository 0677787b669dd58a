use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use shrink_limiter::Decision;
use std::net::SocketAddr;
use tracing::warn;

/// Admission control in front of the throttled routes.
///
/// The route name is the request path without its leading slash, and the
/// client is the peer IP address.
pub async fn throttle(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let route = request.uri().path().trim_start_matches('/').to_string();
    let client = peer.ip().to_string();

    match state.admission().check(&route, &client).await {
        Ok(Decision::Allow { .. }) => next.run(request).await,
        Ok(Decision::Deny {
            retry_after_secs, ..
        }) => AppError::RateLimited { retry_after_secs }.into_response(),
        Err(e) => {
            warn!(
                route = %route,
                client = %client,
                error = %e,
                "admission check failed, letting request through"
            );
            next.run(request).await
        }
    }
}
