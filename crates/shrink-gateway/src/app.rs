use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{decode_handler, encode_handler, health_handler};
use crate::state::AppState;
use crate::throttle::throttle;

pub struct App {}

impl App {
    /// `/encode` and `/decode` sit behind admission control; `/health` does
    /// not.
    ///
    /// Serve with `into_make_service_with_connect_info::<SocketAddr>()` so
    /// the throttle can see the peer address.
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/encode", post(encode_handler))
            .route("/decode", get(decode_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), throttle))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
