use crate::model::HealthResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use shrink_core::CounterBackend;
use tracing::warn;

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage_ok = match state.shortener().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "health check: storage unavailable");
            false
        }
    };

    let backend = state.admission().backend();
    let counters_ok = backend == CounterBackend::Redis || !state.expects_shared_counters();

    Json(HealthResponse {
        status: if storage_ok && counters_ok { "ok" } else { "degraded" },
        counter_backend: backend.to_string(),
        storage: if storage_ok { "ok" } else { "unavailable" },
    })
}
