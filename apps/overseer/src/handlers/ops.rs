// [apps/overseer/src/handlers/ops.rs]
/*!
 * =================================================================
 * APARATO: OPERATIONS RADAR HANDLER (V6.0 - PANOPTICON FEED)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: MÉTRICAS, SALUD DEL POOL Y DIAGNÓSTICOS
 * =================================================================
 */

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::instrument;

use crate::state::AppState;

/// Endpoint: GET /ops/metrics (llave administrativa)
/// Exposición Prometheus en texto plano.
#[instrument(skip(state))]
pub async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.render_prometheus_text(),
    )
}

/// Endpoint: GET /ops/pool_health (llave administrativa)
#[instrument(skip(state))]
pub async fn handle_pool_health(State(state): State<AppState>) -> impl IntoResponse {
    let health_report = state.database_client.pool_health();
    state
        .metrics
        .set_gauge("db_pool_utilization_pct", &[], health_report.utilization_pct);
    (StatusCode::OK, Json(json!(health_report)))
}

/// Endpoint: GET /ops/diagnostics (llave administrativa)
/// Radiografía de colas y caches en RAM.
#[instrument(skip(state))]
pub async fn handle_diagnostics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "event_queue": state.event_queue.statistics(),
            "purge_queue_depth": state.purge_queue.depth(),
            "response_cache_depth": state.response_cache.depth(),
            "artifact_cache": state.artifact_cache.statistics(),
        })),
    )
}
// FIN DEL ARCHIVO [apps/overseer/src/handlers/ops.rs]
