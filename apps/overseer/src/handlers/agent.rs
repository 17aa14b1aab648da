// INICIO DEL ARCHIVO [apps/overseer/src/handlers/agent.rs]
/*!
 * =================================================================
 * APARATO: AGENT UPLINK HANDLER (V13.0 - PULSE & RESULT INGEST)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: INGESTA DE LATIDOS Y RESULTADOS DE ACCIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL WRITE ATÓMICO POR DISPOSITIVO: Append deduplicado al log
 *    particionado + upsert monótono de la proyección caliente.
 * 2. WRITE-BEHIND EVENTS: El rastro de eventos se encola en RAM; el
 *    camino de la petición jamás espera por el audit trail.
 * 3. FIRST WRITE WINS: Un resultado duplicado o tardío responde 200
 *    sin alterar nada observable.
 * =================================================================
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use warden_domain_models::command::{CommandAction, CommandOutcome, CommandResult};
use warden_domain_models::device::DeviceEvent;
use warden_domain_models::heartbeat::{HeartbeatPayload, HeartbeatSample};

use crate::middleware::AuthenticatedDevice;
use crate::state::AppState;

/// Payload del endpoint de resultados de acción.
#[derive(Debug, Deserialize)]
pub struct ActionResultRequest {
    pub request_id: String,
    pub device_id: String,
    pub action: String,
    pub outcome: String,
    #[serde(default)]
    pub message: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/**
 * Endpoint: POST /v1/heartbeat (autenticación de dispositivo)
 *
 * # Logic:
 * 1. Append al log con deduplicación por cubo de 10s (conflicto tragado).
 * 2. Upsert estrictamente monótono de 'device_last_status'.
 * 3. Refresco de identidad del dispositivo y correlación de ping.
 * 4. Encolado write-behind del evento de auditoría.
 *
 * # Errors:
 * - 400: marca temporal ilegible.
 * - 401: token inválido (lo corta el guardia perimetral).
 */
#[instrument(skip(state, certified_device, payload), fields(device = %certified_device.0.id))]
pub async fn handle_heartbeat(
    State(state): State<AppState>,
    Extension(certified_device): Extension<AuthenticatedDevice>,
    Json(payload): Json<HeartbeatPayload>,
) -> impl IntoResponse {
    let device = &certified_device.0;

    // La marca temporal del agente es autoritativa para el log.
    let Ok(observed_at) = payload.timestamp_utc.parse::<DateTime<Utc>>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "MALFORMED_TIMESTAMP", "field": "timestamp_utc"})),
        )
            .into_response();
    };

    let sample = HeartbeatSample::from_payload(&device.id, &payload, observed_at);

    // --- FASE 1: APPEND DEDUPLICADO AL LOG AUTORITATIVO ---
    let row_crystallized = match state.heartbeat_repository.append_deduped(&sample).await {
        Ok(crystallized) => crystallized,
        Err(append_fault) => {
            warn!("❌ [PULSE_FAULT]: Log append failed for {}: {}", device.id, append_fault);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "PULSE_PERSISTENCE_FAULT"})),
            )
                .into_response();
        }
    };

    if row_crystallized {
        state.metrics.inc_counter("heartbeats_ingested_total", &[]);
    } else {
        state.metrics.inc_counter("heartbeats_deduplicated_total", &[]);
    }

    // --- FASE 2: PROYECCIÓN CALIENTE (MONÓTONA) ---
    if let Err(projection_fault) = state.heartbeat_repository.upsert_last_status(&sample).await {
        warn!("⚠️  [PROJECTION_FAULT]: Hot status lagged for {}: {}", device.id, projection_fault);
    }

    // --- FASE 3: REFRESCO DE IDENTIDAD Y CORRELACIÓN DE PING ---
    if let Err(refresh_fault) = state
        .device_repository
        .refresh_from_heartbeat(&device.id, &payload, observed_at)
        .await
    {
        warn!("⚠️  [IDENTITY_REFRESH_FAULT]: {}: {}", device.id, refresh_fault);
    }

    if payload.is_ping_response == Some(true) {
        if let Some(ping_request_identifier) = &payload.ping_request_id {
            match state
                .device_repository
                .record_ping_response(&device.id, ping_request_identifier, observed_at)
                .await
            {
                Ok(true) => debug!("🏓 [PING_CORRELATED]: Device {} answered {}.", device.id, ping_request_identifier),
                Ok(false) => debug!("⚪ [PING_STALE]: Device {} answered a foreign ping id.", device.id),
                Err(ping_fault) => warn!("⚠️  [PING_FAULT]: {}: {}", device.id, ping_fault),
            }
        }
    }

    // --- FASE 4: RASTRO WRITE-BEHIND ---
    state.event_queue.enqueue(DeviceEvent {
        device_id: device.id.clone(),
        event_type: "heartbeat.received".to_string(),
        ts: observed_at,
        details_json: Some(
            json!({
                "battery_pct": payload.battery.pct,
                "network": payload.network.transport,
                "deduplicated": !row_crystallized,
            })
            .to_string(),
        ),
    });

    // Las lecturas del radar quedan rancias: purga por prefijo.
    state.response_cache.invalidate(Some("/v1/devices"));

    (StatusCode::OK, Json(json!({"ok": true}))).into_response()
}

/**
 * Endpoint: POST /v1/action-result (autenticación de dispositivo)
 *
 * Primera escritura gana: duplicados y tardíos responden 200 con
 * 'duplicate: true' sin efecto observable. El flujo de resultados
 * alimenta al comandante de despliegues para avanzar las olas.
 */
#[instrument(skip(state, certified_device, result_request), fields(device = %certified_device.0.id))]
pub async fn handle_action_result(
    State(state): State<AppState>,
    Extension(certified_device): Extension<AuthenticatedDevice>,
    Json(result_request): Json<ActionResultRequest>,
) -> impl IntoResponse {
    let device = &certified_device.0;

    // La identidad autenticada es autoritativa sobre el cuerpo.
    if result_request.device_id != device.id {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "DEVICE_IDENTITY_MISMATCH"})),
        )
            .into_response();
    }

    let Ok(request_identifier) = result_request.request_id.parse::<Uuid>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "MALFORMED_REQUEST_ID"})),
        )
            .into_response();
    };

    let Some(action) = CommandAction::parse(&result_request.action) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "UNKNOWN_ACTION", "action": result_request.action})),
        )
            .into_response();
    };

    let Some(outcome) = CommandOutcome::parse(&result_request.outcome) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "UNKNOWN_OUTCOME", "outcome": result_request.outcome})),
        )
            .into_response();
    };

    let correlated_result = CommandResult {
        request_id: request_identifier,
        device_id: device.id.clone(),
        action,
        outcome,
        message: result_request.message.clone(),
        finished_at: result_request.finished_at,
    };

    let freshly_recorded = match state.ledger_repository.record_result(&correlated_result).await {
        Ok(recorded) => recorded,
        Err(result_fault) => {
            warn!("❌ [RESULT_FAULT]: {} for {}: {}", request_identifier, device.id, result_fault);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "RESULT_PERSISTENCE_FAULT"})),
            )
                .into_response();
        }
    };

    if freshly_recorded {
        state
            .metrics
            .inc_counter("action_results_total", &[("action", action.as_str()), ("outcome", outcome.as_str())]);

        // Avance inmediato de la ola correlacionada (C7 consume C5).
        if let Err(controller_fault) = state.deployment_controller.ingest_action_result(&correlated_result).await
        {
            warn!("⚠️  [WAVE_INGEST_FAULT]: {}: {}", request_identifier, controller_fault);
        }
    }

    (
        StatusCode::OK,
        Json(json!({"ok": true, "duplicate": !freshly_recorded})),
    )
        .into_response()
}
// FIN DEL ARCHIVO [apps/overseer/src/handlers/agent.rs]
