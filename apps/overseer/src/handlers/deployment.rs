// [apps/overseer/src/handlers/deployment.rs]
/*!
 * =================================================================
 * APARATO: ROLLOUT CONSOLE HANDLER (V10.0 - WAVE CONTROL)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CREACIÓN Y GOBIERNO DE CORRIDAS DE DESPLIEGUE
 * =================================================================
 */

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use warden_domain_models::deployment::RunStatus;
use warden_infra_db::DbError;

use crate::middleware::OperatorIdentity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub apk_id: i64,
    #[serde(default)]
    pub device_ids: Option<Vec<String>>,
    #[serde(default = "default_batch_size")]
    pub batch_size: i32,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: i32,
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_minutes: i32,
}

fn default_batch_size() -> i32 {
    5
}
fn default_success_threshold() -> i32 {
    3
}
fn default_batch_timeout() -> i32 {
    15
}

fn rollout_fault_response(rollout_fault: &DbError) -> (StatusCode, Json<serde_json::Value>) {
    match rollout_fault {
        DbError::DeploymentNotFound => {
            (StatusCode::NOT_FOUND, Json(json!({"error": "DEPLOYMENT_NOT_FOUND"})))
        }
        DbError::InvalidStateTransition(transition_detail) => (
            StatusCode::CONFLICT,
            Json(json!({"error": "INVALID_STATE_TRANSITION", "detail": transition_detail})),
        ),
        other_fault => {
            warn!("❌ [ROLLOUT_FAULT]: {}", other_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "ROLLOUT_FAULT"})))
        }
    }
}

/**
 * Endpoint: POST /v1/deployments (JWT de operador)
 *
 * Sin 'device_ids' explícitos, la corrida cubre toda la flota
 * direccionable por push. La cobertura queda sellada en la creación.
 */
#[instrument(skip(state, operator, create_request))]
pub async fn handle_create_run(
    State(state): State<AppState>,
    Extension(operator): Extension<OperatorIdentity>,
    Json(create_request): Json<CreateRunRequest>,
) -> impl IntoResponse {
    if create_request.batch_size <= 0 || create_request.success_threshold <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "BATCH_PARAMETERS_OUT_OF_RANGE"})),
        )
            .into_response();
    }
    if create_request.success_threshold > create_request.batch_size {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "THRESHOLD_EXCEEDS_BATCH_SIZE"})),
        )
            .into_response();
    }

    match state.apk_repository.fetch_version(create_request.apk_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (StatusCode::NOT_FOUND, Json(json!({"error": "APK_NOT_FOUND"}))).into_response()
        }
        Err(catalog_fault) => return rollout_fault_response(&catalog_fault).into_response(),
    }

    let target_device_ids = match &create_request.device_ids {
        Some(explicit_identifiers) if !explicit_identifiers.is_empty() => explicit_identifiers.clone(),
        _ => match state.device_repository.list_fleet().await {
            Ok(fleet_devices) => fleet_devices
                .into_iter()
                .filter(|device| device.fcm_token.is_some())
                .map(|device| device.id)
                .collect(),
            Err(fleet_fault) => return rollout_fault_response(&fleet_fault).into_response(),
        },
    };

    if target_device_ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "NO_ADDRESSABLE_DEVICES"})),
        )
            .into_response();
    }

    match state
        .deployment_repository
        .create_run(
            create_request.apk_id,
            Some(&operator.username),
            &target_device_ids,
            create_request.batch_size,
            create_request.success_threshold,
            create_request.batch_timeout_minutes,
        )
        .await
    {
        Ok(forged_run) => {
            info!(
                "🌊 [ROLLOUT_CREATED]: Run {} ({} devices, {} waves) by {}.",
                forged_run.id, forged_run.total_devices, forged_run.total_batches, operator.username
            );
            (StatusCode::OK, Json(json!(forged_run))).into_response()
        }
        Err(creation_fault) => rollout_fault_response(&creation_fault).into_response(),
    }
}

/// Endpoint: GET /v1/deployments/{id} (JWT de operador)
#[instrument(skip(state, _operator))]
pub async fn handle_get_run(
    State(state): State<AppState>,
    Extension(_operator): Extension<OperatorIdentity>,
    Path(run_identifier): Path<i64>,
) -> impl IntoResponse {
    match state.deployment_repository.fetch_run(run_identifier).await {
        Ok(run) => (StatusCode::OK, Json(json!(run))).into_response(),
        Err(fetch_fault) => rollout_fault_response(&fetch_fault).into_response(),
    }
}

/// Endpoint: GET /v1/deployments/{id}/batches (JWT de operador)
#[instrument(skip(state, _operator))]
pub async fn handle_list_batches(
    State(state): State<AppState>,
    Extension(_operator): Extension<OperatorIdentity>,
    Path(run_identifier): Path<i64>,
) -> impl IntoResponse {
    match state.deployment_repository.list_batches(run_identifier).await {
        Ok(run_batches) => (StatusCode::OK, Json(json!({"batches": run_batches}))).into_response(),
        Err(fetch_fault) => rollout_fault_response(&fetch_fault).into_response(),
    }
}

async fn transition_run_endpoint(
    state: &AppState,
    run_identifier: i64,
    target_status: RunStatus,
    operator_username: &str,
) -> axum::response::Response {
    let completion_seal = if target_status.is_terminal() { Some(Utc::now()) } else { None };

    match state
        .deployment_repository
        .transition_run(run_identifier, target_status, completion_seal)
        .await
    {
        Ok(transitioned_run) => {
            info!(
                "🔄 [ROLLOUT_TRANSITION]: Run {} -> {} by {}.",
                run_identifier,
                target_status.as_str(),
                operator_username
            );
            (StatusCode::OK, Json(json!(transitioned_run))).into_response()
        }
        Err(transition_fault) => rollout_fault_response(&transition_fault).into_response(),
    }
}

/// Endpoint: POST /v1/deployments/{id}/pause (JWT de operador)
pub async fn handle_pause_run(
    State(state): State<AppState>,
    Extension(operator): Extension<OperatorIdentity>,
    Path(run_identifier): Path<i64>,
) -> impl IntoResponse {
    transition_run_endpoint(&state, run_identifier, RunStatus::Paused, &operator.username).await
}

/// Endpoint: POST /v1/deployments/{id}/resume (JWT de operador)
pub async fn handle_resume_run(
    State(state): State<AppState>,
    Extension(operator): Extension<OperatorIdentity>,
    Path(run_identifier): Path<i64>,
) -> impl IntoResponse {
    transition_run_endpoint(&state, run_identifier, RunStatus::Running, &operator.username).await
}

/// Endpoint: POST /v1/deployments/{id}/abort (JWT de operador)
pub async fn handle_abort_run(
    State(state): State<AppState>,
    Extension(operator): Extension<OperatorIdentity>,
    Path(run_identifier): Path<i64>,
) -> impl IntoResponse {
    transition_run_endpoint(&state, run_identifier, RunStatus::Aborted, &operator.username).await
}
// FIN DEL ARCHIVO [apps/overseer/src/handlers/deployment.rs]
