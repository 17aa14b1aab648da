// INICIO DEL ARCHIVO [apps/overseer/src/handlers/admin.rs]
/*!
 * =================================================================
 * APARATO: OPERATOR COMMAND HANDLER (V14.0 - FLEET CONSOLE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ENROLAMIENTO, RADAR DE FLOTA Y DESPACHO DE MANDOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TOKEN ONCE: El token del dispositivo se muestra una única vez en
 *    el enrolamiento; sólo el hash y la huella persisten.
 * 2. SIGNED COMMANDS: El endpoint de mandos valida la firma HMAC del
 *    operador sobre la canonicalización de parámetros antes de tocar
 *    el despachador.
 * 3. CACHED RADAR: El listado de flota sirve desde la cache de
 *    respuestas con TTL corto e invalidación por prefijo.
 * =================================================================
 */

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use warden_domain_models::command::CommandAction;
use warden_domain_models::device::{compute_presence, PresenceStatus};

use crate::auth::{
    compute_token_fingerprint, generate_device_token, hash_device_token, issue_admin_jwt, verify_password,
};
use crate::middleware::OperatorIdentity;
use crate::signing::{compute_admin_command_signature, signatures_match};
use crate::state::response_cache::make_cache_key;
use crate::state::AppState;

/// TTL del radar de flota en la cache de respuestas.
const DEVICE_LIST_CACHE_TTL_SECONDS: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    pub alias: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub monitored_package: Option<String>,
    #[serde(default)]
    pub monitored_app_name: Option<String>,
    #[serde(default)]
    pub monitor_threshold_min: Option<i32>,
    #[serde(default)]
    pub monitor_enabled: Option<bool>,
    #[serde(default)]
    pub auto_relaunch_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeDevicesRequest {
    pub device_ids: Vec<String>,
    #[serde(default = "default_purge_history")]
    pub purge_history: bool,
}

fn default_purge_history() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub device_ids: Vec<String>,
    pub command_type: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    pub signature: String,
}

/**
 * Endpoint: POST /v1/auth/login
 * Certifica credenciales de operador y emite el JWT HS256 (7 días).
 */
#[instrument(skip(state, login_request), fields(username = %login_request.username))]
pub async fn handle_login(
    State(state): State<AppState>,
    Json(login_request): Json<LoginRequest>,
) -> impl IntoResponse {
    let operator_account = match state.user_repository.find_by_username(&login_request.username).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "INVALID_CREDENTIALS"}))).into_response()
        }
        Err(lookup_fault) => {
            warn!("❌ [LOGIN_FAULT]: {}", lookup_fault);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "LOGIN_FAULT"}))).into_response();
        }
    };

    let password_certified = verify_password(login_request.password, operator_account.password_hash.clone())
        .await
        .unwrap_or(false);

    if !password_certified {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "INVALID_CREDENTIALS"}))).into_response();
    }

    let issued_jwt = issue_admin_jwt(
        &state.config.jwt_secret,
        operator_account.id,
        &operator_account.username,
        Utc::now(),
    );

    (StatusCode::OK, Json(json!({"token": issued_jwt, "username": operator_account.username}))).into_response()
}

/**
 * Endpoint: POST /v1/register (llave administrativa)
 *
 * Enrola un dispositivo nuevo. El token de portador se retorna UNA
 * sola vez; en adelante sólo viven su hash bcrypt y su huella SHA-256.
 */
#[instrument(skip(state, register_request))]
pub async fn handle_register_device(
    State(state): State<AppState>,
    Json(register_request): Json<RegisterDeviceRequest>,
) -> impl IntoResponse {
    if register_request.alias.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "ALIAS_REQUIRED"}))).into_response();
    }

    let device_identifier = register_request
        .device_id
        .filter(|identifier| !identifier.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let device_token = generate_device_token();
    let token_fingerprint = compute_token_fingerprint(&device_token);

    let token_hash = match hash_device_token(device_token.clone()).await {
        Ok(sealed_hash) => sealed_hash,
        Err(hash_fault) => {
            warn!("❌ [ENROLL_FAULT]: Hash engine failed: {}", hash_fault);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "ENROLL_FAULT"}))).into_response();
        }
    };

    match state
        .device_repository
        .enroll_device(&device_identifier, &register_request.alias, &token_hash, &token_fingerprint)
        .await
    {
        Ok(enrolled_device) => {
            info!("🛰️  [ENROLLED]: Device {} ({}) joined the fleet.", enrolled_device.id, enrolled_device.alias);
            state.response_cache.invalidate(Some("/v1/devices"));
            (
                StatusCode::OK,
                Json(json!({"device_token": device_token, "device_id": enrolled_device.id})),
            )
                .into_response()
        }
        Err(enroll_fault) => {
            warn!("❌ [ENROLL_FAULT]: {}", enroll_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "ENROLL_FAULT"}))).into_response()
        }
    }
}

/**
 * Endpoint: GET /v1/devices (JWT de operador)
 * Radar de la flota con presencia computada y cache de respuestas.
 */
#[instrument(skip(state, _operator, query_params))]
pub async fn handle_list_devices(
    State(state): State<AppState>,
    Extension(_operator): Extension<OperatorIdentity>,
    Query(query_params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let now = Utc::now();
    let query_pairs: Vec<(String, String)> = query_params.into_iter().collect();
    let cache_key = make_cache_key("/v1/devices", &query_pairs);

    if let Some(cached_response) = state.response_cache.get(&cache_key, now) {
        return (StatusCode::OK, Json(cached_response)).into_response();
    }

    let fleet_devices = match state.device_repository.list_fleet().await {
        Ok(devices) => devices,
        Err(radar_fault) => {
            warn!("❌ [RADAR_FAULT]: {}", radar_fault);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "RADAR_FAULT"}))).into_response();
        }
    };

    let device_identifiers: Vec<String> = fleet_devices.iter().map(|device| device.id.clone()).collect();
    let status_index: HashMap<String, serde_json::Value> = state
        .fast_reads
        .statuses_for(&device_identifiers)
        .await
        .map(|statuses| {
            statuses
                .into_iter()
                .map(|status| {
                    let status_value = serde_json::to_value(&status).unwrap_or(serde_json::Value::Null);
                    (status.device_id, status_value)
                })
                .collect()
        })
        .unwrap_or_default();

    let fleet_summaries: Vec<serde_json::Value> = fleet_devices
        .iter()
        .map(|device| {
            let presence =
                compute_presence(device.last_seen, state.config.heartbeat_interval_seconds, now);
            json!({
                "id": device.id,
                "alias": device.alias,
                "app_version": device.app_version,
                "last_seen": device.last_seen,
                "created_at": device.created_at,
                "status": if presence == PresenceStatus::Online { "online" } else { "offline" },
                "model": device.model,
                "manufacturer": device.manufacturer,
                "android_version": device.android_version,
                "sdk_int": device.sdk_int,
                "build_id": device.build_id,
                "is_device_owner": device.is_device_owner,
                "monitored_package": device.monitored_package,
                "monitored_app_name": device.monitored_app_name,
                "monitor_threshold_min": device.monitor_threshold_min,
                "monitor_enabled": device.monitor_enabled,
                "auto_relaunch_enabled": device.auto_relaunch_enabled,
                "last_status": status_index.get(&device.id),
            })
        })
        .collect();

    let radar_response = json!({"devices": fleet_summaries, "total": fleet_summaries.len()});
    state.response_cache.set(
        &cache_key,
        radar_response.clone(),
        DEVICE_LIST_CACHE_TTL_SECONDS,
        Some("/v1/devices"),
        now,
    );

    (StatusCode::OK, Json(radar_response)).into_response()
}

/**
 * Endpoint: GET /v1/devices/{id}/status (JWT de operador)
 * Estado puntual por el camino vigente (proyección o legado).
 */
#[instrument(skip(state, _operator))]
pub async fn handle_device_status(
    State(state): State<AppState>,
    Extension(_operator): Extension<OperatorIdentity>,
    Path(device_identifier): Path<String>,
) -> impl IntoResponse {
    match state.fast_reads.device_status(&device_identifier).await {
        Ok(Some(device_status)) => (StatusCode::OK, Json(json!(device_status))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(json!({"error": "STATUS_NOT_FOUND"}))).into_response(),
        Err(status_fault) => {
            warn!("❌ [STATUS_FAULT]: {}: {}", device_identifier, status_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "STATUS_FAULT"}))).into_response()
        }
    }
}

/**
 * Endpoint: POST /v1/devices/{id}/settings (JWT de operador)
 */
#[instrument(skip(state, _operator, settings_request))]
pub async fn handle_update_settings(
    State(state): State<AppState>,
    Extension(_operator): Extension<OperatorIdentity>,
    Path(device_identifier): Path<String>,
    Json(settings_request): Json<UpdateSettingsRequest>,
) -> impl IntoResponse {
    if let Some(threshold_minutes) = settings_request.monitor_threshold_min {
        if !(1..=1440).contains(&threshold_minutes) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "THRESHOLD_OUT_OF_RANGE", "allowed": "1..=1440"})),
            )
                .into_response();
        }
    }

    match state
        .device_repository
        .update_monitor_settings(
            &device_identifier,
            settings_request.monitored_package.as_deref(),
            settings_request.monitored_app_name.as_deref(),
            settings_request.monitor_threshold_min,
            settings_request.monitor_enabled,
            settings_request.auto_relaunch_enabled,
        )
        .await
    {
        Ok(updated_device) => {
            state.response_cache.invalidate(Some("/v1/devices"));
            (StatusCode::OK, Json(json!(updated_device))).into_response()
        }
        Err(warden_infra_db::DbError::DeviceNotFound) => {
            (StatusCode::NOT_FOUND, Json(json!({"error": "DEVICE_NOT_FOUND"}))).into_response()
        }
        Err(settings_fault) => {
            warn!("❌ [SETTINGS_FAULT]: {}: {}", device_identifier, settings_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "SETTINGS_FAULT"}))).into_response()
        }
    }
}

/**
 * Endpoint: POST /v1/devices/{id}/revoke (JWT de operador)
 * Revocación suave: el token deja de autenticar, el rastro persiste.
 */
#[instrument(skip(state, operator))]
pub async fn handle_revoke_device(
    State(state): State<AppState>,
    Extension(operator): Extension<OperatorIdentity>,
    Path(device_identifier): Path<String>,
) -> impl IntoResponse {
    match state.device_repository.revoke_token(&device_identifier, Utc::now()).await {
        Ok(()) => {
            info!("🔒 [REVOKED]: Device {} sealed by operator {}.", device_identifier, operator.username);
            state.response_cache.invalidate(Some("/v1/devices"));
            (StatusCode::OK, Json(json!({"ok": true}))).into_response()
        }
        Err(revoke_fault) => {
            warn!("❌ [REVOKE_FAULT]: {}: {}", device_identifier, revoke_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "REVOKE_FAULT"}))).into_response()
        }
    }
}

/**
 * Endpoint: POST /v1/devices/purge (JWT de operador)
 * Encola la purga histórica para el Reaper; responde 202 con el id.
 */
#[instrument(skip(state, operator, purge_request), fields(devices = purge_request.device_ids.len()))]
pub async fn handle_purge_devices(
    State(state): State<AppState>,
    Extension(operator): Extension<OperatorIdentity>,
    Json(purge_request): Json<PurgeDevicesRequest>,
) -> impl IntoResponse {
    if purge_request.device_ids.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "DEVICE_IDS_REQUIRED"}))).into_response();
    }

    let tracking_request_id = Uuid::new_v4().to_string();
    let job_identifier = state.purge_queue.enqueue(
        &tracking_request_id,
        purge_request.device_ids.clone(),
        purge_request.purge_history,
        Utc::now(),
    );

    state.metrics.inc_counter("purge_jobs_enqueued_total", &[]);
    info!(
        "💀 [PURGE_ENQUEUED]: Job {} for {} devices by {}.",
        job_identifier,
        purge_request.device_ids.len(),
        operator.username
    );

    (
        StatusCode::ACCEPTED,
        Json(json!({"job_id": job_identifier, "request_id": tracking_request_id})),
    )
        .into_response()
}

/**
 * Endpoint: POST /v1/command (llave administrativa)
 *
 * Valida la firma del operador sobre
 * device_ids.join(",") + ":" + command_type + ":" + parámetros
 * canónicos, y despacha el fan-out vía el libro mayor idempotente.
 */
#[instrument(skip(state, command_request), fields(command = %command_request.command_type, devices = command_request.device_ids.len()))]
pub async fn handle_command(
    State(state): State<AppState>,
    Json(command_request): Json<CommandRequest>,
) -> impl IntoResponse {
    let expected_signature = compute_admin_command_signature(
        &state.config.hmac_secret,
        &command_request.device_ids,
        &command_request.command_type,
        &command_request.parameters,
    );

    if !signatures_match(&expected_signature, &command_request.signature) {
        warn!("❌ [COMMAND_REJECTED]: Operator signature drift detected.");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "SIGNATURE_MISMATCH"}))).into_response();
    }

    let Some(action) = CommandAction::parse(&command_request.command_type) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "UNKNOWN_COMMAND", "command_type": command_request.command_type})),
        )
            .into_response();
    };

    let extra_data: HashMap<String, String> = command_request
        .parameters
        .as_object()
        .map(|parameter_map| {
            parameter_map
                .iter()
                .map(|(key, value)| {
                    let wire_value = match value {
                        serde_json::Value::String(text) => text.clone(),
                        other_value => other_value.to_string(),
                    };
                    (key.clone(), wire_value)
                })
                .collect()
        })
        .unwrap_or_default();

    match state.dispatcher.dispatch_bulk(&command_request.device_ids, action, extra_data).await {
        Ok(dispatch_verdicts) => (StatusCode::OK, Json(json!({"results": dispatch_verdicts}))).into_response(),
        Err(dispatch_fault) => {
            warn!("❌ [COMMAND_FAULT]: {}", dispatch_fault);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "DISPATCH_UNAVAILABLE", "detail": dispatch_fault.to_string()})),
            )
                .into_response()
        }
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/handlers/admin.rs]
