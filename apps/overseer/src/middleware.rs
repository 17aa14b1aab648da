// [apps/overseer/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: GALVANIC AUTHENTICATION GUARDS (V12.0 - TRIPLE CITIZENSHIP)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN DE TOKENS E INYECCIÓN DE IDENTIDAD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TRIPLE CITIZENSHIP: Bearer de dispositivo (huella + bcrypt), JWT
 *    HS256 de operador y llave administrativa de máquina a máquina.
 * 2. FAST PATH + LEGACY: La búsqueda primaria es por huella SHA-256
 *    indexada; los dispositivos legados sin huella se escanean con
 *    bcrypt y reciben backfill inmediato tras verificar.
 * 3. DISTINCT SIGNALS: 'token_not_found' y 'token_mismatch' emiten
 *    métricas separadas; ambos responden 401 sin filtrar cuál.
 * 4. EXTENSION INJECTION: La identidad certificada viaja en las
 *    extensiones de la petición hacia los estratos L3/L4.
 * =================================================================
 */

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use warden_domain_models::device::Device;

use crate::auth::{compute_token_fingerprint, verify_admin_jwt, verify_device_token};
use crate::state::AppState;

/// Identidad de dispositivo certificada, inyectada en la petición.
#[derive(Debug, Clone)]
pub struct AuthenticatedDevice(pub Device);

/// Identidad de operador extraída de un JWT certificado.
#[derive(Debug, Clone)]
pub struct OperatorIdentity {
    pub user_id: i64,
    pub username: String,
}

/// Encabezado de la llave administrativa de máquina a máquina.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header_value| header_value.to_str().ok())
        .filter(|header_text| header_text.starts_with("Bearer "))
        .map(|header_text| header_text[7..].to_string())
}

/**
 * Resuelve un token Bearer a su dispositivo certificado.
 * Camino rápido por huella; escaneo legado con backfill como respaldo.
 */
async fn resolve_device_identity(state: &AppState, presented_token: &str) -> Result<Device, &'static str> {
    let token_fingerprint = compute_token_fingerprint(presented_token);

    // --- ESCENARIO ALFA: BÚSQUEDA INDEXADA POR HUELLA ---
    match state.device_repository.find_by_fingerprint(&token_fingerprint).await {
        Ok(Some(candidate_device)) => {
            if candidate_device.token_revoked_at.is_some() {
                return Err("token_revoked");
            }

            let bcrypt_certified = verify_device_token(
                presented_token.to_string(),
                candidate_device.token_hash.clone(),
            )
            .await
            .unwrap_or(false);

            if bcrypt_certified {
                return Ok(candidate_device);
            }
            // La huella única coincidió pero bcrypt rechazó: integridad comprometida.
            return Err("token_mismatch");
        }
        Ok(None) => {}
        Err(lookup_fault) => {
            warn!("❌ [AUTH_DB_FAULT]: Fingerprint lookup failed: {}", lookup_fault);
            return Err("lookup_fault");
        }
    }

    // --- ESCENARIO BETA: ESCANEO LEGADO CON BACKFILL ---
    let legacy_candidates = match state.device_repository.list_legacy_candidates().await {
        Ok(candidates) => candidates,
        Err(lookup_fault) => {
            warn!("❌ [AUTH_DB_FAULT]: Legacy scan failed: {}", lookup_fault);
            return Err("lookup_fault");
        }
    };

    for legacy_device in legacy_candidates {
        let bcrypt_certified =
            verify_device_token(presented_token.to_string(), legacy_device.token_hash.clone())
                .await
                .unwrap_or(false);

        if bcrypt_certified {
            if let Err(backfill_fault) = state
                .device_repository
                .backfill_fingerprint(&legacy_device.id, &token_fingerprint)
                .await
            {
                warn!("⚠️  [AUTH_BACKFILL_FAULT]: {} not migrated: {}", legacy_device.id, backfill_fault);
            }
            return Ok(legacy_device);
        }
    }

    Err("token_not_found")
}

/**
 * Guardia de dispositivos: certifica el Bearer e inyecta la identidad.
 */
pub async fn device_auth_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_started = Instant::now();

    let Some(presented_token) = extract_bearer_token(&request) else {
        state
            .metrics
            .inc_counter("device_auth_failures_total", &[("reason", "missing_header")]);
        return Err(StatusCode::UNAUTHORIZED);
    };

    match resolve_device_identity(&state, &presented_token).await {
        Ok(certified_device) => {
            state.metrics.observe_histogram(
                "device_auth_latency_ms",
                &[],
                auth_started.elapsed().as_secs_f64() * 1000.0,
            );
            debug!("🤖 [AUTH]: Device {} certified.", certified_device.id);
            request.extensions_mut().insert(AuthenticatedDevice(certified_device));
            Ok(next.run(request).await)
        }
        Err(rejection_reason) => {
            state
                .metrics
                .inc_counter("device_auth_failures_total", &[("reason", rejection_reason)]);
            warn!("❌ [AUTH_REJECTION]: Device bearer rejected ({}).", rejection_reason);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/**
 * Guardia de operadores: certifica el JWT HS256 e inyecta la identidad.
 */
pub async fn admin_jwt_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(presented_token) = extract_bearer_token(&request) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match verify_admin_jwt(&state.config.jwt_secret, &presented_token, chrono::Utc::now()) {
        Ok(certified_claims) => {
            debug!("👤 [AUTH]: Operator {} authenticated via JWT.", certified_claims.username);
            request.extensions_mut().insert(OperatorIdentity {
                user_id: certified_claims.user_id,
                username: certified_claims.username,
            });
            Ok(next.run(request).await)
        }
        Err(jwt_rejection) => {
            warn!("❌ [AUTH_REJECTION]: Operator JWT rejected: {}", jwt_rejection);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

fn admin_key_certified(state: &AppState, request: &Request) -> bool {
    request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|header_value| header_value.to_str().ok())
        .map(|presented_key| {
            // Comparación de tiempo constante contra la llave configurada.
            presented_key
                .as_bytes()
                .ct_eq(state.config.admin_key.as_bytes())
                .into()
        })
        .unwrap_or(false)
}

/**
 * Guardia de llave administrativa (enrolamiento, métricas, mandos M2M).
 */
pub async fn admin_key_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if admin_key_certified(&state, &request) {
        return Ok(next.run(request).await);
    }

    warn!("❌ [AUTH_REJECTION]: Admin key missing or invalid.");
    Err(StatusCode::UNAUTHORIZED)
}

/**
 * Guardia del gateway de descargas: acepta llave administrativa O
 * Bearer de dispositivo — los agentes descargan durante despliegues,
 * los operadores auditan artefactos.
 */
pub async fn download_auth_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if admin_key_certified(&state, &request) {
        return Ok(next.run(request).await);
    }

    let Some(presented_token) = extract_bearer_token(&request) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match resolve_device_identity(&state, &presented_token).await {
        Ok(certified_device) => {
            request.extensions_mut().insert(AuthenticatedDevice(certified_device));
            Ok(next.run(request).await)
        }
        Err(rejection_reason) => {
            state
                .metrics
                .inc_counter("device_auth_failures_total", &[("reason", rejection_reason)]);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/middleware.rs]
