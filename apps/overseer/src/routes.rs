// INICIO DEL ARCHIVO [apps/overseer/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V13.0 - FLEET TOPOLOGY)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE ESTRATOS DE AGENTE, OPERADOR Y OPS
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología segrega tres ciudadanías con guardias dedicados:
 * 1. AGENTES (Bearer de dispositivo): latidos y resultados de acción.
 * 2. OPERADORES (JWT): radar de flota, catálogo APK y despliegues.
 * 3. MÁQUINA-A-MÁQUINA (llave admin): enrolamiento, mandos y métricas.
 * El gateway de descargas acepta ambas ciudadanías no-operador.
 * =================================================================
 */

use crate::handlers::{admin, agent, apk, deployment, ops};
use crate::middleware::{admin_jwt_guard, admin_key_guard, device_auth_guard, download_auth_guard};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Tope de cuerpo para la subida de artefactos (500 MB + margen multipart).
const UPLOAD_BODY_LIMIT_BYTES: usize = 512 * 1024 * 1024;

pub fn create_sovereign_router(application_shared_state: AppState) -> Router {
    // Escudo de Red: CORS para el tablero del operador y herramientas Ops.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO DE AGENTES: uplink de la flota Android.
    let agent_uplink_stratum = Router::new()
        .route("/heartbeat", post(agent::handle_heartbeat))
        .route("/action-result", post(agent::handle_action_result))
        .layer(middleware::from_fn_with_state(
            application_shared_state.clone(),
            device_auth_guard,
        ));

    // ESTRATO DE OPERADORES: consola de la flota (JWT).
    let operator_console_stratum = Router::new()
        .route("/devices", get(admin::handle_list_devices))
        .route("/devices/purge", post(admin::handle_purge_devices))
        .route("/devices/:device_id/status", get(admin::handle_device_status))
        .route("/devices/:device_id/settings", post(admin::handle_update_settings))
        .route("/devices/:device_id/revoke", post(admin::handle_revoke_device))
        .route("/apk/upload", post(apk::handle_upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT_BYTES)))
        .route("/apk/versions", get(apk::handle_list_versions))
        .route("/deployments", post(deployment::handle_create_run))
        .route("/deployments/:run_id", get(deployment::handle_get_run))
        .route("/deployments/:run_id/batches", get(deployment::handle_list_batches))
        .route("/deployments/:run_id/pause", post(deployment::handle_pause_run))
        .route("/deployments/:run_id/resume", post(deployment::handle_resume_run))
        .route("/deployments/:run_id/abort", post(deployment::handle_abort_run))
        .layer(middleware::from_fn_with_state(
            application_shared_state.clone(),
            admin_jwt_guard,
        ));

    // ESTRATO MÁQUINA-A-MÁQUINA: enrolamiento y mandos firmados.
    let machine_command_stratum = Router::new()
        .route("/register", post(admin::handle_register_device))
        .route("/command", post(admin::handle_command))
        .layer(middleware::from_fn_with_state(
            application_shared_state.clone(),
            admin_key_guard,
        ));

    // GATEWAY DE DESCARGAS: dispositivos en despliegue u operadores M2M.
    let download_gateway_stratum = Router::new()
        .route("/apk/download/:apk_id", get(apk::handle_download))
        .layer(middleware::from_fn_with_state(
            application_shared_state.clone(),
            download_auth_guard,
        ));

    // ESTRATO DE OPERACIONES: radar del Panóptico.
    let operations_stratum = Router::new()
        .route("/metrics", get(ops::handle_metrics))
        .route("/pool_health", get(ops::handle_pool_health))
        .route("/diagnostics", get(ops::handle_diagnostics))
        .layer(middleware::from_fn_with_state(
            application_shared_state.clone(),
            admin_key_guard,
        ));

    // COMPOSICIÓN GLOBAL (Root Topology)
    Router::new()
        .route("/health", get(|| async { "STATUS_OK" }))
        .nest(
            "/v1",
            Router::new()
                .merge(agent_uplink_stratum)
                .merge(operator_console_stratum)
                .merge(machine_command_stratum)
                .merge(download_gateway_stratum)
                .route("/auth/login", post(admin::handle_login)),
        )
        .nest("/ops", operations_stratum)
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
// FIN DEL ARCHIVO [apps/overseer/src/routes.rs]
