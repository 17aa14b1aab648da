// INICIO DEL ARCHIVO [apps/overseer/src/handlers/apk.rs]
/*!
 * =================================================================
 * APARATO: APK GATEWAY HANDLER (V12.0 - STREAM OR BUFFER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: SUBIDA VERIFICADA Y DESCARGA CON CACHE/STREAMING
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SPLIT BY SIZE: > 50MB (según catálogo o tamaño real) se sirve por
 *    streaming de trozos de 1MB esquivando la cache; el resto se
 *    bufferiza y puebla la cache caliente.
 * 2. TELEMETRY HEADERS: Content-Length, X-APK-SHA256, X-Cache-Hit,
 *    X-Download-Speed-Kbps y Accept-Ranges en toda descarga.
 * 3. FAULT SEMANTICS: Objeto inexistente → 404; bóveda caída → 503.
 * =================================================================
 */

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tokio_util::io::ReaderStream;
use tracing::{info, instrument, warn};

use warden_infra_vault::store::{object_key_from_storage_path, upload_apk};
use warden_infra_vault::{VaultError, CHUNK_SIZE_BYTES, STREAMING_THRESHOLD_BYTES};

use crate::middleware::OperatorIdentity;
use crate::state::AppState;

const APK_CONTENT_TYPE: &str = "application/vnd.android.package-archive";

fn vault_fault_response(vault_fault: &VaultError) -> (StatusCode, Json<serde_json::Value>) {
    match vault_fault {
        VaultError::NotFound(object_key) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "ARTIFACT_NOT_FOUND", "key": object_key})),
        ),
        VaultError::ValidationRejected(rejection_detail) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "ARTIFACT_REJECTED", "detail": rejection_detail})),
        ),
        unavailable_fault => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "VAULT_UNAVAILABLE", "detail": unavailable_fault.to_string()})),
        ),
    }
}

/**
 * Endpoint: POST /v1/apk/upload (JWT de operador, multipart)
 *
 * Campos: 'file' (el APK), 'package_name', 'version_code',
 * 'version_name'. La subida valida admisión, reintenta ante presión
 * transitoria, verifica presencia y registra la versión en el catálogo.
 */
#[instrument(skip(state, operator, multipart_payload))]
pub async fn handle_upload(
    State(state): State<AppState>,
    Extension(operator): Extension<OperatorIdentity>,
    mut multipart_payload: Multipart,
) -> impl IntoResponse {
    let mut artifact_bytes: Option<Vec<u8>> = None;
    let mut artifact_filename = String::new();
    let mut package_name = String::new();
    let mut version_code: Option<i64> = None;
    let mut version_name = String::new();

    while let Ok(Some(multipart_field)) = multipart_payload.next_field().await {
        let field_name = multipart_field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                artifact_filename = multipart_field.file_name().unwrap_or("artifact.apk").to_string();
                match multipart_field.bytes().await {
                    Ok(field_bytes) => artifact_bytes = Some(field_bytes.to_vec()),
                    Err(read_fault) => {
                        warn!("❌ [UPLOAD_FAULT]: Multipart stream severed: {}", read_fault);
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"error": "MULTIPART_STREAM_SEVERED"})),
                        )
                            .into_response();
                    }
                }
            }
            "package_name" => package_name = multipart_field.text().await.unwrap_or_default(),
            "version_code" => {
                version_code = multipart_field.text().await.ok().and_then(|text| text.trim().parse().ok())
            }
            "version_name" => version_name = multipart_field.text().await.unwrap_or_default(),
            _ => {}
        }
    }

    let Some(artifact_bytes) = artifact_bytes else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "FILE_FIELD_REQUIRED"}))).into_response();
    };
    let Some(version_code) = version_code else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "VERSION_CODE_REQUIRED"}))).into_response();
    };
    if package_name.trim().is_empty() || version_name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "PACKAGE_AND_VERSION_NAME_REQUIRED"})),
        )
            .into_response();
    }

    let upload_receipt =
        match upload_apk(state.apk_vault.as_ref(), "release", &artifact_filename, &artifact_bytes).await {
            Ok(receipt) => receipt,
            Err(vault_fault) => return vault_fault_response(&vault_fault).into_response(),
        };

    match state
        .apk_repository
        .register_version(
            &package_name,
            version_code,
            &version_name,
            &upload_receipt.storage_path,
            upload_receipt.file_size as i64,
            Some(&upload_receipt.sha256_hex),
            Some(&operator.username),
        )
        .await
    {
        Ok(registered_version) => {
            info!(
                "📦 [APK_REGISTERED]: {} v{} ({}) sealed by {}.",
                registered_version.package_name,
                registered_version.version_name,
                registered_version.id,
                operator.username
            );
            (StatusCode::OK, Json(json!(registered_version))).into_response()
        }
        Err(catalog_fault) => {
            warn!("❌ [CATALOG_FAULT]: {}", catalog_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "CATALOG_FAULT"}))).into_response()
        }
    }
}

/**
 * Endpoint: GET /v1/apk/versions (JWT de operador)
 */
#[instrument(skip(state, _operator))]
pub async fn handle_list_versions(
    State(state): State<AppState>,
    Extension(_operator): Extension<OperatorIdentity>,
) -> impl IntoResponse {
    match state.apk_repository.list_versions().await {
        Ok(catalog_versions) => (StatusCode::OK, Json(json!({"versions": catalog_versions}))).into_response(),
        Err(catalog_fault) => {
            warn!("❌ [CATALOG_FAULT]: {}", catalog_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "CATALOG_FAULT"}))).into_response()
        }
    }
}

fn download_headers(
    file_size: u64,
    sha256_hex: Option<&str>,
    cache_hit: bool,
    speed_kbps: u64,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(APK_CONTENT_TYPE));
    if let Ok(length_value) = HeaderValue::from_str(&file_size.to_string()) {
        headers.insert(header::CONTENT_LENGTH, length_value);
    }
    if let Some(sha256_hex) = sha256_hex {
        if let Ok(sha_value) = HeaderValue::from_str(sha256_hex) {
            headers.insert("x-apk-sha256", sha_value);
        }
    }
    headers.insert("x-cache-hit", HeaderValue::from_static(if cache_hit { "true" } else { "false" }));
    if let Ok(speed_value) = HeaderValue::from_str(&speed_kbps.to_string()) {
        headers.insert("x-download-speed-kbps", speed_value);
    }
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers
}

/**
 * Endpoint: GET /v1/apk/download/{id} (dispositivo o llave admin)
 *
 * # Logic:
 * 1. Catálogo → 404 si la versión no existe.
 * 2. > 50MB (catálogo o tamaño real) → streaming de trozos de 1MB,
 *    esquivando la cache caliente.
 * 3. ≤ 50MB → cache caliente → bóveda, poblando la cache al volver.
 * 4. Telemetría de descarga sellada en la instalación correlacionada.
 */
#[instrument(skip(state, query_params))]
pub async fn handle_download(
    State(state): State<AppState>,
    Path(apk_version_identifier): Path<i64>,
    Query(query_params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let download_started = Instant::now();

    let catalog_version = match state.apk_repository.fetch_version(apk_version_identifier).await {
        Ok(Some(version)) => version,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, Json(json!({"error": "APK_NOT_FOUND"}))).into_response()
        }
        Err(catalog_fault) => {
            warn!("❌ [CATALOG_FAULT]: {}", catalog_fault);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "CATALOG_FAULT"}))).into_response();
        }
    };

    let object_key = object_key_from_storage_path(&catalog_version.file_path).to_string();
    let cache_key = format!("apk:{}", catalog_version.id);

    // Decisión inicial por el tamaño del catálogo, re-validada contra
    // el tamaño físico real del objeto.
    let mut serve_streaming = catalog_version.file_size as u64 > STREAMING_THRESHOLD_BYTES;

    if !serve_streaming {
        if let Ok(physical_size) = state.apk_vault.object_size(&object_key).await {
            serve_streaming = physical_size > STREAMING_THRESHOLD_BYTES;
        }
    }

    if serve_streaming {
        // --- CAMINO DE STREAMING (la cache se esquiva) ---
        let physical_size = match state.apk_vault.object_size(&object_key).await {
            Ok(size) => size,
            Err(vault_fault) => return vault_fault_response(&vault_fault).into_response(),
        };

        let vault_stream = match state.apk_vault.open_stream(&object_key).await {
            Ok(stream_reader) => stream_reader,
            Err(vault_fault) => return vault_fault_response(&vault_fault).into_response(),
        };

        state.metrics.inc_counter("apk_downloads_total", &[("mode", "streaming")]);
        info!(
            "🌊 [APK_STREAM]: Version {} streaming {} bytes in {}B chunks.",
            catalog_version.id, physical_size, CHUNK_SIZE_BYTES
        );

        let chunked_stream = ReaderStream::with_capacity(vault_stream, CHUNK_SIZE_BYTES);
        let headers = download_headers(physical_size, catalog_version.sha256.as_deref(), false, 0);
        return (StatusCode::OK, headers, Body::from_stream(chunked_stream)).into_response();
    }

    // --- CAMINO BUFFERED: CACHE CALIENTE → BÓVEDA ---
    let (artifact_bytes, cache_hit) = match state.artifact_cache.get(&cache_key) {
        Some(cached_artifact) => (cached_artifact.file_data.as_ref().clone(), true),
        None => {
            let fetched_bytes = match state.apk_vault.fetch_object(&object_key).await {
                Ok(bytes) => bytes,
                Err(vault_fault) => return vault_fault_response(&vault_fault).into_response(),
            };
            state.artifact_cache.put(&cache_key, fetched_bytes.clone(), APK_CONTENT_TYPE);
            (fetched_bytes, false)
        }
    };

    let elapsed_ms = download_started.elapsed().as_millis().max(1) as u64;
    let speed_kbps = (artifact_bytes.len() as u64 / 1024) * 1000 / elapsed_ms;

    state.metrics.inc_counter(
        "apk_downloads_total",
        &[("mode", if cache_hit { "cache" } else { "buffered" })],
    );

    // Telemetría de descarga hacia la instalación correlacionada.
    if let Some(installation_identifier) =
        query_params.get("installation_id").and_then(|raw| raw.parse::<i64>().ok())
    {
        let telemetry_outcome = state
            .apk_repository
            .record_download_telemetry(
                installation_identifier,
                Utc::now() - chrono::Duration::milliseconds(elapsed_ms as i64),
                Utc::now(),
                artifact_bytes.len() as i64,
                speed_kbps as i64,
            )
            .await;
        if let Err(telemetry_fault) = telemetry_outcome {
            warn!("⚠️  [DOWNLOAD_TELEMETRY_FAULT]: {}", telemetry_fault);
        }
    }

    let headers = download_headers(
        artifact_bytes.len() as u64,
        catalog_version.sha256.as_deref(),
        cache_hit,
        speed_kbps,
    );
    (StatusCode::OK, headers, Body::from(artifact_bytes)).into_response()
}
// FIN DEL ARCHIVO [apps/overseer/src/handlers/apk.rs]
