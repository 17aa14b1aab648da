// INICIO DEL ARCHIVO [apps/overseer/src/services/command_dispatcher.rs]
/*!
 * =================================================================
 * APARATO: TACTICAL COMMAND DISPATCHER (V12.1 - LEDGER FIRST)
 * CLASIFICACIÓN: SERVICE LAYER (ESTRATO L4)
 * RESPONSABILIDAD: DESPACHO PUSH AUTENTICADO CON LIBRO MAYOR IDEMPOTENTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ID BEFORE UPLINK: El 'request_id' (UUIDv4) nace en el servidor
 *    antes de cualquier llamada externa; una réplica con el mismo id
 *    retorna la fila previa y el proveedor se invoca a lo sumo una vez.
 * 2. LEDGER AFTER UPLINK: La fila se sella DESPUÉS de la respuesta del
 *    proveedor; una cancelación en vuelo no deja fila y el re-despacho
 *    con el mismo id es seguro por construcción.
 * 3. NO RETRIES HERE: 4xx se registra como fallo sin reintento; 5xx y
 *    timeout se registran y emiten métrica — la política de reintentos
 *    vive en el controlador de despliegues, a granularidad de lote.
 * =================================================================
 */

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use warden_domain_models::command::{CommandAction, CommandRecord, DispatchStatus};
use warden_domain_models::deployment::ApkVersion;
use warden_domain_models::device::Device;
use warden_infra_db::repositories::{ApkRepository, CommandLedgerRepository, DeviceRepository};
use warden_infra_db::DbError;
use warden_infra_push::{FcmClient, PushError};
use warden_shared_argus::metrics::MetricsRegistry;

use crate::signing::{canonical_json_string, compute_command_hmac};

#[derive(Error, Debug)]
pub enum DispatchError {
    /// El proveedor push no está configurado en este despliegue.
    #[error("[L4_DISPATCH_FAULT]: PROVIDER_UNAVAILABLE -> {0}")]
    ProviderUnavailable(String),

    /// El dispositivo no es direccionable (sin token FCM o revocado).
    #[error("[L4_DISPATCH_FAULT]: DEVICE_NOT_ADDRESSABLE -> {0}")]
    DeviceNotAddressable(String),

    /// Colapso de transporte: desenlace desconocido, sin fila de ledger.
    #[error("[L4_DISPATCH_FAULT]: UPLINK_SEVERED -> {0}")]
    UplinkSevered(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Veredicto de un despacho individual para la respuesta agregada.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchVerdict {
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    pub status: String,
}

/**
 * Despachador de mandos de la flota. Una instancia vive en el AppState
 * y es compartida por handlers, centinela y controlador de despliegues.
 */
pub struct CommandDispatcher {
    ledger_repository: Arc<CommandLedgerRepository>,
    device_repository: Arc<DeviceRepository>,
    apk_repository: Arc<ApkRepository>,
    push_client: Option<Arc<FcmClient>>,
    metrics: Arc<MetricsRegistry>,
    hmac_secret: String,
    server_url: String,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(
        ledger_repository: Arc<CommandLedgerRepository>,
        device_repository: Arc<DeviceRepository>,
        apk_repository: Arc<ApkRepository>,
        push_client: Option<Arc<FcmClient>>,
        metrics: Arc<MetricsRegistry>,
        hmac_secret: String,
        server_url: String,
    ) -> Self {
        Self {
            ledger_repository,
            device_repository,
            apk_repository,
            push_client,
            metrics,
            hmac_secret,
            server_url,
        }
    }

    fn hash_data_payload(data_payload: &HashMap<String, String>) -> String {
        let canonical_payload = canonical_json_string(
            &serde_json::to_value(data_payload).unwrap_or(serde_json::Value::Null),
        );
        hex::encode(Sha256::digest(canonical_payload.as_bytes()))
    }

    /**
     * Despacha una acción a un dispositivo con el protocolo completo:
     * réplica idempotente → payload firmado → uplink → sellado de ledger.
     *
     * # Errors:
     * - `DispatchError::UplinkSevered`: timeout o colapso de red. NO se
     *   selló fila; re-despachar con el mismo 'request_id' es seguro.
     * - Violación de divergencia de ledger: fatal por contrato, el
     *   proceso termina tras el volcado forense.
     */
    #[instrument(skip(self, target_device, extra_data), fields(device = %target_device.id, action = %action.as_str()))]
    pub async fn dispatch(
        &self,
        target_device: &Device,
        action: CommandAction,
        extra_data: HashMap<String, String>,
        explicit_request_id: Option<Uuid>,
    ) -> Result<CommandRecord, DispatchError> {
        let request_identifier = explicit_request_id.unwrap_or_else(Uuid::new_v4);

        // --- FASE 1: RÉPLICA IDEMPOTENTE ---
        // Un id ya sellado retorna su fila sin tocar el proveedor.
        if let Some(prior_record) = self.ledger_repository.fetch_by_request_id(request_identifier).await? {
            info!("⚪ [DISPATCH_REPLAY]: Request {} already sealed; provider untouched.", request_identifier);
            return Ok(prior_record);
        }

        let push_client = self.push_client.as_ref().ok_or_else(|| {
            DispatchError::ProviderUnavailable("push credentials not configured".to_string())
        })?;

        let device_fcm_token = target_device
            .fcm_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DispatchError::DeviceNotAddressable(target_device.id.clone()))?;

        if target_device.token_revoked_at.is_some() {
            return Err(DispatchError::DeviceNotAddressable(format!("{} (revoked)", target_device.id)));
        }

        // --- FASE 2: PAYLOAD FIRMADO ---
        let issued_at = Utc::now();
        let timestamp_wire = issued_at.to_rfc3339();
        let command_signature = compute_command_hmac(
            &self.hmac_secret,
            &request_identifier.to_string(),
            &target_device.id,
            action.as_str(),
            &timestamp_wire,
        );

        let mut data_payload: HashMap<String, String> = HashMap::from([
            ("action".to_string(), action.as_str().to_string()),
            ("request_id".to_string(), request_identifier.to_string()),
            ("device_id".to_string(), target_device.id.clone()),
            ("ts".to_string(), timestamp_wire),
            ("hmac".to_string(), command_signature),
        ]);
        data_payload.extend(extra_data);

        let payload_hash = Self::hash_data_payload(&data_payload);

        // --- FASE 3: UPLINK (desenlace desconocido = sin fila) ---
        let uplink_started = std::time::Instant::now();
        let provider_response = match push_client.send_data_message(device_fcm_token, &data_payload).await {
            Ok(response) => response,
            Err(PushError::Transport(transport_fault)) => {
                self.metrics.inc_counter(
                    "push_provider_failures_total",
                    &[("reason", "transport"), ("action", action.as_str())],
                );
                warn!(
                    "❌ [UPLINK_SEVERED]: Request {} outcome unknown; ledger untouched. {}",
                    request_identifier, transport_fault
                );
                return Err(DispatchError::UplinkSevered(transport_fault.to_string()));
            }
            Err(provider_fault) => {
                return Err(DispatchError::ProviderUnavailable(provider_fault.to_string()))
            }
        };
        let uplink_latency_ms = uplink_started.elapsed().as_millis() as i64;

        // --- FASE 4: SELLADO DEL LIBRO MAYOR ---
        let dispatch_status = if provider_response.is_success() {
            DispatchStatus::Sent
        } else {
            if provider_response.http_code >= 500 {
                self.metrics.inc_counter(
                    "push_provider_failures_total",
                    &[("reason", "server_error"), ("action", action.as_str())],
                );
            }
            DispatchStatus::Failed
        };

        let forged_record = CommandRecord {
            request_id: request_identifier,
            device_id: target_device.id.clone(),
            action,
            ts_issued: issued_at,
            payload_hash,
            http_code: Some(i32::from(provider_response.http_code)),
            provider_message_id: provider_response.provider_message_id.clone(),
            latency_ms: Some(uplink_latency_ms),
            status: dispatch_status,
        };

        let sealed_record = match self.ledger_repository.record_dispatch(&forged_record).await {
            Ok(record) => record,
            Err(ledger_fault) if ledger_fault.is_process_invariant_violation() => {
                error!("💀 [LEDGER_COLLAPSE]: {}", ledger_fault);
                std::process::exit(1);
            }
            Err(ledger_fault) => return Err(DispatchError::Db(ledger_fault)),
        };

        self.metrics.inc_counter(
            "commands_dispatched_total",
            &[("action", action.as_str()), ("status", sealed_record.status.as_str())],
        );
        self.metrics.observe_histogram(
            "push_dispatch_latency_ms",
            &[("action", action.as_str())],
            uplink_latency_ms as f64,
        );

        // Correlación de ping para el radar de latencia de la flota.
        if action == CommandAction::Ping && sealed_record.status == DispatchStatus::Sent {
            self.device_repository
                .record_ping_sent(&target_device.id, &request_identifier.to_string(), issued_at)
                .await?;
        }

        info!(
            "🚀 [DISPATCH_SEALED]: {} -> {} [{}] HTTP {} in {}ms.",
            action.as_str(),
            target_device.id,
            sealed_record.status.as_str(),
            provider_response.http_code,
            uplink_latency_ms
        );
        Ok(sealed_record)
    }

    /**
     * Despacho de instalación APK: abre el rastro de instalación y
     * embarca la URL firmable de descarga junto al sha256 del artefacto.
     */
    #[instrument(skip(self, target_device, apk_version), fields(device = %target_device.id, apk = apk_version.id))]
    pub async fn dispatch_install(
        &self,
        target_device: &Device,
        apk_version: &ApkVersion,
        initiated_by: Option<&str>,
        deployment_run_id: Option<i64>,
        deployment_batch_id: Option<i64>,
    ) -> Result<CommandRecord, DispatchError> {
        let request_identifier = Uuid::new_v4();

        let opened_installation = self
            .apk_repository
            .open_installation(
                &target_device.id,
                apk_version.id,
                request_identifier,
                initiated_by,
                deployment_run_id,
                deployment_batch_id,
            )
            .await?;

        let install_data: HashMap<String, String> = HashMap::from([
            ("installation_id".to_string(), opened_installation.id.to_string()),
            ("apk_id".to_string(), apk_version.id.to_string()),
            ("version_name".to_string(), apk_version.version_name.clone()),
            ("version_code".to_string(), apk_version.version_code.to_string()),
            ("file_size".to_string(), apk_version.file_size.to_string()),
            ("package_name".to_string(), apk_version.package_name.clone()),
            ("download_url".to_string(), format!("{}/v1/apk/download/{}", self.server_url, apk_version.id)),
            ("sha256".to_string(), apk_version.sha256.clone().unwrap_or_default()),
        ]);

        self.dispatch(target_device, CommandAction::InstallApk, install_data, Some(request_identifier))
            .await
    }

    /**
     * Fan-out de un mando administrativo sobre un conjunto de
     * dispositivos. Los fallos por dispositivo se agregan, jamás
     * abortan el resto de la ráfaga.
     */
    #[instrument(skip(self, device_identifiers, extra_data), fields(devices = device_identifiers.len()))]
    pub async fn dispatch_bulk(
        &self,
        device_identifiers: &[String],
        action: CommandAction,
        extra_data: HashMap<String, String>,
    ) -> Result<Vec<DispatchVerdict>, DispatchError> {
        let addressable_devices = self.device_repository.list_push_addressable(device_identifiers).await?;

        let mut dispatch_verdicts = Vec::with_capacity(device_identifiers.len());

        for target_device in &addressable_devices {
            let verdict = match self.dispatch(target_device, action, extra_data.clone(), None).await {
                Ok(sealed_record) => DispatchVerdict {
                    device_id: target_device.id.clone(),
                    request_id: Some(sealed_record.request_id),
                    status: sealed_record.status.as_str().to_string(),
                },
                Err(dispatch_fault) => {
                    warn!("⚠️  [BULK_DISPATCH]: Device {} skipped: {}", target_device.id, dispatch_fault);
                    DispatchVerdict {
                        device_id: target_device.id.clone(),
                        request_id: None,
                        status: "failed".to_string(),
                    }
                }
            };
            dispatch_verdicts.push(verdict);
        }

        // Los no-direccionables también se reportan en el veredicto agregado.
        for requested_identifier in device_identifiers {
            if !dispatch_verdicts.iter().any(|verdict| &verdict.device_id == requested_identifier) {
                dispatch_verdicts.push(DispatchVerdict {
                    device_id: requested_identifier.clone(),
                    request_id: None,
                    status: "not_addressable".to_string(),
                });
            }
        }

        Ok(dispatch_verdicts)
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/command_dispatcher.rs]
