// [libs/infra/db/src/repositories/device.rs]
/*!
 * =================================================================
 * APARATO: FLEET DEVICE REPOSITORY (V10.2 - IDENTITY AUTHORITY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO, BÚSQUEDA POR HUELLA Y REVOCACIÓN SUAVE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL LOOKUP: Búsqueda primaria por huella SHA-256 indexada;
 *    escaneo legado sólo para dispositivos sin huella, con backfill
 *    inmediato tras la verificación bcrypt del llamador.
 * 2. SOFT REVOCATION: Los dispositivos jamás se eliminan; el sello
 *    'token_revoked_at' inhabilita el token preservando el historial.
 * 3. SWALLOWED CONFLICTS: El enrolamiento duplicado retorna la fila
 *    existente sin efecto colateral.
 * =================================================================
 */

use crate::errors::DbError;
use crate::PgClient;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::{debug, instrument};
use warden_domain_models::device::Device;
use warden_domain_models::heartbeat::HeartbeatPayload;

/// Autoridad única sobre la tabla 'devices'.
pub struct DeviceRepository {
    database_client: PgClient,
}

/// Columnas canónicas proyectadas en toda lectura de dispositivo.
const DEVICE_COLUMNS: &str = "id, alias, app_version, token_hash, token_fingerprint, fcm_token, \
     created_at, last_seen, model, manufacturer, android_version, sdk_int, build_id, \
     is_device_owner, monitored_package, monitored_app_name, monitor_threshold_min, \
     monitor_enabled, auto_relaunch_enabled, last_ping_sent, last_ping_response, \
     ping_request_id, token_revoked_at";

pub(crate) fn map_device_row(device_row: &PgRow) -> Result<Device, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("DEVICE_ROW_DECODE: {}", fault));
    Ok(Device {
        id: device_row.try_get("id").map_err(map_fault)?,
        alias: device_row.try_get("alias").map_err(map_fault)?,
        app_version: device_row.try_get("app_version").map_err(map_fault)?,
        token_hash: device_row.try_get("token_hash").map_err(map_fault)?,
        token_fingerprint: device_row.try_get("token_fingerprint").map_err(map_fault)?,
        fcm_token: device_row.try_get("fcm_token").map_err(map_fault)?,
        created_at: device_row.try_get("created_at").map_err(map_fault)?,
        last_seen: device_row.try_get("last_seen").map_err(map_fault)?,
        model: device_row.try_get("model").map_err(map_fault)?,
        manufacturer: device_row.try_get("manufacturer").map_err(map_fault)?,
        android_version: device_row.try_get("android_version").map_err(map_fault)?,
        sdk_int: device_row.try_get("sdk_int").map_err(map_fault)?,
        build_id: device_row.try_get("build_id").map_err(map_fault)?,
        is_device_owner: device_row.try_get("is_device_owner").map_err(map_fault)?,
        monitored_package: device_row.try_get("monitored_package").map_err(map_fault)?,
        monitored_app_name: device_row.try_get("monitored_app_name").map_err(map_fault)?,
        monitor_threshold_min: device_row.try_get("monitor_threshold_min").map_err(map_fault)?,
        monitor_enabled: device_row.try_get("monitor_enabled").map_err(map_fault)?,
        auto_relaunch_enabled: device_row.try_get("auto_relaunch_enabled").map_err(map_fault)?,
        last_ping_sent: device_row.try_get("last_ping_sent").map_err(map_fault)?,
        last_ping_response: device_row.try_get("last_ping_response").map_err(map_fault)?,
        ping_request_id: device_row.try_get("ping_request_id").map_err(map_fault)?,
        token_revoked_at: device_row.try_get("token_revoked_at").map_err(map_fault)?,
    })
}

impl DeviceRepository {
    #[must_use]
    pub fn new(database_client: PgClient) -> Self {
        Self { database_client }
    }

    /**
     * Enrola un dispositivo nuevo en la flota.
     * Un enrolamiento duplicado (mismo id) se traga: retorna la fila previa.
     */
    #[instrument(skip(self, token_hash, token_fingerprint))]
    pub async fn enroll_device(
        &self,
        device_identifier: &str,
        alias: &str,
        token_hash: &str,
        token_fingerprint: &str,
    ) -> Result<Device, DbError> {
        sqlx::query(
            "INSERT INTO devices (id, alias, token_hash, token_fingerprint)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(device_identifier)
        .bind(alias)
        .bind(token_hash)
        .bind(token_fingerprint)
        .execute(self.database_client.pool())
        .await?;

        self.find_by_id(device_identifier).await?.ok_or(DbError::DeviceNotFound)
    }

    pub async fn find_by_id(&self, device_identifier: &str) -> Result<Option<Device>, DbError> {
        let device_row = sqlx::query(&format!("SELECT {} FROM devices WHERE id = $1", DEVICE_COLUMNS))
            .bind(device_identifier)
            .fetch_optional(self.database_client.pool())
            .await?;

        device_row.as_ref().map(map_device_row).transpose()
    }

    /// Búsqueda O(1) por huella SHA-256 del token (índice único).
    pub async fn find_by_fingerprint(&self, token_fingerprint: &str) -> Result<Option<Device>, DbError> {
        let device_row = sqlx::query(&format!(
            "SELECT {} FROM devices WHERE token_fingerprint = $1",
            DEVICE_COLUMNS
        ))
        .bind(token_fingerprint)
        .fetch_optional(self.database_client.pool())
        .await?;

        device_row.as_ref().map(map_device_row).transpose()
    }

    /// Candidatos del escaneo legado: sin huella y sin revocación.
    pub async fn list_legacy_candidates(&self) -> Result<Vec<Device>, DbError> {
        let candidate_rows = sqlx::query(&format!(
            "SELECT {} FROM devices WHERE token_fingerprint IS NULL AND token_revoked_at IS NULL",
            DEVICE_COLUMNS
        ))
        .fetch_all(self.database_client.pool())
        .await?;

        candidate_rows.iter().map(map_device_row).collect()
    }

    /// Backfill de huella tras una verificación bcrypt exitosa en vía legada.
    #[instrument(skip(self, token_fingerprint))]
    pub async fn backfill_fingerprint(&self, device_identifier: &str, token_fingerprint: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE devices SET token_fingerprint = $2 WHERE id = $1")
            .bind(device_identifier)
            .bind(token_fingerprint)
            .execute(self.database_client.pool())
            .await?;
        debug!("🧬 [FINGERPRINT_BACKFILL]: Device {} migrated to indexed lookup.", device_identifier);
        Ok(())
    }

    /**
     * Refresca la identidad del dispositivo con los campos de un latido:
     * visto por última vez, alias, versión del agente, token FCM y biometría
     * de sistema. La correlación de ping la gestiona el llamador.
     */
    #[instrument(skip(self, payload), fields(device = %device_identifier))]
    pub async fn refresh_from_heartbeat(
        &self,
        device_identifier: &str,
        payload: &HeartbeatPayload,
        observed_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE devices SET
                last_seen = GREATEST(last_seen, $2),
                alias = $3,
                app_version = COALESCE($4, app_version),
                fcm_token = COALESCE($5, fcm_token),
                model = COALESCE($6, model),
                manufacturer = COALESCE($7, manufacturer),
                android_version = COALESCE($8, android_version),
                sdk_int = COALESCE($9, sdk_int),
                build_id = COALESCE($10, build_id),
                is_device_owner = COALESCE($11, is_device_owner)
             WHERE id = $1",
        )
        .bind(device_identifier)
        .bind(observed_at)
        .bind(&payload.alias)
        .bind(&payload.app_version)
        .bind(&payload.fcm_token)
        .bind(&payload.system.model)
        .bind(&payload.system.manufacturer)
        .bind(&payload.system.android_version)
        .bind(payload.system.sdk_int)
        .bind(&payload.system.build_id)
        .bind(payload.is_device_owner)
        .execute(self.database_client.pool())
        .await?;
        Ok(())
    }

    /// Sella el despacho de un ping para la correlación posterior.
    pub async fn record_ping_sent(
        &self,
        device_identifier: &str,
        ping_request_identifier: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE devices SET last_ping_sent = $2, ping_request_id = $3 WHERE id = $1")
            .bind(device_identifier)
            .bind(sent_at)
            .bind(ping_request_identifier)
            .execute(self.database_client.pool())
            .await?;
        Ok(())
    }

    /// Correlaciona la respuesta de ping embarcada en un latido.
    pub async fn record_ping_response(
        &self,
        device_identifier: &str,
        ping_request_identifier: &str,
        responded_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let update_result = sqlx::query(
            "UPDATE devices SET last_ping_response = $2
             WHERE id = $1 AND ping_request_id = $3",
        )
        .bind(device_identifier)
        .bind(responded_at)
        .bind(ping_request_identifier)
        .execute(self.database_client.pool())
        .await?;
        Ok(update_result.rows_affected() > 0)
    }

    /// Actualiza la configuración de monitorización del operador.
    #[instrument(skip(self))]
    pub async fn update_monitor_settings(
        &self,
        device_identifier: &str,
        monitored_package: Option<&str>,
        monitored_app_name: Option<&str>,
        monitor_threshold_min: Option<i32>,
        monitor_enabled: Option<bool>,
        auto_relaunch_enabled: Option<bool>,
    ) -> Result<Device, DbError> {
        sqlx::query(
            "UPDATE devices SET
                monitored_package = COALESCE($2, monitored_package),
                monitored_app_name = COALESCE($3, monitored_app_name),
                monitor_threshold_min = COALESCE($4, monitor_threshold_min),
                monitor_enabled = COALESCE($5, monitor_enabled),
                auto_relaunch_enabled = COALESCE($6, auto_relaunch_enabled)
             WHERE id = $1",
        )
        .bind(device_identifier)
        .bind(monitored_package)
        .bind(monitored_app_name)
        .bind(monitor_threshold_min)
        .bind(monitor_enabled)
        .bind(auto_relaunch_enabled)
        .execute(self.database_client.pool())
        .await?;

        self.find_by_id(device_identifier).await?.ok_or(DbError::DeviceNotFound)
    }

    /// Revocación suave: el token deja de autenticar, la fila persiste.
    #[instrument(skip(self))]
    pub async fn revoke_token(&self, device_identifier: &str, revoked_at: DateTime<Utc>) -> Result<(), DbError> {
        sqlx::query("UPDATE devices SET token_revoked_at = $2 WHERE id = $1")
            .bind(device_identifier)
            .bind(revoked_at)
            .execute(self.database_client.pool())
            .await?;
        Ok(())
    }

    /// Inventario completo de la flota ordenado por alias.
    pub async fn list_fleet(&self) -> Result<Vec<Device>, DbError> {
        let fleet_rows = sqlx::query(&format!(
            "SELECT {} FROM devices WHERE token_revoked_at IS NULL ORDER BY alias",
            DEVICE_COLUMNS
        ))
        .fetch_all(self.database_client.pool())
        .await?;

        fleet_rows.iter().map(map_device_row).collect()
    }

    /// Dispositivos direccionables por push (token FCM presente, no revocados).
    pub async fn list_push_addressable(&self, device_identifiers: &[String]) -> Result<Vec<Device>, DbError> {
        let addressable_rows = sqlx::query(&format!(
            "SELECT {} FROM devices
             WHERE id = ANY($1) AND fcm_token IS NOT NULL AND token_revoked_at IS NULL
             ORDER BY alias",
            DEVICE_COLUMNS
        ))
        .bind(device_identifiers)
        .fetch_all(self.database_client.pool())
        .await?;

        addressable_rows.iter().map(map_device_row).collect()
    }

    /// Purga selecciones transitorias expiradas del tablero del operador.
    pub async fn delete_expired_selections(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let deletion_result = sqlx::query("DELETE FROM device_selections WHERE expires_at < $1")
            .bind(now)
            .execute(self.database_client.pool())
            .await?;
        Ok(deletion_result.rows_affected())
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/device.rs]
