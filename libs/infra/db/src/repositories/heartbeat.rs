// [libs/infra/db/src/repositories/heartbeat.rs]
/*!
 * =================================================================
 * APARATO: HEARTBEAT INGESTION REPOSITORY (V12.0 - PULSE LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: APPEND DEDUPLICADO Y PROYECCIÓN CALIENTE MONÓTONA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BUCKET DEDUPE: El índice único por-partición (dispositivo, minuto,
 *    ranura de 10s) absorbe duplicados en silencio; el conflicto jamás
 *    aflora como error al camino de la petición.
 * 2. MONOTONE PROJECTION: 'device_last_status.last_ts' sólo avanza;
 *    un upsert con marca temporal más vieja es un no-op certificado.
 * 3. RECONCILIATION READY: La reparación de la proyección replays las
 *    últimas 24h del log con DISTINCT ON, idempotente y reentrante.
 *
 * # Mathematical Proof (Dual-Write Convergence):
 * Sea L el log y P la proyección. Toda escritura aplica L∪{s} y luego
 * P[s.device] = max(P[s.device], s.ts). La reconciliación recalcula
 * P' = max por dispositivo sobre L(24h) con la misma función de orden,
 * por lo que P converge a P' bajo cualquier intercalado de fallos.
 * =================================================================
 */

use crate::errors::DbError;
use crate::PgClient;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use tracing::{debug, instrument};
use warden_domain_models::device::DeviceLastStatus;
use warden_domain_models::heartbeat::HeartbeatSample;

/// Autoridad única sobre el log particionado y su proyección caliente.
pub struct HeartbeatRepository {
    database_client: PgClient,
}

/// Fila del radar de dispositivos fuera de línea (lectura rápida).
#[derive(Debug, Clone, serde::Serialize)]
pub struct OfflineDeviceRow {
    pub device_id: String,
    pub alias: String,
    pub last_seen: DateTime<Utc>,
    pub offline_seconds: i64,
}

fn map_last_status_row(status_row: &PgRow) -> Result<DeviceLastStatus, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("LAST_STATUS_ROW_DECODE: {}", fault));
    Ok(DeviceLastStatus {
        device_id: status_row.try_get("device_id").map_err(map_fault)?,
        last_ts: status_row.try_get("last_ts").map_err(map_fault)?,
        battery_pct: status_row.try_get("battery_pct").map_err(map_fault)?,
        network_type: status_row.try_get("network_type").map_err(map_fault)?,
        ssid: status_row.try_get("ssid").map_err(map_fault)?,
        unity_running: status_row.try_get("unity_running").map_err(map_fault)?,
        signal_dbm: status_row.try_get("signal_dbm").map_err(map_fault)?,
        agent_version: status_row.try_get("agent_version").map_err(map_fault)?,
        ip: status_row.try_get("ip").map_err(map_fault)?,
        status: status_row.try_get("status").map_err(map_fault)?,
    })
}

const LAST_STATUS_COLUMNS: &str =
    "device_id, last_ts, battery_pct, network_type, ssid, unity_running, signal_dbm, agent_version, ip, status";

impl HeartbeatRepository {
    #[must_use]
    pub fn new(database_client: PgClient) -> Self {
        Self { database_client }
    }

    /**
     * Inserta una muestra en el log particionado.
     * Un duplicado dentro del mismo cubo de 10s se descarta en silencio.
     *
     * @returns 'true' si la fila se cristalizó; 'false' si el cubo ya
     * contenía un pulso del dispositivo.
     */
    #[instrument(skip(self, sample), fields(device = %sample.device_id))]
    pub async fn append_deduped(&self, sample: &HeartbeatSample) -> Result<bool, DbError> {
        let insert_result = sqlx::query(
            "INSERT INTO device_heartbeats (
                device_id, ts, ip, status, battery_pct, plugged,
                network_type, ssid, signal_dbm, unity_running, agent_version
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT DO NOTHING",
        )
        .bind(&sample.device_id)
        .bind(sample.ts)
        .bind(&sample.ip)
        .bind(&sample.status)
        .bind(sample.battery_pct)
        .bind(sample.plugged)
        .bind(&sample.network_type)
        .bind(&sample.ssid)
        .bind(sample.signal_dbm)
        .bind(sample.unity_running)
        .bind(&sample.agent_version)
        .execute(self.database_client.pool())
        .await?;

        let row_crystallized = insert_result.rows_affected() > 0;
        if !row_crystallized {
            debug!("⚪ [BUCKET_DEDUPE]: Pulse for {} swallowed by 10s bucket.", sample.device_id);
        }
        Ok(row_crystallized)
    }

    /**
     * Upsert estrictamente monótono de la proyección caliente.
     *
     * @returns 'true' si la proyección avanzó; 'false' si la muestra era
     * más vieja que 'last_ts' vigente (no-op por contrato).
     */
    #[instrument(skip(self, sample), fields(device = %sample.device_id))]
    pub async fn upsert_last_status(&self, sample: &HeartbeatSample) -> Result<bool, DbError> {
        let upsert_result = sqlx::query(
            "INSERT INTO device_last_status (
                device_id, last_ts, battery_pct, network_type, ssid,
                unity_running, signal_dbm, agent_version, ip, status
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (device_id) DO UPDATE SET
                last_ts = EXCLUDED.last_ts,
                battery_pct = EXCLUDED.battery_pct,
                network_type = EXCLUDED.network_type,
                ssid = EXCLUDED.ssid,
                unity_running = EXCLUDED.unity_running,
                signal_dbm = EXCLUDED.signal_dbm,
                agent_version = EXCLUDED.agent_version,
                ip = EXCLUDED.ip,
                status = EXCLUDED.status
             WHERE EXCLUDED.last_ts > device_last_status.last_ts",
        )
        .bind(&sample.device_id)
        .bind(sample.ts)
        .bind(sample.battery_pct)
        .bind(&sample.network_type)
        .bind(&sample.ssid)
        .bind(sample.unity_running)
        .bind(sample.signal_dbm)
        .bind(&sample.agent_version)
        .bind(&sample.ip)
        .bind(&sample.status)
        .execute(self.database_client.pool())
        .await?;

        Ok(upsert_result.rows_affected() > 0)
    }

    /// Lectura O(1) de la proyección por llave primaria.
    pub async fn fetch_last_status(&self, device_identifier: &str) -> Result<Option<DeviceLastStatus>, DbError> {
        let status_row = sqlx::query(&format!(
            "SELECT {} FROM device_last_status WHERE device_id = $1",
            LAST_STATUS_COLUMNS
        ))
        .bind(device_identifier)
        .fetch_optional(self.database_client.pool())
        .await?;

        status_row.as_ref().map(map_last_status_row).transpose()
    }

    /// Lectura por lotes de la proyección (cláusula ANY).
    pub async fn fetch_statuses_for(&self, device_identifiers: &[String]) -> Result<Vec<DeviceLastStatus>, DbError> {
        if device_identifiers.is_empty() {
            return Ok(Vec::new());
        }
        let status_rows = sqlx::query(&format!(
            "SELECT {} FROM device_last_status WHERE device_id = ANY($1)",
            LAST_STATUS_COLUMNS
        ))
        .bind(device_identifiers)
        .fetch_all(self.database_client.pool())
        .await?;

        status_rows.iter().map(map_last_status_row).collect()
    }

    /// Proyección completa de la flota para la pasada del centinela.
    pub async fn fetch_all_last_statuses(&self) -> Result<Vec<DeviceLastStatus>, DbError> {
        let status_rows = sqlx::query(&format!("SELECT {} FROM device_last_status", LAST_STATUS_COLUMNS))
            .fetch_all(self.database_client.pool())
            .await?;

        status_rows.iter().map(map_last_status_row).collect()
    }

    /**
     * Radar de caídos vía proyección: índice (last_ts, status).
     * O(k) sobre los dispositivos rezagados, sin escanear el log.
     */
    pub async fn offline_devices_fast(&self, cutoff_ts: DateTime<Utc>) -> Result<Vec<OfflineDeviceRow>, DbError> {
        let offline_rows = sqlx::query(
            "SELECT d.id AS device_id, d.alias, s.last_ts AS last_seen,
                    CAST(EXTRACT(EPOCH FROM (NOW() - s.last_ts)) AS BIGINT) AS offline_seconds
             FROM device_last_status s
             JOIN devices d ON d.id = s.device_id
             WHERE s.last_ts < $1
             ORDER BY s.last_ts ASC",
        )
        .bind(cutoff_ts)
        .fetch_all(self.database_client.pool())
        .await?;

        offline_rows
            .iter()
            .map(|offline_row| {
                let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("OFFLINE_ROW_DECODE: {}", fault));
                Ok(OfflineDeviceRow {
                    device_id: offline_row.try_get("device_id").map_err(map_fault)?,
                    alias: offline_row.try_get("alias").map_err(map_fault)?,
                    last_seen: offline_row.try_get("last_seen").map_err(map_fault)?,
                    offline_seconds: offline_row.try_get("offline_seconds").map_err(map_fault)?,
                })
            })
            .collect()
    }

    /**
     * Camino legado: última muestra por escaneo del log particionado.
     * Se conserva tras la bandera 'READ_FROM_LAST_STATUS' para el arnés
     * de comparación de rendimiento.
     */
    pub async fn legacy_latest_sample(&self, device_identifier: &str) -> Result<Option<DeviceLastStatus>, DbError> {
        let sample_row = sqlx::query(
            "SELECT device_id, ts AS last_ts, battery_pct, network_type, ssid,
                    unity_running, signal_dbm, agent_version, ip, status
             FROM device_heartbeats
             WHERE device_id = $1
             ORDER BY ts DESC
             LIMIT 1",
        )
        .bind(device_identifier)
        .fetch_optional(self.database_client.pool())
        .await?;

        sample_row.as_ref().map(map_last_status_row).transpose()
    }

    /**
     * Reparación de la proyección desde el log reciente.
     * Debe ejecutarse sobre la sesión que sostiene el advisory lock.
     *
     * @returns filas de la proyección efectivamente avanzadas.
     */
    #[instrument(skip(self, locked_session))]
    pub async fn reconcile_last_status(
        &self,
        locked_session: &mut PgConnection,
        cutoff_ts: DateTime<Utc>,
        max_rows: i64,
    ) -> Result<u64, DbError> {
        let repair_result = sqlx::query(
            "WITH latest_heartbeats AS (
                SELECT DISTINCT ON (device_id)
                    device_id, ts AS last_ts, battery_pct, network_type, ssid,
                    unity_running, signal_dbm, agent_version, ip, status
                FROM device_heartbeats
                WHERE ts >= $1
                ORDER BY device_id, ts DESC
                LIMIT $2
            )
            INSERT INTO device_last_status (
                device_id, last_ts, battery_pct, network_type, ssid,
                unity_running, signal_dbm, agent_version, ip, status
            )
            SELECT device_id, last_ts, battery_pct, network_type, ssid,
                   unity_running, signal_dbm, agent_version, ip, status
            FROM latest_heartbeats
            ON CONFLICT (device_id) DO UPDATE SET
                last_ts = EXCLUDED.last_ts,
                battery_pct = EXCLUDED.battery_pct,
                network_type = EXCLUDED.network_type,
                ssid = EXCLUDED.ssid,
                unity_running = EXCLUDED.unity_running,
                signal_dbm = EXCLUDED.signal_dbm,
                agent_version = EXCLUDED.agent_version,
                ip = EXCLUDED.ip,
                status = EXCLUDED.status
            WHERE EXCLUDED.last_ts > device_last_status.last_ts",
        )
        .bind(cutoff_ts)
        .bind(max_rows)
        .execute(locked_session)
        .await?;

        Ok(repair_result.rows_affected())
    }

    /// Purga del historial de latidos de un dispositivo (fan-out del Reaper).
    pub async fn delete_for_device(&self, device_identifier: &str) -> Result<u64, DbError> {
        let deletion_result = sqlx::query("DELETE FROM device_heartbeats WHERE device_id = $1")
            .bind(device_identifier)
            .execute(self.database_client.pool())
            .await?;
        Ok(deletion_result.rows_affected())
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/heartbeat.rs]
