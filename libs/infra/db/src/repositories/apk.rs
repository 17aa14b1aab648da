// [libs/infra/db/src/repositories/apk.rs]
/*!
 * =================================================================
 * APARATO: APK VERSION & INSTALLATION REPOSITORY (V8.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CATÁLOGO DE ARTEFACTOS Y TELEMETRÍA DE DESCARGA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. VERSION UNIQUENESS: (package_name, version_code) es único; una
 *    resubida idéntica retorna la fila previa sin duplicar.
 * 2. DOWNLOAD TELEMETRY: Cada instalación captura ventana de descarga,
 *    bytes y velocidad para el radar de despliegues.
 * =================================================================
 */

use crate::errors::DbError;
use crate::PgClient;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;
use warden_domain_models::deployment::{ApkInstallation, ApkVersion};

/// Autoridad única sobre 'apk_versions' y 'apk_installations'.
pub struct ApkRepository {
    database_client: PgClient,
}

fn map_version_row(version_row: &PgRow) -> Result<ApkVersion, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("APK_VERSION_ROW_DECODE: {}", fault));
    Ok(ApkVersion {
        id: version_row.try_get("id").map_err(map_fault)?,
        package_name: version_row.try_get("package_name").map_err(map_fault)?,
        version_code: version_row.try_get("version_code").map_err(map_fault)?,
        version_name: version_row.try_get("version_name").map_err(map_fault)?,
        file_path: version_row.try_get("file_path").map_err(map_fault)?,
        file_size: version_row.try_get("file_size").map_err(map_fault)?,
        sha256: version_row.try_get("sha256").map_err(map_fault)?,
        is_active: version_row.try_get("is_active").map_err(map_fault)?,
        uploaded_at: version_row.try_get("uploaded_at").map_err(map_fault)?,
        uploaded_by: version_row.try_get("uploaded_by").map_err(map_fault)?,
    })
}

fn map_installation_row(installation_row: &PgRow) -> Result<ApkInstallation, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("INSTALLATION_ROW_DECODE: {}", fault));
    Ok(ApkInstallation {
        id: installation_row.try_get("id").map_err(map_fault)?,
        device_id: installation_row.try_get("device_id").map_err(map_fault)?,
        apk_version_id: installation_row.try_get("apk_version_id").map_err(map_fault)?,
        status: installation_row.try_get("status").map_err(map_fault)?,
        initiated_at: installation_row.try_get("initiated_at").map_err(map_fault)?,
        completed_at: installation_row.try_get("completed_at").map_err(map_fault)?,
        error_message: installation_row.try_get("error_message").map_err(map_fault)?,
        initiated_by: installation_row.try_get("initiated_by").map_err(map_fault)?,
        deployment_run_id: installation_row.try_get("deployment_run_id").map_err(map_fault)?,
        deployment_batch_id: installation_row.try_get("deployment_batch_id").map_err(map_fault)?,
        download_start: installation_row.try_get("download_start").map_err(map_fault)?,
        download_end: installation_row.try_get("download_end").map_err(map_fault)?,
        bytes_downloaded: installation_row.try_get("bytes_downloaded").map_err(map_fault)?,
        download_speed_kbps: installation_row.try_get("download_speed_kbps").map_err(map_fault)?,
    })
}

const VERSION_COLUMNS: &str = "id, package_name, version_code, version_name, file_path, \
     file_size, sha256, is_active, uploaded_at, uploaded_by";

const INSTALLATION_COLUMNS: &str = "id, device_id, apk_version_id, status, initiated_at, \
     completed_at, error_message, initiated_by, deployment_run_id, deployment_batch_id, \
     download_start, download_end, bytes_downloaded, download_speed_kbps";

impl ApkRepository {
    #[must_use]
    pub fn new(database_client: PgClient) -> Self {
        Self { database_client }
    }

    /**
     * Registra una versión APK en el catálogo.
     * La resubida de (package_name, version_code) se traga y retorna la
     * fila existente.
     */
    #[instrument(skip(self, file_path, sha256))]
    pub async fn register_version(
        &self,
        package_name: &str,
        version_code: i64,
        version_name: &str,
        file_path: &str,
        file_size: i64,
        sha256: Option<&str>,
        uploaded_by: Option<&str>,
    ) -> Result<ApkVersion, DbError> {
        sqlx::query(
            "INSERT INTO apk_versions (
                package_name, version_code, version_name, file_path, file_size, sha256, uploaded_by
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT ON CONSTRAINT uq_package_version DO NOTHING",
        )
        .bind(package_name)
        .bind(version_code)
        .bind(version_name)
        .bind(file_path)
        .bind(file_size)
        .bind(sha256)
        .bind(uploaded_by)
        .execute(self.database_client.pool())
        .await?;

        let version_row = sqlx::query(&format!(
            "SELECT {} FROM apk_versions WHERE package_name = $1 AND version_code = $2",
            VERSION_COLUMNS
        ))
        .bind(package_name)
        .bind(version_code)
        .fetch_one(self.database_client.pool())
        .await?;

        map_version_row(&version_row)
    }

    pub async fn fetch_version(&self, version_identifier: i64) -> Result<Option<ApkVersion>, DbError> {
        let version_row = sqlx::query(&format!("SELECT {} FROM apk_versions WHERE id = $1", VERSION_COLUMNS))
            .bind(version_identifier)
            .fetch_optional(self.database_client.pool())
            .await?;

        version_row.as_ref().map(map_version_row).transpose()
    }

    pub async fn list_versions(&self) -> Result<Vec<ApkVersion>, DbError> {
        let version_rows = sqlx::query(&format!(
            "SELECT {} FROM apk_versions ORDER BY uploaded_at DESC",
            VERSION_COLUMNS
        ))
        .fetch_all(self.database_client.pool())
        .await?;

        version_rows.iter().map(map_version_row).collect()
    }

    /// Abre el rastro de una instalación despachada (manual o por corrida).
    #[instrument(skip(self))]
    pub async fn open_installation(
        &self,
        device_identifier: &str,
        apk_version_identifier: i64,
        request_identifier: Uuid,
        initiated_by: Option<&str>,
        deployment_run_identifier: Option<i64>,
        deployment_batch_identifier: Option<i64>,
    ) -> Result<ApkInstallation, DbError> {
        let installation_row = sqlx::query(&format!(
            "INSERT INTO apk_installations (
                device_id, apk_version_id, request_id, status, initiated_by,
                deployment_run_id, deployment_batch_id
             )
             VALUES ($1, $2, $3, 'pending', $4, $5, $6)
             RETURNING {}",
            INSTALLATION_COLUMNS
        ))
        .bind(device_identifier)
        .bind(apk_version_identifier)
        .bind(request_identifier)
        .bind(initiated_by)
        .bind(deployment_run_identifier)
        .bind(deployment_batch_identifier)
        .fetch_one(self.database_client.pool())
        .await?;

        map_installation_row(&installation_row)
    }

    /// Localiza la instalación correlacionada a un mando despachado.
    pub async fn find_installation_by_request(
        &self,
        request_identifier: Uuid,
    ) -> Result<Option<ApkInstallation>, DbError> {
        let installation_row = sqlx::query(&format!(
            "SELECT {} FROM apk_installations WHERE request_id = $1",
            INSTALLATION_COLUMNS
        ))
        .bind(request_identifier)
        .fetch_optional(self.database_client.pool())
        .await?;

        installation_row.as_ref().map(map_installation_row).transpose()
    }

    /// Sella el desenlace reportado por el agente para una instalación.
    pub async fn close_installation(
        &self,
        installation_identifier: i64,
        final_status: &str,
        completed_at: DateTime<Utc>,
        error_message: Option<&str>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE apk_installations SET status = $2, completed_at = $3, error_message = $4
             WHERE id = $1 AND completed_at IS NULL",
        )
        .bind(installation_identifier)
        .bind(final_status)
        .bind(completed_at)
        .bind(error_message)
        .execute(self.database_client.pool())
        .await?;
        Ok(())
    }

    /// Registra la telemetría de descarga observada por el gateway de APKs.
    pub async fn record_download_telemetry(
        &self,
        installation_identifier: i64,
        download_start: DateTime<Utc>,
        download_end: DateTime<Utc>,
        bytes_downloaded: i64,
        download_speed_kbps: i64,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE apk_installations SET
                download_start = $2, download_end = $3,
                bytes_downloaded = $4, download_speed_kbps = $5
             WHERE id = $1",
        )
        .bind(installation_identifier)
        .bind(download_start)
        .bind(download_end)
        .bind(bytes_downloaded)
        .bind(download_speed_kbps)
        .execute(self.database_client.pool())
        .await?;
        Ok(())
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/apk.rs]
