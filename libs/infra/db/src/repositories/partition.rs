// [libs/infra/db/src/repositories/partition.rs]
/*!
 * =================================================================
 * APARATO: PARTITION LIFECYCLE REPOSITORY (V9.1 - CHRONO CUSTODIAN)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: VENTANA DE PARTICIONES DIARIAS Y CICLO DE VIDA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WINDOW ENFORCEMENT: Garantiza una hija física por cada día en
 *    [hoy − 90d, hoy + 14d], con índices de aceleración y el índice
 *    único de deduplicación por cubo de 10s en cada hija.
 * 2. FORWARD ONLY: active → archived → dropped; el retroceso se veta.
 * 3. DROP SHIELD: Tirar una partición no vacía y no archivada es una
 *    violación de invariante de proceso (fatal por contrato).
 *
 * # Nota de seguridad:
 * Los nombres de partición jamás provienen del exterior; se derivan de
 * la función determinista 'partition_name_for_day', por lo que su
 * interpolación en DDL no abre superficie de inyección.
 * =================================================================
 */

use crate::errors::DbError;
use crate::PgClient;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::{debug, info, instrument, warn};
use warden_domain_models::partition::{
    partition_name_for_day, required_partition_days, PartitionMeta, PartitionState,
};

/// Autoridad única sobre las hijas físicas del log y 'hb_partitions'.
pub struct PartitionRepository {
    database_client: PgClient,
}

fn map_partition_row(partition_row: &PgRow) -> Result<PartitionMeta, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("PARTITION_ROW_DECODE: {}", fault));

    let raw_state: String = partition_row.try_get("state").map_err(map_fault)?;
    let state = PartitionState::parse(&raw_state)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_PARTITION_STATE: {}", raw_state)))?;

    Ok(PartitionMeta {
        partition_name: partition_row.try_get("partition_name").map_err(map_fault)?,
        range_start: partition_row.try_get("range_start").map_err(map_fault)?,
        range_end: partition_row.try_get("range_end").map_err(map_fault)?,
        state,
        row_count: partition_row.try_get("row_count").map_err(map_fault)?,
        bytes_size: partition_row.try_get("bytes_size").map_err(map_fault)?,
        checksum_sha256: partition_row.try_get("checksum_sha256").map_err(map_fault)?,
        archive_url: partition_row.try_get("archive_url").map_err(map_fault)?,
        created_at: partition_row.try_get("created_at").map_err(map_fault)?,
        archived_at: partition_row.try_get("archived_at").map_err(map_fault)?,
        dropped_at: partition_row.try_get("dropped_at").map_err(map_fault)?,
    })
}

const PARTITION_COLUMNS: &str = "partition_name, range_start, range_end, state, row_count, \
     bytes_size, checksum_sha256, archive_url, created_at, archived_at, dropped_at";

fn day_boundaries(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default();
    let range_start = Utc.from_utc_datetime(&day.and_time(midnight));
    let range_end = Utc.from_utc_datetime(&(day + chrono::Duration::days(1)).and_time(midnight));
    (range_start, range_end)
}

impl PartitionRepository {
    #[must_use]
    pub fn new(database_client: PgClient) -> Self {
        Self { database_client }
    }

    /**
     * Materializa la ventana completa de particiones alrededor de 'now'.
     * Idempotente: las hijas ya existentes se saltan en silencio.
     *
     * @returns cantidad de particiones recién solidificadas.
     */
    #[instrument(skip(self))]
    pub async fn ensure_window(&self, now: DateTime<Utc>) -> Result<usize, DbError> {
        let mut partitions_created = 0usize;

        for required_day in required_partition_days(now) {
            if self.create_partition_for_day(required_day).await? {
                partitions_created += 1;
            }
        }

        if partitions_created > 0 {
            info!("🏗️ [PARTITION_WINDOW]: {} daily partitions solidified.", partitions_created);
        }
        Ok(partitions_created)
    }

    /**
     * Crea la hija física de un día junto a sus índices y metadatos.
     *
     * @returns 'true' si la partición se creó en esta llamada.
     */
    #[instrument(skip(self))]
    pub async fn create_partition_for_day(&self, day: NaiveDate) -> Result<bool, DbError> {
        let partition_name = partition_name_for_day(day);
        let (range_start, range_end) = day_boundaries(day);

        let existing_meta = sqlx::query("SELECT 1 FROM hb_partitions WHERE partition_name = $1")
            .bind(&partition_name)
            .fetch_optional(self.database_client.pool())
            .await?;
        if existing_meta.is_some() {
            return Ok(false);
        }

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {partition} PARTITION OF device_heartbeats
             FOR VALUES FROM ('{start}') TO ('{end}')",
            partition = partition_name,
            start = range_start.format("%Y-%m-%d %H:%M:%S%:z"),
            end = range_end.format("%Y-%m-%d %H:%M:%S%:z"),
        ))
        .execute(self.database_client.pool())
        .await?;

        // Índice de lectura del radar: últimas muestras por dispositivo.
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{partition}_device_ts ON {partition} (device_id, ts DESC)",
            partition = partition_name,
        ))
        .execute(self.database_client.pool())
        .await?;

        // Índice único de deduplicación: (dispositivo, minuto, ranura 10s).
        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_{partition}_bucket ON {partition}
             (device_id, date_trunc('minute', ts), ((FLOOR(EXTRACT(EPOCH FROM ts) / 10))::int % 6))",
            partition = partition_name,
        ))
        .execute(self.database_client.pool())
        .await?;

        sqlx::query(
            "INSERT INTO hb_partitions (partition_name, range_start, range_end, state)
             VALUES ($1, $2, $3, 'active')
             ON CONFLICT (partition_name) DO NOTHING",
        )
        .bind(&partition_name)
        .bind(range_start)
        .bind(range_end)
        .execute(self.database_client.pool())
        .await?;

        debug!("  🟢 [PARTITION_FORGED]: {} [{} → {}]", partition_name, range_start, range_end);
        Ok(true)
    }

    pub async fn list_meta(&self) -> Result<Vec<PartitionMeta>, DbError> {
        let partition_rows = sqlx::query(&format!(
            "SELECT {} FROM hb_partitions ORDER BY range_start",
            PARTITION_COLUMNS
        ))
        .fetch_all(self.database_client.pool())
        .await?;

        partition_rows.iter().map(map_partition_row).collect()
    }

    pub async fn fetch_meta(&self, partition_name: &str) -> Result<PartitionMeta, DbError> {
        let partition_row = sqlx::query(&format!(
            "SELECT {} FROM hb_partitions WHERE partition_name = $1",
            PARTITION_COLUMNS
        ))
        .bind(partition_name)
        .fetch_optional(self.database_client.pool())
        .await?
        .ok_or_else(|| DbError::PartitionNotFound(partition_name.to_string()))?;

        map_partition_row(&partition_row)
    }

    /// Recuenta filas y bytes físicos de una hija y sella los metadatos.
    #[instrument(skip(self))]
    pub async fn refresh_stats(&self, partition_name: &str) -> Result<PartitionMeta, DbError> {
        // Certificamos la existencia en metadatos antes de tocar el catálogo.
        self.fetch_meta(partition_name).await?;

        let stats_row = sqlx::query(&format!(
            "SELECT (SELECT COUNT(*) FROM {partition}) AS row_count,
                    pg_total_relation_size('{partition}') AS bytes_size",
            partition = partition_name,
        ))
        .fetch_one(self.database_client.pool())
        .await?;

        let row_count: i64 = stats_row
            .try_get("row_count")
            .map_err(|fault| DbError::MappingError(format!("PARTITION_STATS_DECODE: {}", fault)))?;
        let bytes_size: i64 = stats_row
            .try_get("bytes_size")
            .map_err(|fault| DbError::MappingError(format!("PARTITION_STATS_DECODE: {}", fault)))?;

        sqlx::query("UPDATE hb_partitions SET row_count = $2, bytes_size = $3 WHERE partition_name = $1")
            .bind(partition_name)
            .bind(row_count)
            .bind(bytes_size)
            .execute(self.database_client.pool())
            .await?;

        self.fetch_meta(partition_name).await
    }

    /**
     * Transición active → archived con metadatos de archivo.
     * El retroceso de ciclo de vida se veta sin tocar el catálogo.
     */
    #[instrument(skip(self, checksum_sha256, archive_url))]
    pub async fn archive_partition(
        &self,
        partition_name: &str,
        checksum_sha256: Option<&str>,
        archive_url: Option<&str>,
        archived_at: DateTime<Utc>,
    ) -> Result<PartitionMeta, DbError> {
        let current_meta = self.fetch_meta(partition_name).await?;

        if !current_meta.state.can_transition_to(PartitionState::Archived) {
            return Err(DbError::LifecycleRegression(format!(
                "{} cannot move {} -> archived",
                partition_name,
                current_meta.state.as_str()
            )));
        }

        let refreshed_meta = self.refresh_stats(partition_name).await?;

        sqlx::query(
            "UPDATE hb_partitions SET
                state = 'archived', archived_at = $2,
                checksum_sha256 = COALESCE($3, checksum_sha256),
                archive_url = COALESCE($4, archive_url)
             WHERE partition_name = $1",
        )
        .bind(partition_name)
        .bind(archived_at)
        .bind(checksum_sha256)
        .bind(archive_url)
        .execute(self.database_client.pool())
        .await?;

        info!(
            "📦 [PARTITION_ARCHIVED]: {} sealed ({} rows, {} bytes).",
            partition_name,
            refreshed_meta.row_count.unwrap_or(0),
            refreshed_meta.bytes_size.unwrap_or(0)
        );
        self.fetch_meta(partition_name).await
    }

    /**
     * Caída física de una hija archivada (o certificadamente vacía).
     *
     * # Errors:
     * `DbError::UnarchivedDropVeto` — la hija retiene filas vivas sin
     * archivar. El llamador DEBE tratarla como violación fatal.
     */
    #[instrument(skip(self))]
    pub async fn drop_partition(&self, partition_name: &str, dropped_at: DateTime<Utc>) -> Result<(), DbError> {
        let current_meta = self.fetch_meta(partition_name).await?;

        if current_meta.state == PartitionState::Dropped {
            return Err(DbError::LifecycleRegression(format!("{} already dropped", partition_name)));
        }

        if current_meta.state != PartitionState::Archived {
            let live_rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", partition_name))
                .fetch_one(self.database_client.pool())
                .await?;

            if live_rows > 0 {
                warn!(
                    "💀 [DROP_VETO]: {} holds {} live rows without archive seal.",
                    partition_name, live_rows
                );
                return Err(DbError::UnarchivedDropVeto(partition_name.to_string()));
            }
        }

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", partition_name))
            .execute(self.database_client.pool())
            .await?;

        sqlx::query("UPDATE hb_partitions SET state = 'dropped', dropped_at = $2 WHERE partition_name = $1")
            .bind(partition_name)
            .bind(dropped_at)
            .execute(self.database_client.pool())
            .await?;

        info!("💀 [PARTITION_DROPPED]: {} released from the physical catalog.", partition_name);
        Ok(())
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/partition.rs]
