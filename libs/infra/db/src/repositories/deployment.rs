// [libs/infra/db/src/repositories/deployment.rs]
/*!
 * =================================================================
 * APARATO: STAGED ROLLOUT REPOSITORY (V9.4 - WAVE LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DEL CICLO DE VIDA RUN/BATCH
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TERMINAL FREEZE: Toda mutación de lote lleva el predicado
 *    "status = 'running'" — un lote terminal es físicamente inmutable.
 * 2. MONOTONE COUNTERS: Los contadores sólo se incrementan; jamás se
 *    reescriben con valores absolutos.
 * 3. COVERAGE INVARIANT: La suma de 'devices_in_batch' de una corrida
 *    es exactamente 'total_devices' por construcción transaccional.
 * =================================================================
 */

use crate::errors::DbError;
use crate::PgClient;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::{info, instrument};
use warden_domain_models::command::CommandOutcome;
use warden_domain_models::deployment::{
    partition_into_batches, BatchStatus, DeploymentBatch, DeploymentRun, OutcomeCounters, RunStatus,
};

/// Autoridad única sobre las corridas de despliegue y sus olas.
pub struct DeploymentRepository {
    database_client: PgClient,
}

/// Lote hidratado junto a su membresía de dispositivos.
#[derive(Debug, Clone)]
pub struct BatchWithMembers {
    pub batch: DeploymentBatch,
    pub device_ids: Vec<String>,
}

fn map_run_row(run_row: &PgRow) -> Result<DeploymentRun, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("RUN_ROW_DECODE: {}", fault));

    let raw_status: String = run_row.try_get("status").map_err(map_fault)?;
    let status = RunStatus::parse(&raw_status)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_RUN_STATUS: {}", raw_status)))?;

    Ok(DeploymentRun {
        id: run_row.try_get("id").map_err(map_fault)?,
        apk_version_id: run_row.try_get("apk_version_id").map_err(map_fault)?,
        initiated_by: run_row.try_get("initiated_by").map_err(map_fault)?,
        total_devices: run_row.try_get("total_devices").map_err(map_fault)?,
        batch_size: run_row.try_get("batch_size").map_err(map_fault)?,
        success_threshold: run_row.try_get("success_threshold").map_err(map_fault)?,
        batch_timeout_minutes: run_row.try_get("batch_timeout_minutes").map_err(map_fault)?,
        status,
        current_batch_index: run_row.try_get("current_batch_index").map_err(map_fault)?,
        total_batches: run_row.try_get("total_batches").map_err(map_fault)?,
        counters: OutcomeCounters {
            success_count: run_row.try_get("success_count").map_err(map_fault)?,
            failure_count: run_row.try_get("failure_count").map_err(map_fault)?,
            timeout_count: run_row.try_get("timeout_count").map_err(map_fault)?,
        },
        started_at: run_row.try_get("started_at").map_err(map_fault)?,
        completed_at: run_row.try_get("completed_at").map_err(map_fault)?,
    })
}

fn map_batch_row(batch_row: &PgRow) -> Result<DeploymentBatch, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("BATCH_ROW_DECODE: {}", fault));

    let raw_status: String = batch_row.try_get("status").map_err(map_fault)?;
    let status = BatchStatus::parse(&raw_status)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_BATCH_STATUS: {}", raw_status)))?;

    Ok(DeploymentBatch {
        id: batch_row.try_get("id").map_err(map_fault)?,
        run_id: batch_row.try_get("deployment_run_id").map_err(map_fault)?,
        batch_index: batch_row.try_get("batch_index").map_err(map_fault)?,
        status,
        devices_in_batch: batch_row.try_get("devices_in_batch").map_err(map_fault)?,
        counters: OutcomeCounters {
            success_count: batch_row.try_get("success_count").map_err(map_fault)?,
            failure_count: batch_row.try_get("failure_count").map_err(map_fault)?,
            timeout_count: batch_row.try_get("timeout_count").map_err(map_fault)?,
        },
        started_at: batch_row.try_get("started_at").map_err(map_fault)?,
        timeout_at: batch_row.try_get("timeout_at").map_err(map_fault)?,
        completed_at: batch_row.try_get("completed_at").map_err(map_fault)?,
    })
}

fn map_batch_members(batch_row: &PgRow) -> Result<Vec<String>, DbError> {
    let membership_json: serde_json::Value = batch_row
        .try_get("device_ids")
        .map_err(|fault| DbError::MappingError(format!("BATCH_MEMBERSHIP_DECODE: {}", fault)))?;
    serde_json::from_value(membership_json)
        .map_err(|fault| DbError::MappingError(format!("BATCH_MEMBERSHIP_SHAPE: {}", fault)))
}

const RUN_COLUMNS: &str = "id, apk_version_id, initiated_by, total_devices, batch_size, \
     success_threshold, batch_timeout_minutes, status, current_batch_index, total_batches, \
     success_count, failure_count, timeout_count, started_at, completed_at";

const BATCH_COLUMNS: &str = "id, deployment_run_id, batch_index, status, device_ids, \
     devices_in_batch, success_count, failure_count, timeout_count, started_at, timeout_at, completed_at";

impl DeploymentRepository {
    #[must_use]
    pub fn new(database_client: PgClient) -> Self {
        Self { database_client }
    }

    /**
     * Crea una corrida y todas sus olas en una sola transacción.
     * La cobertura queda sellada: Σ devices_in_batch == total_devices.
     */
    #[instrument(skip(self, device_identifiers), fields(devices = device_identifiers.len()))]
    pub async fn create_run(
        &self,
        apk_version_identifier: i64,
        initiated_by: Option<&str>,
        device_identifiers: &[String],
        batch_size: i32,
        success_threshold: i32,
        batch_timeout_minutes: i32,
    ) -> Result<DeploymentRun, DbError> {
        let wave_sizes = partition_into_batches(device_identifiers.len() as i32, batch_size);
        let total_batches = wave_sizes.len() as i32;

        let mut creation_transaction = self.database_client.pool().begin().await?;

        let run_row = sqlx::query(&format!(
            "INSERT INTO apk_deployment_runs (
                apk_version_id, initiated_by, total_devices, batch_size,
                success_threshold, batch_timeout_minutes, status, total_batches
             )
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
             RETURNING {}",
            RUN_COLUMNS
        ))
        .bind(apk_version_identifier)
        .bind(initiated_by)
        .bind(device_identifiers.len() as i32)
        .bind(batch_size)
        .bind(success_threshold)
        .bind(batch_timeout_minutes)
        .bind(total_batches)
        .fetch_one(&mut *creation_transaction)
        .await?;

        let created_run = map_run_row(&run_row)?;

        let mut membership_cursor = 0usize;
        for (wave_index, wave_size) in wave_sizes.iter().enumerate() {
            let wave_members =
                &device_identifiers[membership_cursor..membership_cursor + *wave_size as usize];
            membership_cursor += *wave_size as usize;

            let membership_json = serde_json::to_value(wave_members)
                .map_err(|fault| DbError::MappingError(format!("BATCH_MEMBERSHIP_ENCODE: {}", fault)))?;

            sqlx::query(
                "INSERT INTO apk_deployment_batches (
                    deployment_run_id, batch_index, status, device_ids, devices_in_batch
                 )
                 VALUES ($1, $2, 'pending', $3, $4)",
            )
            .bind(created_run.id)
            .bind(wave_index as i32)
            .bind(membership_json)
            .bind(*wave_size)
            .execute(&mut *creation_transaction)
            .await?;
        }

        creation_transaction.commit().await?;

        info!(
            "🌊 [ROLLOUT_FORGED]: Run {} sealed with {} devices across {} waves.",
            created_run.id,
            device_identifiers.len(),
            total_batches
        );
        Ok(created_run)
    }

    pub async fn fetch_run(&self, run_identifier: i64) -> Result<DeploymentRun, DbError> {
        let run_row = sqlx::query(&format!("SELECT {} FROM apk_deployment_runs WHERE id = $1", RUN_COLUMNS))
            .bind(run_identifier)
            .fetch_optional(self.database_client.pool())
            .await?
            .ok_or(DbError::DeploymentNotFound)?;

        map_run_row(&run_row)
    }

    pub async fn list_batches(&self, run_identifier: i64) -> Result<Vec<DeploymentBatch>, DbError> {
        let batch_rows = sqlx::query(&format!(
            "SELECT {} FROM apk_deployment_batches WHERE deployment_run_id = $1 ORDER BY batch_index",
            BATCH_COLUMNS
        ))
        .bind(run_identifier)
        .fetch_all(self.database_client.pool())
        .await?;

        batch_rows.iter().map(map_batch_row).collect()
    }

    /**
     * Transición de estado de la corrida con veto de regresión.
     * Los estados terminales quedan congelados para siempre.
     */
    #[instrument(skip(self))]
    pub async fn transition_run(
        &self,
        run_identifier: i64,
        target_status: RunStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<DeploymentRun, DbError> {
        let current_run = self.fetch_run(run_identifier).await?;

        let transition_permitted = match (current_run.status, target_status) {
            (RunStatus::Pending, RunStatus::Running) => true,
            (RunStatus::Running, RunStatus::Paused) => true,
            (RunStatus::Paused, RunStatus::Running) => true,
            (RunStatus::Running, RunStatus::Completed) => true,
            (RunStatus::Running, RunStatus::Failed) => true,
            (RunStatus::Pending | RunStatus::Running | RunStatus::Paused, RunStatus::Aborted) => true,
            _ => false,
        };

        if !transition_permitted {
            return Err(DbError::InvalidStateTransition(format!(
                "run {} cannot move {} -> {}",
                run_identifier,
                current_run.status.as_str(),
                target_status.as_str()
            )));
        }

        sqlx::query(
            "UPDATE apk_deployment_runs SET status = $2, completed_at = COALESCE($3, completed_at)
             WHERE id = $1",
        )
        .bind(run_identifier)
        .bind(target_status.as_str())
        .bind(completed_at)
        .execute(self.database_client.pool())
        .await?;

        self.fetch_run(run_identifier).await
    }

    /**
     * Selecciona la primera ola 'pending' cuya corrida está 'running',
     * hidratada con su membresía para el despacho.
     */
    pub async fn first_dispatchable_batch(&self) -> Result<Option<BatchWithMembers>, DbError> {
        let batch_row = sqlx::query(&format!(
            "SELECT {} FROM apk_deployment_batches b
             WHERE b.status = 'pending'
               AND EXISTS (
                   SELECT 1 FROM apk_deployment_runs r
                   WHERE r.id = b.deployment_run_id
                     AND r.status = 'running'
                     AND r.current_batch_index = b.batch_index
               )
             ORDER BY b.deployment_run_id, b.batch_index
             LIMIT 1",
            BATCH_COLUMNS
        ))
        .fetch_optional(self.database_client.pool())
        .await?;

        match batch_row {
            Some(hydrated_row) => Ok(Some(BatchWithMembers {
                device_ids: map_batch_members(&hydrated_row)?,
                batch: map_batch_row(&hydrated_row)?,
            })),
            None => Ok(None),
        }
    }

    /// Olas actualmente en vuelo, para evaluación de umbral y deadline.
    pub async fn running_batches(&self) -> Result<Vec<DeploymentBatch>, DbError> {
        let batch_rows = sqlx::query(&format!(
            "SELECT {} FROM apk_deployment_batches WHERE status = 'running' ORDER BY deployment_run_id, batch_index",
            BATCH_COLUMNS
        ))
        .fetch_all(self.database_client.pool())
        .await?;

        batch_rows.iter().map(map_batch_row).collect()
    }

    /// Sella el arranque de una ola: 'running' + ventana de deadline.
    pub async fn mark_batch_running(
        &self,
        batch_identifier: i64,
        started_at: DateTime<Utc>,
        timeout_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let update_result = sqlx::query(
            "UPDATE apk_deployment_batches SET status = 'running', started_at = $2, timeout_at = $3
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(batch_identifier)
        .bind(started_at)
        .bind(timeout_at)
        .execute(self.database_client.pool())
        .await?;

        if update_result.rows_affected() == 0 {
            return Err(DbError::InvalidStateTransition(format!(
                "batch {} is not pending",
                batch_identifier
            )));
        }
        Ok(())
    }

    /**
     * Avanza los contadores de ola y corrida ante un desenlace de
     * instalación. El predicado "status = 'running'" congela los lotes
     * terminales: un resultado tardío no altera nada observable.
     *
     * @returns 'true' si el contador del lote avanzó.
     */
    #[instrument(skip(self))]
    pub async fn bump_outcome_counters(
        &self,
        batch_identifier: i64,
        run_identifier: i64,
        outcome: CommandOutcome,
    ) -> Result<bool, DbError> {
        let counter_column = match outcome {
            CommandOutcome::Completed => "success_count",
            CommandOutcome::Failed => "failure_count",
            CommandOutcome::Timeout => "timeout_count",
        };

        let batch_update = sqlx::query(&format!(
            "UPDATE apk_deployment_batches SET {counter} = {counter} + 1
             WHERE id = $1 AND status = 'running'",
            counter = counter_column
        ))
        .bind(batch_identifier)
        .execute(self.database_client.pool())
        .await?;

        if batch_update.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(&format!(
            "UPDATE apk_deployment_runs SET {counter} = {counter} + 1 WHERE id = $1",
            counter = counter_column
        ))
        .bind(run_identifier)
        .execute(self.database_client.pool())
        .await?;

        Ok(true)
    }

    /**
     * Sella el desenlace terminal de una ola. Sólo una ola 'running'
     * puede terminar; una segunda llamada es un no-op certificado.
     *
     * @returns 'true' si esta llamada ejecutó la transición.
     */
    #[instrument(skip(self))]
    pub async fn finalize_batch(
        &self,
        batch_identifier: i64,
        terminal_status: BatchStatus,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        if !terminal_status.is_terminal() {
            return Err(DbError::InvalidStateTransition(format!(
                "batch {} cannot finalize into non-terminal {}",
                batch_identifier,
                terminal_status.as_str()
            )));
        }

        let finalize_result = sqlx::query(
            "UPDATE apk_deployment_batches SET status = $2, completed_at = $3
             WHERE id = $1 AND status = 'running'",
        )
        .bind(batch_identifier)
        .bind(terminal_status.as_str())
        .bind(completed_at)
        .execute(self.database_client.pool())
        .await?;

        Ok(finalize_result.rows_affected() > 0)
    }

    /// Avanza el cursor de ola de la corrida tras un éxito.
    pub async fn advance_run_cursor(&self, run_identifier: i64) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE apk_deployment_runs SET current_batch_index = current_batch_index + 1 WHERE id = $1",
        )
        .bind(run_identifier)
        .execute(self.database_client.pool())
        .await?;
        Ok(())
    }

    /// Promueve corridas recién forjadas al estado operativo.
    pub async fn promote_pending_runs(&self) -> Result<u64, DbError> {
        let promotion_result =
            sqlx::query("UPDATE apk_deployment_runs SET status = 'running' WHERE status = 'pending'")
                .execute(self.database_client.pool())
                .await?;
        Ok(promotion_result.rows_affected())
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/deployment.rs]
