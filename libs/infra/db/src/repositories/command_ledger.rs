// [libs/infra/db/src/repositories/command_ledger.rs]
/*!
 * =================================================================
 * APARATO: COMMAND LEDGER REPOSITORY (V8.3 - IDEMPOTENT AUTHORITY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: LIBRO MAYOR INMUTABLE DE MANDOS Y RESULTADOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WRITE-THROUGH IDEMPOTENTE: Una segunda escritura con el mismo
 *    'request_id' y el mismo hash de payload retorna la fila previa
 *    sin efecto colateral; con hash divergente es violación fatal.
 * 2. AT-MOST-ONCE RESULTS: El resultado correlacionado se escribe una
 *    sola vez; duplicados tardíos no alteran nada observable.
 * =================================================================
 */

use crate::errors::DbError;
use crate::PgClient;
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use warden_domain_models::command::{
    CommandAction, CommandOutcome, CommandRecord, CommandResult, DispatchStatus,
};

/// Autoridad única sobre 'command_ledger' y 'command_results'.
pub struct CommandLedgerRepository {
    database_client: PgClient,
}

fn map_record_row(record_row: &PgRow) -> Result<CommandRecord, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("LEDGER_ROW_DECODE: {}", fault));

    let raw_action: String = record_row.try_get("action").map_err(map_fault)?;
    let action = CommandAction::parse(&raw_action)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_ACTION_IN_LEDGER: {}", raw_action)))?;

    let raw_status: String = record_row.try_get("status").map_err(map_fault)?;
    let status = match raw_status.as_str() {
        "sent" => DispatchStatus::Sent,
        "failed" => DispatchStatus::Failed,
        foreign_status => {
            return Err(DbError::MappingError(format!("UNKNOWN_DISPATCH_STATUS: {}", foreign_status)))
        }
    };

    Ok(CommandRecord {
        request_id: record_row.try_get("request_id").map_err(map_fault)?,
        device_id: record_row.try_get("device_id").map_err(map_fault)?,
        action,
        ts_issued: record_row.try_get("ts_issued").map_err(map_fault)?,
        payload_hash: record_row.try_get("payload_hash").map_err(map_fault)?,
        http_code: record_row.try_get("http_code").map_err(map_fault)?,
        provider_message_id: record_row.try_get("provider_message_id").map_err(map_fault)?,
        latency_ms: record_row.try_get("latency_ms").map_err(map_fault)?,
        status,
    })
}

fn map_result_row(result_row: &PgRow) -> Result<CommandResult, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("RESULT_ROW_DECODE: {}", fault));

    let raw_action: String = result_row.try_get("action").map_err(map_fault)?;
    let action = CommandAction::parse(&raw_action)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_ACTION_IN_RESULT: {}", raw_action)))?;

    let raw_outcome: String = result_row.try_get("outcome").map_err(map_fault)?;
    let outcome = CommandOutcome::parse(&raw_outcome)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_OUTCOME_IN_RESULT: {}", raw_outcome)))?;

    Ok(CommandResult {
        request_id: result_row.try_get("request_id").map_err(map_fault)?,
        device_id: result_row.try_get("device_id").map_err(map_fault)?,
        action,
        outcome,
        message: result_row.try_get("message").map_err(map_fault)?,
        finished_at: result_row.try_get("finished_at").map_err(map_fault)?,
    })
}

impl CommandLedgerRepository {
    #[must_use]
    pub fn new(database_client: PgClient) -> Self {
        Self { database_client }
    }

    /// Lectura puntual del libro mayor por identificador global.
    pub async fn fetch_by_request_id(&self, request_identifier: Uuid) -> Result<Option<CommandRecord>, DbError> {
        let record_row = sqlx::query(
            "SELECT request_id, device_id, action, ts_issued, payload_hash,
                    http_code, provider_message_id, latency_ms, status
             FROM command_ledger WHERE request_id = $1",
        )
        .bind(request_identifier)
        .fetch_optional(self.database_client.pool())
        .await?;

        record_row.as_ref().map(map_record_row).transpose()
    }

    /**
     * Escritura write-through del libro mayor TRAS la respuesta del
     * proveedor push.
     *
     * # Logic:
     * 1. Conflicto con el mismo hash de payload → se traga; retorna la
     *    fila preexistente (idempotencia certificada).
     * 2. Conflicto con hash divergente → 'DbError::LedgerDivergence';
     *    el llamador DEBE tratarla como violación fatal de proceso.
     */
    #[instrument(skip(self, record), fields(request = %record.request_id, device = %record.device_id))]
    pub async fn record_dispatch(&self, record: &CommandRecord) -> Result<CommandRecord, DbError> {
        let insert_result = sqlx::query(
            "INSERT INTO command_ledger (
                request_id, device_id, action, ts_issued, payload_hash,
                http_code, provider_message_id, latency_ms, status
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (request_id) DO NOTHING",
        )
        .bind(record.request_id)
        .bind(&record.device_id)
        .bind(record.action.as_str())
        .bind(record.ts_issued)
        .bind(&record.payload_hash)
        .bind(record.http_code)
        .bind(&record.provider_message_id)
        .bind(record.latency_ms)
        .bind(record.status.as_str())
        .execute(self.database_client.pool())
        .await?;

        if insert_result.rows_affected() > 0 {
            debug!("📒 [LEDGER_SEALED]: Dispatch {} crystallized.", record.request_id);
            return Ok(record.clone());
        }

        // El identificador ya existía: certificamos la paridad del payload.
        let existing_record = self
            .fetch_by_request_id(record.request_id)
            .await?
            .ok_or(DbError::CommandNotFound)?;

        if existing_record.payload_hash != record.payload_hash {
            warn!(
                "💀 [LEDGER_DIVERGENCE]: Request {} rewritten with foreign payload hash.",
                record.request_id
            );
            return Err(DbError::LedgerDivergence(record.request_id.to_string()));
        }

        debug!("⚪ [LEDGER_REPLAY]: Request {} already sealed; returning prior row.", record.request_id);
        Ok(existing_record)
    }

    /**
     * Escritura at-most-once del resultado correlacionado.
     *
     * @returns 'true' si esta llamada cristalizó el resultado; 'false' si
     * un resultado previo ya existía (no-op observable).
     */
    #[instrument(skip(self, result), fields(request = %result.request_id))]
    pub async fn record_result(&self, result: &CommandResult) -> Result<bool, DbError> {
        let insert_result = sqlx::query(
            "INSERT INTO command_results (request_id, device_id, action, outcome, message, finished_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (request_id) DO NOTHING",
        )
        .bind(result.request_id)
        .bind(&result.device_id)
        .bind(result.action.as_str())
        .bind(result.outcome.as_str())
        .bind(&result.message)
        .bind(result.finished_at)
        .execute(self.database_client.pool())
        .await?;

        Ok(insert_result.rows_affected() > 0)
    }

    /// Recupera el resultado correlacionado de un mando, si ya llegó.
    pub async fn fetch_result(&self, request_identifier: Uuid) -> Result<Option<CommandResult>, DbError> {
        let result_row = sqlx::query(
            "SELECT request_id, device_id, action, outcome, message, finished_at
             FROM command_results WHERE request_id = $1",
        )
        .bind(request_identifier)
        .fetch_optional(self.database_client.pool())
        .await?;

        result_row.as_ref().map(map_result_row).transpose()
    }

    /// Purga del rastro de mandos de un dispositivo (fan-out del Reaper).
    pub async fn delete_for_device(&self, device_identifier: &str) -> Result<u64, DbError> {
        let ledger_deletion = sqlx::query("DELETE FROM command_ledger WHERE device_id = $1")
            .bind(device_identifier)
            .execute(self.database_client.pool())
            .await?;

        sqlx::query("DELETE FROM command_results WHERE device_id = $1")
            .bind(device_identifier)
            .execute(self.database_client.pool())
            .await?;

        Ok(ledger_deletion.rows_affected())
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/command_ledger.rs]
