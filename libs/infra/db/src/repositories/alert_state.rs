// [libs/infra/db/src/repositories/alert_state.rs]
/*!
 * =================================================================
 * APARATO: ALERT STATE REPOSITORY (V7.1 - SENTINEL LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DEL CICLO DE VIDA (device, condition)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SAVEPOINT FRIENDLY: Toda operación acepta un ejecutor genérico de
 *    conexión para correr dentro del savepoint por-alerta del centinela.
 * 2. DEBOUNCE FIELDS: 'condition_started_at'/'condition_cleared_at'
 *    sostienen la exigencia de evaluaciones consecutivas.
 * =================================================================
 */

use crate::errors::DbError;
use crate::PgClient;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use tracing::instrument;
use warden_domain_models::alert::{AlertCondition, AlertLifecycle, AlertState};

/// Autoridad única sobre la tabla 'alert_states'.
pub struct AlertStateRepository {
    database_client: PgClient,
}

fn map_alert_state_row(state_row: &PgRow) -> Result<AlertState, DbError> {
    let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("ALERT_STATE_ROW_DECODE: {}", fault));

    let raw_condition: String = state_row.try_get("condition").map_err(map_fault)?;
    let condition = AlertCondition::parse(&raw_condition)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_ALERT_CONDITION: {}", raw_condition)))?;

    let raw_lifecycle: String = state_row.try_get("state").map_err(map_fault)?;
    let state = AlertLifecycle::parse(&raw_lifecycle)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_ALERT_LIFECYCLE: {}", raw_lifecycle)))?;

    Ok(AlertState {
        device_id: state_row.try_get("device_id").map_err(map_fault)?,
        condition,
        state,
        condition_started_at: state_row.try_get("condition_started_at").map_err(map_fault)?,
        condition_cleared_at: state_row.try_get("condition_cleared_at").map_err(map_fault)?,
        last_raised_at: state_row.try_get("last_raised_at").map_err(map_fault)?,
        last_recovered_at: state_row.try_get("last_recovered_at").map_err(map_fault)?,
        cooldown_until: state_row.try_get("cooldown_until").map_err(map_fault)?,
        last_value: state_row.try_get("last_value").map_err(map_fault)?,
    })
}

const ALERT_STATE_COLUMNS: &str = "device_id, condition, state, condition_started_at, \
     condition_cleared_at, last_raised_at, last_recovered_at, cooldown_until, last_value";

impl AlertStateRepository {
    #[must_use]
    pub fn new(database_client: PgClient) -> Self {
        Self { database_client }
    }

    /// Lectura del estado de una condición dentro del savepoint activo.
    pub async fn fetch_in_session(
        &self,
        session: &mut PgConnection,
        device_identifier: &str,
        condition: AlertCondition,
    ) -> Result<Option<AlertState>, DbError> {
        let state_row = sqlx::query(&format!(
            "SELECT {} FROM alert_states WHERE device_id = $1 AND condition = $2",
            ALERT_STATE_COLUMNS
        ))
        .bind(device_identifier)
        .bind(condition.as_str())
        .fetch_optional(session)
        .await?;

        state_row.as_ref().map(map_alert_state_row).transpose()
    }

    /**
     * Sella una elevación: estado 'raised', marca temporal y cooldown.
     * Corre dentro del savepoint de la alerta en curso.
     */
    #[instrument(skip(self, session), fields(device = %device_identifier, condition = %condition.as_str()))]
    pub async fn seal_raise_in_session(
        &self,
        session: &mut PgConnection,
        device_identifier: &str,
        condition: AlertCondition,
        raised_at: DateTime<Utc>,
        cooldown_until: DateTime<Utc>,
        last_value: Option<&str>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO alert_states (
                device_id, condition, state, last_raised_at, cooldown_until, last_value
             )
             VALUES ($1, $2, 'raised', $3, $4, $5)
             ON CONFLICT (device_id, condition) DO UPDATE SET
                state = 'raised',
                last_raised_at = EXCLUDED.last_raised_at,
                cooldown_until = EXCLUDED.cooldown_until,
                last_value = EXCLUDED.last_value,
                condition_cleared_at = NULL",
        )
        .bind(device_identifier)
        .bind(condition.as_str())
        .bind(raised_at)
        .bind(cooldown_until)
        .bind(last_value)
        .execute(session)
        .await?;
        Ok(())
    }

    /**
     * Marca el arranque de una condición en fase 'pending' (debounce de
     * evaluaciones consecutivas). No toca cooldown ni marcas de elevación.
     */
    pub async fn mark_pending_in_session(
        &self,
        session: &mut PgConnection,
        device_identifier: &str,
        condition: AlertCondition,
        condition_started_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO alert_states (device_id, condition, state, condition_started_at)
             VALUES ($1, $2, 'pending', $3)
             ON CONFLICT (device_id, condition) DO UPDATE SET
                state = 'pending',
                condition_started_at = EXCLUDED.condition_started_at",
        )
        .bind(device_identifier)
        .bind(condition.as_str())
        .bind(condition_started_at)
        .execute(session)
        .await?;
        Ok(())
    }

    /**
     * Sella una recuperación: estado 'ok' y limpieza del arranque de
     * condición. El cooldown NO se toca: aplica sólo a elevaciones.
     */
    pub async fn seal_recovery_in_session(
        &self,
        session: &mut PgConnection,
        device_identifier: &str,
        condition: AlertCondition,
        recovered_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE alert_states SET
                state = 'ok',
                last_recovered_at = $3,
                condition_cleared_at = $3,
                condition_started_at = NULL
             WHERE device_id = $1 AND condition = $2",
        )
        .bind(device_identifier)
        .bind(condition.as_str())
        .bind(recovered_at)
        .execute(session)
        .await?;
        Ok(())
    }

    /// Inventario completo para diagnósticos del operador.
    pub async fn list_all(&self) -> Result<Vec<AlertState>, DbError> {
        let state_rows = sqlx::query(&format!("SELECT {} FROM alert_states", ALERT_STATE_COLUMNS))
            .fetch_all(self.database_client.pool())
            .await?;

        state_rows.iter().map(map_alert_state_row).collect()
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/alert_state.rs]
