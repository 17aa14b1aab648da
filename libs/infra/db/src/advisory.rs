// [libs/infra/db/src/advisory.rs]
/*!
 * =================================================================
 * APARATO: ADVISORY LOCK CUSTODIAN (V3.1 - SESSION SCOPED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXCLUSIÓN MUTUA ENTRE WORKERS VÍA pg_try_advisory_lock
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SESSION AFFINITY: Un advisory lock de PostgreSQL pertenece a la
 *    sesión que lo adquirió; el guardián retiene su conexión dedicada
 *    durante toda la vida del trabajo y la libera en el mismo enlace.
 * 2. NON-BLOCKING: 'try' semantics — si otro proceso de la flota ya
 *    sostiene el cerrojo, el tick se salta en silencio.
 * =================================================================
 */

use crate::errors::DbError;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres, Row};
use tracing::{debug, warn};

/// Identificador del cerrojo del worker de purga.
pub const PURGE_LOCK_ID: i64 = 987_654_321;
/// Identificador del cerrojo del job de reconciliación.
pub const RECONCILIATION_LOCK_ID: i64 = 123_456_789;

/**
 * Guardián de un advisory lock vivo. Mientras exista, ningún otro
 * proceso de la flota puede adquirir el mismo identificador.
 */
pub struct AdvisoryLockGuard {
    dedicated_session_connection: PoolConnection<Postgres>,
    lock_identifier: i64,
}

impl AdvisoryLockGuard {
    /**
     * Intenta adquirir el cerrojo sin bloquear.
     * Retorna 'None' si otro worker de la flota ya lo sostiene.
     *
     * # Errors:
     * `DbError::QueryError` si el enlace con el cluster colapsa.
     */
    pub async fn try_acquire(database_pool: &PgPool, lock_identifier: i64) -> Result<Option<Self>, DbError> {
        let mut dedicated_session_connection = database_pool.acquire().await?;

        let lock_row = sqlx::query("SELECT pg_try_advisory_lock($1) AS acquired")
            .bind(lock_identifier)
            .fetch_one(&mut *dedicated_session_connection)
            .await?;

        let lock_acquired: bool = lock_row
            .try_get("acquired")
            .map_err(|fault| DbError::MappingError(format!("ADVISORY_FLAG_DECODE: {}", fault)))?;

        if !lock_acquired {
            debug!("⏭️  [ADVISORY_SKIP]: Lock {} held by another fleet process.", lock_identifier);
            return Ok(None);
        }

        debug!("🔐 [ADVISORY_HELD]: Lock {} acquired on dedicated session.", lock_identifier);
        Ok(Some(Self { dedicated_session_connection, lock_identifier }))
    }

    /// Acceso a la sesión dueña del cerrojo para ejecutar el trabajo protegido.
    pub fn session(&mut self) -> &mut PoolConnection<Postgres> {
        &mut self.dedicated_session_connection
    }

    /**
     * Libera el cerrojo explícitamente sobre la misma sesión que lo adquirió.
     * Si la liberación falla, la sesión se descarta y PostgreSQL libera el
     * cerrojo al cerrar la conexión.
     */
    pub async fn release(mut self) {
        let release_attempt = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(self.lock_identifier)
            .execute(&mut *self.dedicated_session_connection)
            .await;

        match release_attempt {
            Ok(_) => debug!("🔓 [ADVISORY_RELEASED]: Lock {} returned to the fleet.", self.lock_identifier),
            Err(release_fault) => warn!(
                "⚠️  [ADVISORY_RELEASE_FAULT]: Lock {} release failed ({}); session teardown will reclaim it.",
                self.lock_identifier, release_fault
            ),
        }
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/advisory.rs]
