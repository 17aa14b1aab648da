// INICIO DEL ARCHIVO [libs/infra/db/src/client.rs]
/*!
 * =================================================================
 * APARATO: DATABASE CONNECTION CLIENT (V9.2 - POOL GOVERNED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GESTIÓN DEL ENLACE POSTGRESQL Y SALUD DEL POOL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. POOL SOVEREIGNTY: 100 conexiones máximas (50 base + 50 overflow),
 *    verificación pre-checkout y reciclado horario, dimensionado para
 *    cientos de agentes latiendo en cadencias de decenas de segundos.
 * 2. SATURATION RADAR: Reporte de utilización con umbrales WARN (80%)
 *    y CRITICAL (95%) para el bucle de salud del pool.
 *
 * # Mathematical Proof (Checkout Integrity):
 * 'test_before_acquire' garantiza que toda conexión entregada respondió
 * un ping inmediatamente antes del checkout, acotando la ventana de
 * conexiones zombis al intervalo entre ping y primer statement.
 * =================================================================
 */

use crate::errors::DbError;
use crate::schema::apply_full_sovereign_schema;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Conexiones persistentes base del pool.
const POOL_BASE_SIZE: u32 = 50;
/// Conexiones adicionales bajo demanda (overflow).
const POOL_OVERFLOW_SIZE: u32 = 50;
/// Reciclado de conexiones: una hora de vida máxima.
const POOL_MAX_LIFETIME_SECONDS: u64 = 3600;
/// Espera máxima por una conexión disponible.
const POOL_ACQUIRE_TIMEOUT_SECONDS: u64 = 30;

/// Umbral de advertencia de saturación del pool.
pub const POOL_UTILIZATION_WARN_PCT: f64 = 80.0;
/// Umbral crítico de saturación del pool.
pub const POOL_UTILIZATION_CRITICAL_PCT: f64 = 95.0;

/// Veredicto de salud del pool para el radar de operaciones.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolHealthReport {
    pub status: String,
    pub max_capacity: u32,
    pub connections_open: u32,
    pub connections_idle: usize,
    pub connections_in_use: usize,
    pub utilization_pct: f64,
}

#[derive(Clone)]
pub struct PgClient {
    internal_database_pool: PgPool,
}

impl PgClient {
    /**
     * Establece el enlace táctico con el cluster PostgreSQL y sincroniza
     * el esquema estructural antes de entregar el cliente.
     *
     * # Errors:
     * - `DbError::ConfigurationError`: URL vacía o indefinida.
     * - `DbError::ConnectionError`: colapso del enlace físico o del bootstrap.
     */
    #[instrument(skip(database_connection_url))]
    pub async fn connect(database_connection_url: &str) -> Result<Self, DbError> {
        if database_connection_url.is_empty() {
            return Err(DbError::ConfigurationError("CRITICAL_FAULT: DATABASE_URL_UNDEFINED".into()));
        }

        info!("🔌 [DATABASE]: Initiating tactical link synchronization...");

        let database_pool = PgPoolOptions::new()
            .max_connections(POOL_BASE_SIZE + POOL_OVERFLOW_SIZE)
            .test_before_acquire(true)
            .max_lifetime(Duration::from_secs(POOL_MAX_LIFETIME_SECONDS))
            .acquire_timeout(Duration::from_secs(POOL_ACQUIRE_TIMEOUT_SECONDS))
            .connect(database_connection_url)
            .await
            .map_err(|fault| DbError::ConnectionError(format!("DRIVER_IGNITION_FAILURE: {}", fault)))?;

        apply_full_sovereign_schema(&database_pool)
            .await
            .map_err(|fault| DbError::ConnectionError(format!("SCHEMA_SYNC_FAULT: {}", fault)))?;

        info!("⚓ [DATABASE]: PostgreSQL strata solidified and certified.");

        Ok(Self { internal_database_pool: database_pool })
    }

    /// Acceso directo al pool para repositorios y transacciones.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.internal_database_pool
    }

    /**
     * Evalúa la saturación del pool contra los umbrales operativos.
     * Una lectura ≥ 80% emite WARN; ≥ 95% emite nivel crítico.
     */
    #[must_use]
    pub fn pool_health(&self) -> PoolHealthReport {
        let max_capacity = POOL_BASE_SIZE + POOL_OVERFLOW_SIZE;
        let connections_open = self.internal_database_pool.size();
        let connections_idle = self.internal_database_pool.num_idle();
        let connections_in_use = (connections_open as usize).saturating_sub(connections_idle);

        let utilization_pct = if max_capacity > 0 {
            (connections_in_use as f64 / max_capacity as f64) * 100.0
        } else {
            0.0
        };

        let status = if utilization_pct >= POOL_UTILIZATION_CRITICAL_PCT {
            warn!(
                "🆘 [POOL_CRITICAL]: Connection pool at {:.1}% capacity ({}/{}).",
                utilization_pct, connections_in_use, max_capacity
            );
            "critical"
        } else if utilization_pct >= POOL_UTILIZATION_WARN_PCT {
            warn!(
                "⚠️  [POOL_WARN]: Connection pool at {:.1}% capacity ({}/{}).",
                utilization_pct, connections_in_use, max_capacity
            );
            "warn"
        } else {
            "ok"
        };

        PoolHealthReport {
            status: status.to_string(),
            max_capacity,
            connections_open,
            connections_idle,
            connections_in_use,
            utilization_pct,
        }
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/client.rs]
