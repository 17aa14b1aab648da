// [apps/overseer/src/services/reconciliation.rs]
/*!
 * =================================================================
 * APARATO: PROJECTION RECONCILIATION JOB (V7.0 - SELF HEALING)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: REPARACIÓN HORARIA DE LA PROYECCIÓN CALIENTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDEMPOTENT & REENTRANT: La reparación replays el log reciente con
 *    la misma función de orden del upsert; correr dos veces no cambia
 *    nada, y el advisory lock impide la concurrencia entre instancias.
 * 2. CAPPED: Máximo 5.000 filas por corrida sobre las últimas 24h;
 *    la reparación jamás agota los recursos del pool.
 * =================================================================
 */

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use warden_infra_db::advisory::{AdvisoryLockGuard, RECONCILIATION_LOCK_ID};
use warden_infra_db::repositories::HeartbeatRepository;
use warden_infra_db::{DbError, PgClient};
use warden_shared_argus::metrics::MetricsRegistry;

/// Ventana de replay de la reparación.
const RECONCILIATION_WINDOW_HOURS: i64 = 24;
/// Tope de filas procesadas por corrida.
const RECONCILIATION_MAX_ROWS: i64 = 5_000;

/**
 * Job horario de convergencia proyección ← log.
 */
pub struct ReconciliationJob {
    database_client: PgClient,
    heartbeat_repository: Arc<HeartbeatRepository>,
    metrics: Arc<MetricsRegistry>,
}

impl ReconciliationJob {
    #[must_use]
    pub fn new(
        database_client: PgClient,
        heartbeat_repository: Arc<HeartbeatRepository>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self { database_client, heartbeat_repository, metrics }
    }

    /**
     * Corre una pasada de reparación bajo advisory lock.
     *
     * @returns filas de la proyección efectivamente avanzadas, o 'None' si
     * otra instancia de la flota sostiene el cerrojo.
     */
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<Option<u64>, DbError> {
        let Some(mut lock_guard) =
            AdvisoryLockGuard::try_acquire(self.database_client.pool(), RECONCILIATION_LOCK_ID).await?
        else {
            info!("⏭️  [RECONCILIATION_SKIP]: Another fleet instance holds the lock.");
            return Ok(None);
        };

        let run_started = std::time::Instant::now();
        let replay_cutoff = Utc::now() - Duration::hours(RECONCILIATION_WINDOW_HOURS);

        let repair_outcome = self
            .heartbeat_repository
            .reconcile_last_status(lock_guard.session(), replay_cutoff, RECONCILIATION_MAX_ROWS)
            .await;

        lock_guard.release().await;

        let repaired_rows = repair_outcome?;
        let elapsed_ms = run_started.elapsed().as_millis() as f64;

        self.metrics.inc_counter_by("reconciliation_rows_repaired_total", &[], repaired_rows);
        self.metrics.observe_histogram("reconciliation_run_ms", &[], elapsed_ms);

        info!(
            "🔄 [RECONCILIATION_DONE]: {} projection rows advanced in {:.0}ms.",
            repaired_rows, elapsed_ms
        );
        Ok(Some(repaired_rows))
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/reconciliation.rs]
