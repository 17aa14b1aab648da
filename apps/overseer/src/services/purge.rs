// INICIO DEL ARCHIVO [apps/overseer/src/services/purge.rs]
/*!
 * =================================================================
 * APARATO: THE REAPER PURGE WORKER (V9.0 - ADVISORY LOCKED)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: PURGA HISTÓRICA BAJO EXCLUSIÓN MUTUA DE FLOTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FLEET MUTEX: Un único worker de la flota sostiene el advisory
 *    lock de purga; los demás saltan el tick en silencio.
 * 2. TIME BUDGET: Cada tick respeta un presupuesto (60s) y un tope de
 *    trabajos; la purga jamás monopoliza el pool de conexiones.
 * 3. PARTITION AWARE: El borrado del log de latidos poda las hijas
 *    particionadas por el plan de ejecución del motor.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use warden_infra_db::advisory::{AdvisoryLockGuard, PURGE_LOCK_ID};
use warden_infra_db::repositories::{CommandLedgerRepository, DeviceEventRepository, HeartbeatRepository};
use warden_infra_db::{DbError, PgClient};
use warden_shared_argus::metrics::MetricsRegistry;

use crate::state::purge_queue::PurgeQueue;

/// Presupuesto de tiempo por tick del Reaper.
const PURGE_TIME_BUDGET_SECONDS: u64 = 60;
/// Tope de trabajos drenados por tick.
const PURGE_MAX_JOBS_PER_TICK: usize = 10;

/**
 * Worker de purga histórica de dispositivos retirados.
 */
pub struct PurgeWorker {
    database_client: PgClient,
    purge_queue: Arc<PurgeQueue>,
    heartbeat_repository: Arc<HeartbeatRepository>,
    ledger_repository: Arc<CommandLedgerRepository>,
    event_repository: Arc<DeviceEventRepository>,
    metrics: Arc<MetricsRegistry>,
}

impl PurgeWorker {
    #[must_use]
    pub fn new(
        database_client: PgClient,
        purge_queue: Arc<PurgeQueue>,
        heartbeat_repository: Arc<HeartbeatRepository>,
        ledger_repository: Arc<CommandLedgerRepository>,
        event_repository: Arc<DeviceEventRepository>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            database_client,
            purge_queue,
            heartbeat_repository,
            ledger_repository,
            event_repository,
            metrics,
        }
    }

    /**
     * Drena la bandeja de purga bajo advisory lock con presupuesto.
     * Si otro proceso de la flota sostiene el cerrojo, el tick se salta.
     */
    #[instrument(skip(self))]
    pub async fn drain_tick(&self) -> Result<(), DbError> {
        if self.purge_queue.depth() == 0 {
            return Ok(());
        }

        let Some(lock_guard) = AdvisoryLockGuard::try_acquire(self.database_client.pool(), PURGE_LOCK_ID).await?
        else {
            return Ok(());
        };

        let tick_started = Instant::now();
        let mut jobs_processed = 0usize;

        while jobs_processed < PURGE_MAX_JOBS_PER_TICK {
            if tick_started.elapsed().as_secs() > PURGE_TIME_BUDGET_SECONDS {
                warn!(
                    "⏳ [REAPER_BUDGET]: Time budget exhausted after {} jobs; remainder deferred.",
                    jobs_processed
                );
                break;
            }

            let Some(purge_job) = self.purge_queue.pop_next() else { break };

            if !purge_job.purge_history {
                jobs_processed += 1;
                continue;
            }

            for device_identifier in &purge_job.device_ids {
                match self.purge_device_history(device_identifier).await {
                    Ok(total_rows) => {
                        info!(
                            "💀 [REAPER_PURGE]: Device {} history released ({} rows).",
                            device_identifier, total_rows
                        );
                    }
                    Err(purge_fault) => {
                        warn!(
                            "⚠️  [REAPER_FAULT]: Purge for {} failed, continuing: {}",
                            device_identifier, purge_fault
                        );
                    }
                }
            }

            jobs_processed += 1;
            self.metrics.inc_counter("purge_jobs_processed_total", &[]);
        }

        lock_guard.release().await;
        Ok(())
    }

    /// Fan-out de borrado por tabla con métricas por destino.
    async fn purge_device_history(&self, device_identifier: &str) -> Result<u64, DbError> {
        let heartbeat_rows = self.heartbeat_repository.delete_for_device(device_identifier).await?;
        self.metrics.inc_counter_by(
            "purge_rows_deleted_total",
            &[("table", "device_heartbeats")],
            heartbeat_rows,
        );

        let ledger_rows = self.ledger_repository.delete_for_device(device_identifier).await?;
        self.metrics
            .inc_counter_by("purge_rows_deleted_total", &[("table", "command_ledger")], ledger_rows);

        let event_rows = self.event_repository.delete_for_device(device_identifier).await?;
        self.metrics
            .inc_counter_by("purge_rows_deleted_total", &[("table", "device_events")], event_rows);

        Ok(heartbeat_rows + ledger_rows + event_rows)
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/purge.rs]
