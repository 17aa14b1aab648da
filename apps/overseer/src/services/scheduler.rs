// INICIO DEL ARCHIVO [apps/overseer/src/services/scheduler.rs]
/*!
 * =================================================================
 * APARATO: WORKER SUPERVISOR (V10.0 - COOPERATIVE DAEMONS)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: CICLO DE VIDA DE LOS BUCLES PERIÓDICOS DE LA FLOTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STOP CHANNEL: Cada daemon observa un canal 'watch' cooperativo y
 *    termina limpio entre ticks; ningún bucle retiene trabajo en vuelo
 *    tras la señal de parada.
 * 2. SKIP ON CONGESTION: 'MissedTickBehavior::Skip' prioriza frescura
 *    sobre cantidad de ejecuciones ante congestión de CPU.
 * 3. NEVER DIE: El fallo de un tick se registra y retrocede; un daemon
 *    jamás termina el proceso.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use warden_infra_db::repositories::{DeviceRepository, PartitionRepository};
use warden_infra_db::PgClient;
use warden_shared_argus::metrics::MetricsRegistry;

use crate::services::alert_engine::AlertEngineService;
use crate::services::deployment_controller::DeploymentControllerService;
use crate::services::event_flush::EventFlushWorker;
use crate::services::purge::PurgeWorker;
use crate::services::reconciliation::ReconciliationJob;

/// Cadencia del tick del centinela de alertas.
const ALERT_LOOP_SECONDS: u64 = 60;
/// Cadencia del Reaper de purga.
const PURGE_LOOP_SECONDS: u64 = 30;
/// Cadencia de la limpieza de selecciones transitorias.
const SELECTION_CLEANUP_SECONDS: u64 = 600;
/// Pausa entre ráfagas del volcado de eventos.
const EVENT_FLUSH_PAUSE_MILLIS: u64 = 500;
/// Cadencia de la reconciliación de la proyección.
const RECONCILIATION_LOOP_SECONDS: u64 = 3600;
/// Cadencia del comandante de despliegues.
const DEPLOYMENT_LOOP_SECONDS: u64 = 30;
/// Cadencia del mantenimiento de la ventana de particiones.
const PARTITION_MAINTENANCE_SECONDS: u64 = 86_400;
/// Cadencia del radar de salud del pool.
const POOL_HEALTH_SECONDS: u64 = 300;

/// Retroceso tras un tick fallido antes de reintentar el bucle.
const FAILURE_BACKOFF_SECONDS: u64 = 60;

/**
 * Supervisor de daemons: cada bucle es arrancable y detenible de forma
 * individual a través del canal de parada compartido.
 */
pub struct WorkerSupervisor {
    stop_signal_sender: watch::Sender<bool>,
}

impl Default for WorkerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Ejecuta un bucle periódico con disciplina de parada y retroceso.
macro_rules! supervised_loop {
    ($daemon_name:literal, $period_seconds:expr, $stop_receiver:ident, $tick_body:expr) => {
        tokio::spawn(async move {
            let mut loop_ticker = interval(Duration::from_secs($period_seconds));
            loop_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut $stop_receiver = $stop_receiver;

            info!("⚙️  [{}]: Daemon operational (period {}s).", $daemon_name, $period_seconds);

            loop {
                tokio::select! {
                    _ = loop_ticker.tick() => {
                        if let Err(tick_fault) = $tick_body.await {
                            error!("❌ [{}]: Tick failed, backing off: {}", $daemon_name, tick_fault);
                            tokio::time::sleep(Duration::from_secs(FAILURE_BACKOFF_SECONDS)).await;
                        }
                    }
                    _ = $stop_receiver.changed() => {
                        info!("🛑 [{}]: Stop signal observed; daemon retiring.", $daemon_name);
                        break;
                    }
                }
            }
        });
    };
}

impl WorkerSupervisor {
    #[must_use]
    pub fn new() -> Self {
        let (stop_signal_sender, _) = watch::channel(false);
        Self { stop_signal_sender }
    }

    fn stop_receiver(&self) -> watch::Receiver<bool> {
        self.stop_signal_sender.subscribe()
    }

    /// Señal cooperativa de parada para todos los daemons.
    pub fn signal_stop(&self) {
        let _ = self.stop_signal_sender.send(true);
    }

    /// Bucle del centinela de alertas (60s).
    pub fn spawn_alert_loop(&self, alert_engine: Arc<AlertEngineService>) {
        let stop_receiver = self.stop_receiver();
        supervised_loop!("SENTINEL_LOOP", ALERT_LOOP_SECONDS, stop_receiver, alert_engine.process_alerts());
    }

    /// Bucle del Reaper de purga (30s).
    pub fn spawn_purge_loop(&self, purge_worker: Arc<PurgeWorker>) {
        let stop_receiver = self.stop_receiver();
        supervised_loop!("REAPER_LOOP", PURGE_LOOP_SECONDS, stop_receiver, purge_worker.drain_tick());
    }

    /// Limpieza de selecciones transitorias expiradas (10 min).
    pub fn spawn_selection_cleanup_loop(&self, device_repository: Arc<DeviceRepository>) {
        let stop_receiver = self.stop_receiver();
        supervised_loop!("SELECTION_CLEANUP", SELECTION_CLEANUP_SECONDS, stop_receiver, async {
            let purged_selections = device_repository.delete_expired_selections(chrono::Utc::now()).await?;
            if purged_selections > 0 {
                info!("💀 [SELECTION_CLEANUP]: {} expired selections released.", purged_selections);
            }
            Ok::<(), warden_infra_db::DbError>(())
        });
    }

    /// Comandante de despliegues por olas (30s).
    pub fn spawn_deployment_loop(&self, deployment_controller: Arc<DeploymentControllerService>) {
        let stop_receiver = self.stop_receiver();
        supervised_loop!("WAVE_COMMANDER", DEPLOYMENT_LOOP_SECONDS, stop_receiver, deployment_controller.tick());
    }

    /// Reconciliación horaria de la proyección caliente.
    pub fn spawn_reconciliation_loop(&self, reconciliation_job: Arc<ReconciliationJob>) {
        let stop_receiver = self.stop_receiver();
        supervised_loop!("RECONCILIATION_LOOP", RECONCILIATION_LOOP_SECONDS, stop_receiver, async {
            reconciliation_job.run_once().await.map(|_| ())
        });
    }

    /// Mantenimiento diario de la ventana de particiones.
    pub fn spawn_partition_maintenance_loop(&self, partition_repository: Arc<PartitionRepository>) {
        let stop_receiver = self.stop_receiver();
        supervised_loop!("PARTITION_CUSTODIAN", PARTITION_MAINTENANCE_SECONDS, stop_receiver, async {
            partition_repository.ensure_window(chrono::Utc::now()).await.map(|_| ())
        });
    }

    /// Radar de saturación del pool de conexiones (5 min).
    pub fn spawn_pool_health_loop(&self, database_client: PgClient, metrics: Arc<MetricsRegistry>) {
        let stop_receiver = self.stop_receiver();
        supervised_loop!("POOL_RADAR", POOL_HEALTH_SECONDS, stop_receiver, async {
            let health_report = database_client.pool_health();
            metrics.set_gauge("db_pool_utilization_pct", &[], health_report.utilization_pct);
            Ok::<(), warden_infra_db::DbError>(())
        });
    }

    /**
     * Volcado continuo de la cola de eventos: ráfagas de hasta 50 con
     * pausa de 500ms entre drenajes.
     */
    pub fn spawn_event_flush_loop(&self, flush_worker: Arc<EventFlushWorker>) {
        let mut stop_receiver = self.stop_receiver();

        tokio::spawn(async move {
            info!("⚙️  [EVENT_FLUSH_LOOP]: Write-behind daemon operational.");

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(EVENT_FLUSH_PAUSE_MILLIS)) => {
                        if let Err(flush_fault) = flush_worker.drain_once().await {
                            error!("❌ [EVENT_FLUSH_LOOP]: Burst failed, backing off: {}", flush_fault);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                    _ = stop_receiver.changed() => {
                        info!("🛑 [EVENT_FLUSH_LOOP]: Stop signal observed; daemon retiring.");
                        break;
                    }
                }
            }
        });
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/scheduler.rs]
