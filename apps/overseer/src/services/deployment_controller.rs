// INICIO DEL ARCHIVO [apps/overseer/src/services/deployment_controller.rs]
/*!
 * =================================================================
 * APARATO: STAGED ROLLOUT CONTROLLER (V11.0 - WAVE COMMANDER)
 * CLASIFICACIÓN: SERVICE LAYER (ESTRATO L4)
 * RESPONSABILIDAD: AVANCE DE OLAS, UMBRALES Y DEADLINES DE DESPLIEGUE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE VERDICT: La decisión de ola (éxito, imposible, deadline) es
 *    una función pura sobre contadores y reloj inyectado.
 * 2. BATCH GRANULARITY: Los reintentos viven aquí a nivel de ola; el
 *    despachador jamás reintenta mensajes individuales.
 * 3. ABORT ON FAILURE: Una ola fallida o vencida sella la corrida en
 *    'failed'; ninguna ola posterior parte jamás.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use warden_domain_models::command::{CommandAction, CommandOutcome, CommandResult};
use warden_domain_models::deployment::{BatchStatus, DeploymentBatch, RunStatus};
use warden_infra_db::repositories::{ApkRepository, DeploymentRepository, DeviceRepository};
use warden_infra_db::DbError;
use warden_shared_argus::metrics::MetricsRegistry;

use crate::services::command_dispatcher::CommandDispatcher;

/// Veredicto puro del estado de una ola en vuelo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchVerdict {
    /// La ola sigue esperando desenlaces dentro de su ventana.
    InFlight,
    /// El umbral de éxito se alcanzó: la ola triunfó.
    Succeeded,
    /// Aun con todos los pendientes en éxito el umbral es inalcanzable.
    Impossible,
    /// El deadline de la ola venció sin alcanzar el umbral.
    DeadlineExpired,
}

/**
 * Decide el desenlace de una ola a partir de sus contadores.
 *
 * # Logic:
 * 1. success ≥ threshold            → Succeeded
 * 2. success + remaining < threshold → Impossible
 * 3. now > timeout_at               → DeadlineExpired
 * 4. en otro caso                   → InFlight
 */
#[must_use]
pub fn judge_batch(
    success_count: i32,
    failure_count: i32,
    timeout_count: i32,
    devices_in_batch: i32,
    success_threshold: i32,
    timeout_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> BatchVerdict {
    if success_count >= success_threshold {
        return BatchVerdict::Succeeded;
    }

    let resolved_count = success_count + failure_count + timeout_count;
    let remaining_count = devices_in_batch - resolved_count;
    if success_count + remaining_count < success_threshold {
        return BatchVerdict::Impossible;
    }

    if let Some(deadline) = timeout_at {
        if now > deadline {
            return BatchVerdict::DeadlineExpired;
        }
    }

    BatchVerdict::InFlight
}

/**
 * Comandante de despliegues por olas. Compartido entre el scheduler
 * (ticks) y el endpoint de resultados (avance inmediato).
 */
pub struct DeploymentControllerService {
    deployment_repository: Arc<DeploymentRepository>,
    device_repository: Arc<DeviceRepository>,
    apk_repository: Arc<ApkRepository>,
    dispatcher: Arc<CommandDispatcher>,
    metrics: Arc<MetricsRegistry>,
}

impl DeploymentControllerService {
    #[must_use]
    pub fn new(
        deployment_repository: Arc<DeploymentRepository>,
        device_repository: Arc<DeviceRepository>,
        apk_repository: Arc<ApkRepository>,
        dispatcher: Arc<CommandDispatcher>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            deployment_repository,
            device_repository,
            apk_repository,
            dispatcher,
            metrics,
        }
    }

    /**
     * Tick del comandante: evalúa las olas en vuelo y despacha la
     * siguiente ola elegible.
     */
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<(), DbError> {
        let now = Utc::now();

        self.deployment_repository.promote_pending_runs().await?;

        // --- FASE 1: EVALUACIÓN DE OLAS EN VUELO ---
        for in_flight_batch in self.deployment_repository.running_batches().await? {
            self.evaluate_batch(&in_flight_batch, now).await?;
        }

        // --- FASE 2: DESPACHO DE LA SIGUIENTE OLA ELEGIBLE ---
        if let Some(dispatchable) = self.deployment_repository.first_dispatchable_batch().await? {
            self.launch_batch(dispatchable.batch, dispatchable.device_ids, now).await?;
        }

        Ok(())
    }

    /**
     * Evalúa una ola en vuelo y sella su desenlace si corresponde.
     */
    async fn evaluate_batch(&self, batch: &DeploymentBatch, now: DateTime<Utc>) -> Result<(), DbError> {
        let verdict = judge_batch(
            batch.counters.success_count,
            batch.counters.failure_count,
            batch.counters.timeout_count,
            batch.devices_in_batch,
            self.deployment_repository.fetch_run(batch.run_id).await?.success_threshold,
            batch.timeout_at,
            now,
        );

        match verdict {
            BatchVerdict::InFlight => Ok(()),
            BatchVerdict::Succeeded => self.seal_batch_success(batch, now).await,
            BatchVerdict::Impossible => self.seal_batch_failure(batch, BatchStatus::Failed, now).await,
            BatchVerdict::DeadlineExpired => self.seal_batch_failure(batch, BatchStatus::TimedOut, now).await,
        }
    }

    async fn seal_batch_success(&self, batch: &DeploymentBatch, now: DateTime<Utc>) -> Result<(), DbError> {
        // El guard de terminalidad hace esta transición at-most-once.
        if !self.deployment_repository.finalize_batch(batch.id, BatchStatus::Succeeded, now).await? {
            return Ok(());
        }

        self.deployment_repository.advance_run_cursor(batch.run_id).await?;
        self.metrics.inc_counter("deployment_batches_total", &[("outcome", "succeeded")]);
        info!("🌊 [WAVE_SUCCEEDED]: Run {} wave {} sealed.", batch.run_id, batch.batch_index);

        let parent_run = self.deployment_repository.fetch_run(batch.run_id).await?;
        if parent_run.current_batch_index >= parent_run.total_batches
            && parent_run.status == RunStatus::Running
        {
            self.deployment_repository
                .transition_run(batch.run_id, RunStatus::Completed, Some(now))
                .await?;
            self.metrics.inc_counter("deployment_runs_total", &[("outcome", "completed")]);
            info!("🏁 [ROLLOUT_COMPLETED]: Run {} covered all waves.", batch.run_id);
        }
        Ok(())
    }

    async fn seal_batch_failure(
        &self,
        batch: &DeploymentBatch,
        terminal_status: BatchStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        if !self.deployment_repository.finalize_batch(batch.id, terminal_status, now).await? {
            return Ok(());
        }

        self.metrics
            .inc_counter("deployment_batches_total", &[("outcome", terminal_status.as_str())]);
        warn!(
            "🛑 [WAVE_COLLAPSED]: Run {} wave {} sealed as {}; halting rollout.",
            batch.run_id,
            batch.batch_index,
            terminal_status.as_str()
        );

        let parent_run = self.deployment_repository.fetch_run(batch.run_id).await?;
        if parent_run.status == RunStatus::Running {
            self.deployment_repository
                .transition_run(batch.run_id, RunStatus::Failed, Some(now))
                .await?;
            self.metrics.inc_counter("deployment_runs_total", &[("outcome", "failed")]);
        }
        Ok(())
    }

    /**
     * Lanza una ola: sella la ventana de deadline y despacha el mando
     * de instalación a cada miembro. Un fallo de despacho cuenta como
     * fallo del dispositivo, jamás aborta al resto de la ola.
     */
    async fn launch_batch(
        &self,
        batch: DeploymentBatch,
        member_device_ids: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let parent_run = self.deployment_repository.fetch_run(batch.run_id).await?;

        let Some(apk_version) = self.apk_repository.fetch_version(parent_run.apk_version_id).await? else {
            warn!("🛑 [WAVE_VETO]: Run {} references a vanished APK; sealing failed.", parent_run.id);
            self.deployment_repository
                .transition_run(parent_run.id, RunStatus::Failed, Some(now))
                .await?;
            return Ok(());
        };

        let deadline = now + Duration::minutes(i64::from(parent_run.batch_timeout_minutes));
        self.deployment_repository.mark_batch_running(batch.id, now, deadline).await?;

        info!(
            "🌊 [WAVE_LAUNCH]: Run {} wave {} -> {} devices (deadline {}).",
            parent_run.id,
            batch.batch_index,
            member_device_ids.len(),
            deadline
        );

        let addressable_members = self.device_repository.list_push_addressable(&member_device_ids).await?;

        for member_device in &addressable_members {
            let dispatch_attempt = self
                .dispatcher
                .dispatch_install(
                    member_device,
                    &apk_version,
                    Some("deployment_controller"),
                    Some(parent_run.id),
                    Some(batch.id),
                )
                .await;

            match dispatch_attempt {
                Ok(record) if record.status == warden_domain_models::command::DispatchStatus::Sent => {}
                Ok(_) | Err(_) => {
                    // Fallo inmediato del proveedor: el dispositivo no reportará.
                    self.deployment_repository
                        .bump_outcome_counters(batch.id, parent_run.id, CommandOutcome::Failed)
                        .await?;
                }
            }
        }

        // Los miembros sin token push cuentan como fallos desde el arranque.
        let unaddressable_count = member_device_ids.len() - addressable_members.len();
        for _ in 0..unaddressable_count {
            self.deployment_repository
                .bump_outcome_counters(batch.id, parent_run.id, CommandOutcome::Failed)
                .await?;
        }

        Ok(())
    }

    /**
     * Consume un resultado de acción del flujo del despachador (C5) y
     * avanza los contadores de la ola correlacionada. La evaluación de
     * desenlace corre de inmediato para no esperar al próximo tick.
     */
    #[instrument(skip(self, action_result), fields(request = %action_result.request_id))]
    pub async fn ingest_action_result(&self, action_result: &CommandResult) -> Result<(), DbError> {
        if action_result.action != CommandAction::InstallApk {
            return Ok(());
        }

        let Some(correlated_installation) = self
            .apk_repository
            .find_installation_by_request(action_result.request_id)
            .await?
        else {
            return Ok(());
        };

        let installation_status = match action_result.outcome {
            CommandOutcome::Completed => "completed",
            CommandOutcome::Failed => "failed",
            CommandOutcome::Timeout => "timeout",
        };
        self.apk_repository
            .close_installation(
                correlated_installation.id,
                installation_status,
                action_result.finished_at,
                action_result.message.as_deref(),
            )
            .await?;

        let (Some(batch_identifier), Some(run_identifier)) = (
            correlated_installation.deployment_batch_id,
            correlated_installation.deployment_run_id,
        ) else {
            return Ok(());
        };

        let counters_advanced = self
            .deployment_repository
            .bump_outcome_counters(batch_identifier, run_identifier, action_result.outcome)
            .await?;

        if !counters_advanced {
            // Resultado tardío sobre una ola ya terminal: no-op observable.
            return Ok(());
        }

        // Evaluación inmediata para sellar la ola sin esperar el tick.
        let refreshed_batches = self.deployment_repository.list_batches(run_identifier).await?;
        if let Some(refreshed_batch) = refreshed_batches.iter().find(|candidate| candidate.id == batch_identifier)
        {
            if refreshed_batch.status == BatchStatus::Running {
                self.evaluate_batch(refreshed_batch, Utc::now()).await?;
            }
        }

        Ok(())
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/deployment_controller.rs]
