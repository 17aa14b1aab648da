// INICIO DEL ARCHIVO [apps/overseer/src/services/alert_engine.rs]
/*!
 * =================================================================
 * APARATO: FLEET SENTINEL ALERT ENGINE (V14.0 - SAVEPOINT ISOLATED)
 * CLASIFICACIÓN: SERVICE LAYER (ESTRATO L4)
 * RESPONSABILIDAD: EVALUACIÓN DE CONDICIONES Y PIPELINE DE SUPRESIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE JUDGES: Las decisiones (OFFLINE, LOW_BATTERY, UNITY_DOWN,
 *    cooldown, cap, roll-up) son funciones puras con reloj inyectado,
 *    certificables sin base de datos en el Proving Grounds.
 * 2. SAVEPOINT ISOLATION: Cada alerta sella su estado dentro de su
 *    propio savepoint; el colapso de una jamás revierte a sus hermanas.
 * 3. SUPPRESSION ORDER: cooldown por dispositivo → cap global 60s →
 *    roll-up por condición → entrega → remediación opcional.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use sqlx::Acquire;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use warden_domain_models::alert::{AlertCondition, AlertLifecycle, AlertSeverity, AlertSignal, AlertState};
use warden_domain_models::command::CommandAction;
use warden_domain_models::device::{Device, DeviceLastStatus};
use warden_infra_db::repositories::{AlertStateRepository, DeviceRepository, HeartbeatRepository};
use warden_infra_db::{DbError, PgClient};
use warden_shared_argus::metrics::MetricsRegistry;

use crate::config::AlertConfig;
use crate::services::command_dispatcher::CommandDispatcher;
use crate::services::webhook::WebhookClient;
use crate::state::alert_trackers::{AlertSuppressionTrackers, RollupDevice};

/// Cadencia nominal del tick del centinela.
pub const EVALUATION_INTERVAL_SECONDS: i64 = 60;

// -----------------------------------------------------------------
// JUECES PUROS (certificables sin infraestructura)
// -----------------------------------------------------------------

/// Un dispositivo está caído si su último pulso excede el umbral.
#[must_use]
pub fn judge_offline(last_ts: DateTime<Utc>, offline_minutes: i64, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(last_ts) > Duration::minutes(offline_minutes)
}

/// Batería baja: porcentaje en o bajo el umbral configurado.
#[must_use]
pub fn judge_low_battery(battery_pct: Option<i32>, low_battery_pct: i32) -> bool {
    battery_pct.is_some_and(|pct| pct <= low_battery_pct)
}

/// Veredicto del juez de la app monitorizada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnityDownVerdict {
    /// La app corre (o no hay señal): condición limpia.
    Clear,
    /// La app no corre pero la condición aún arma el umbral (pending).
    Arming,
    /// La condición superó el umbral (y el debounce, si aplica): elevar.
    Breached,
}

/**
 * Juez de UNITY_DOWN: la app monitorizada lleva caída más allá del
 * umbral. Con 'require_consecutive' la elevación exige que una
 * evaluación previa ya haya observado el umbral superado — es decir,
 * un tick completo adicional más allá del umbral.
 */
#[must_use]
pub fn judge_unity_down(
    unity_running: Option<bool>,
    condition_started_at: Option<DateTime<Utc>>,
    threshold_min: i32,
    require_consecutive: bool,
    now: DateTime<Utc>,
) -> UnityDownVerdict {
    if unity_running != Some(false) {
        return UnityDownVerdict::Clear;
    }

    let Some(started_at) = condition_started_at else {
        return UnityDownVerdict::Arming;
    };

    let down_duration = now.signed_duration_since(started_at);
    let breach_threshold = Duration::minutes(i64::from(threshold_min));

    if down_duration < breach_threshold {
        return UnityDownVerdict::Arming;
    }

    if require_consecutive && down_duration < breach_threshold + Duration::seconds(EVALUATION_INTERVAL_SECONDS) {
        return UnityDownVerdict::Arming;
    }

    UnityDownVerdict::Breached
}

/// Cooldown por dispositivo: suprime mientras 'cooldown_until' viva.
#[must_use]
pub fn in_cooldown(cooldown_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    cooldown_until.is_some_and(|until| now < until)
}

/// Desenlace del pipeline de supresión para una elevación candidata.
#[derive(Debug)]
pub enum SuppressionOutcome {
    /// Suprimida por cooldown del par (dispositivo, condición).
    Cooldown,
    /// Suprimida por el cap global deslizante de 60s.
    RateLimited,
    /// Superada por un mensaje agregado con la lista adjunta.
    Rollup(Vec<RollupDevice>),
    /// Procede la entrega individual.
    Deliver,
}

/**
 * Pipeline de supresión en orden contractual:
 * cooldown → cap global → roll-up → entrega.
 */
#[must_use]
pub fn suppression_decision(
    cooldown_until: Option<DateTime<Utc>>,
    trackers: &AlertSuppressionTrackers,
    condition: AlertCondition,
    device_id: &str,
    alias: &str,
    alert_config: &AlertConfig,
    now: DateTime<Utc>,
) -> SuppressionOutcome {
    if in_cooldown(cooldown_until, now) {
        return SuppressionOutcome::Cooldown;
    }

    if trackers.global_cap_exceeded(now, alert_config.global_cap_per_min) {
        return SuppressionOutcome::RateLimited;
    }

    trackers.track_for_rollup(condition, device_id, alias, now);

    match trackers.rollup_ready(condition, now, alert_config.rollup_threshold) {
        Some(aggregated_devices) => {
            trackers.clear_rollup(condition);
            SuppressionOutcome::Rollup(aggregated_devices)
        }
        None => SuppressionOutcome::Deliver,
    }
}

// -----------------------------------------------------------------
// PLAN DE EVALUACIÓN POR TICK
// -----------------------------------------------------------------

/// Acción decidida por el evaluador para un par (dispositivo, condición).
#[derive(Debug)]
enum PlannedTransition {
    Raise(AlertSignal),
    Recover(AlertSignal),
    MarkPending { device_id: String, condition: AlertCondition },
}

fn signal_severity(condition: AlertCondition) -> AlertSeverity {
    match condition {
        AlertCondition::Offline => AlertSeverity::Critical,
        AlertCondition::LowBattery => AlertSeverity::Warn,
        AlertCondition::UnityDown => AlertSeverity::Critical,
    }
}

/**
 * Evalúa todas las condiciones de un dispositivo contra su proyección.
 * Función pura: estado previo, configuración y reloj entran por firma.
 */
fn plan_device_transitions(
    device: &Device,
    status: &DeviceLastStatus,
    prior_states: &HashMap<(String, AlertCondition), AlertState>,
    alert_config: &AlertConfig,
    now: DateTime<Utc>,
) -> Vec<PlannedTransition> {
    let mut planned_transitions = Vec::new();

    let prior_of = |condition: AlertCondition| prior_states.get(&(device.id.clone(), condition));
    let was_raised = |condition: AlertCondition| {
        prior_of(condition).map(|state| state.state == AlertLifecycle::Raised).unwrap_or(false)
    };

    let base_signal = |condition: AlertCondition, is_recovery: bool| AlertSignal {
        condition,
        severity: signal_severity(condition),
        device_id: device.id.clone(),
        alias: device.alias.clone(),
        is_recovery,
        last_seen: Some(status.last_ts),
        battery_pct: status.battery_pct,
        network_type: status.network_type.clone(),
        unity_running: status.unity_running,
        monitored_package: Some(device.monitored_package.clone()),
        monitored_app_name: Some(device.monitored_app_name.clone()),
        foreground_recent_s: None,
        threshold_min: None,
        value: None,
        requires_remediation: false,
        self_healed: false,
    };

    // --- CONDICIÓN: OFFLINE ---
    if judge_offline(status.last_ts, alert_config.offline_minutes, now) {
        let mut offline_signal = base_signal(AlertCondition::Offline, false);
        offline_signal.value =
            Some(format!("{}m silent", now.signed_duration_since(status.last_ts).num_minutes()));
        offline_signal.threshold_min = Some(alert_config.offline_minutes as i32);
        offline_signal.requires_remediation = true;
        planned_transitions.push(PlannedTransition::Raise(offline_signal));
    } else if was_raised(AlertCondition::Offline) {
        planned_transitions.push(PlannedTransition::Recover(base_signal(AlertCondition::Offline, true)));
    }

    // --- CONDICIÓN: LOW_BATTERY ---
    if judge_low_battery(status.battery_pct, alert_config.low_battery_pct) {
        let mut battery_signal = base_signal(AlertCondition::LowBattery, false);
        battery_signal.value = status.battery_pct.map(|pct| format!("{}%", pct));
        planned_transitions.push(PlannedTransition::Raise(battery_signal));
    } else if was_raised(AlertCondition::LowBattery) {
        planned_transitions.push(PlannedTransition::Recover(base_signal(AlertCondition::LowBattery, true)));
    }

    // --- CONDICIÓN: UNITY_DOWN (sólo con monitorización activa) ---
    if device.monitor_enabled {
        let prior_started_at = prior_of(AlertCondition::UnityDown).and_then(|state| state.condition_started_at);

        match judge_unity_down(
            status.unity_running,
            prior_started_at,
            device.monitor_threshold_min,
            alert_config.unity_down_require_consecutive,
            now,
        ) {
            UnityDownVerdict::Breached => {
                let mut unity_signal = base_signal(AlertCondition::UnityDown, false);
                unity_signal.threshold_min = Some(device.monitor_threshold_min);
                unity_signal.value = prior_started_at
                    .map(|started| format!("{}m down", now.signed_duration_since(started).num_minutes()));
                unity_signal.requires_remediation = device.auto_relaunch_enabled;
                planned_transitions.push(PlannedTransition::Raise(unity_signal));
            }
            UnityDownVerdict::Arming => {
                if prior_started_at.is_none() {
                    planned_transitions.push(PlannedTransition::MarkPending {
                        device_id: device.id.clone(),
                        condition: AlertCondition::UnityDown,
                    });
                }
            }
            UnityDownVerdict::Clear => {
                if was_raised(AlertCondition::UnityDown) {
                    let mut recovery_signal = base_signal(AlertCondition::UnityDown, true);
                    recovery_signal.self_healed = device.auto_relaunch_enabled;
                    planned_transitions.push(PlannedTransition::Recover(recovery_signal));
                } else if prior_started_at.is_some() {
                    // La condición se limpió antes de elevar: cerramos el arming.
                    let mut cleared_signal = base_signal(AlertCondition::UnityDown, true);
                    cleared_signal.self_healed = false;
                    planned_transitions.push(PlannedTransition::Recover(cleared_signal));
                }
            }
        }
    }

    planned_transitions
}

// -----------------------------------------------------------------
// SERVICIO DEL CENTINELA
// -----------------------------------------------------------------

/**
 * Motor de alertas de la flota. Un tick evalúa toda la proyección y
 * procesa cada transición en su propio savepoint.
 */
pub struct AlertEngineService {
    database_client: PgClient,
    device_repository: Arc<DeviceRepository>,
    heartbeat_repository: Arc<HeartbeatRepository>,
    alert_state_repository: Arc<AlertStateRepository>,
    dispatcher: Arc<CommandDispatcher>,
    webhook_client: Arc<WebhookClient>,
    suppression_trackers: Arc<AlertSuppressionTrackers>,
    metrics: Arc<MetricsRegistry>,
    alert_config: AlertConfig,
}

impl AlertEngineService {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        database_client: PgClient,
        device_repository: Arc<DeviceRepository>,
        heartbeat_repository: Arc<HeartbeatRepository>,
        alert_state_repository: Arc<AlertStateRepository>,
        dispatcher: Arc<CommandDispatcher>,
        webhook_client: Arc<WebhookClient>,
        suppression_trackers: Arc<AlertSuppressionTrackers>,
        metrics: Arc<MetricsRegistry>,
        alert_config: AlertConfig,
    ) -> Self {
        Self {
            database_client,
            device_repository,
            heartbeat_repository,
            alert_state_repository,
            dispatcher,
            webhook_client,
            suppression_trackers,
            metrics,
            alert_config,
        }
    }

    /**
     * Ejecuta un tick completo del centinela sobre la flota.
     * El colapso del procesamiento de una alerta se aísla vía savepoint
     * y jamás interrumpe a las demás.
     */
    #[instrument(skip(self))]
    pub async fn process_alerts(&self) -> Result<(), DbError> {
        let now = Utc::now();

        let fleet_devices = self.device_repository.list_fleet().await?;
        let fleet_statuses = self.heartbeat_repository.fetch_all_last_statuses().await?;
        let prior_states: HashMap<(String, AlertCondition), AlertState> = self
            .alert_state_repository
            .list_all()
            .await?
            .into_iter()
            .map(|state| ((state.device_id.clone(), state.condition), state))
            .collect();

        let status_index: HashMap<&str, &DeviceLastStatus> =
            fleet_statuses.iter().map(|status| (status.device_id.as_str(), status)).collect();

        let mut planned_transitions = Vec::new();
        for device in &fleet_devices {
            // Un dispositivo que jamás latió no alimenta al centinela.
            if let Some(device_status) = status_index.get(device.id.as_str()) {
                planned_transitions.extend(plan_device_transitions(
                    device,
                    device_status,
                    &prior_states,
                    &self.alert_config,
                    now,
                ));
            }
        }

        if planned_transitions.is_empty() {
            return Ok(());
        }

        let device_index: HashMap<&str, &Device> =
            fleet_devices.iter().map(|device| (device.id.as_str(), device)).collect();

        // Segregación: elevaciones (pipeline de supresión agrupado por
        // condición) vs transiciones de estado puro (savepoint directo).
        let mut raise_signals: Vec<AlertSignal> = Vec::new();
        let mut state_transitions: Vec<PlannedTransition> = Vec::new();
        for planned in planned_transitions {
            match planned {
                PlannedTransition::Raise(signal) => raise_signals.push(signal),
                other_transition => state_transitions.push(other_transition),
            }
        }

        let mut tick_transaction = self.database_client.pool().begin().await?;

        for planned in state_transitions {
            // Savepoint individual: el fallo de esta alerta no toca al resto.
            let alert_savepoint = tick_transaction.begin().await;
            let mut alert_savepoint = match alert_savepoint {
                Ok(savepoint) => savepoint,
                Err(savepoint_fault) => {
                    error!("❌ [SENTINEL_SAVEPOINT_FAULT]: {}", savepoint_fault);
                    continue;
                }
            };

            let processing_verdict = match &planned {
                PlannedTransition::Recover(signal) => {
                    self.process_recovery(&mut alert_savepoint, signal, now).await
                }
                PlannedTransition::MarkPending { device_id, condition } => self
                    .alert_state_repository
                    .mark_pending_in_session(&mut alert_savepoint, device_id, *condition, now)
                    .await,
                PlannedTransition::Raise(_) => Ok(()),
            };

            match processing_verdict {
                Ok(()) => {
                    if let Err(commit_fault) = alert_savepoint.commit().await {
                        error!("❌ [SENTINEL_COMMIT_FAULT]: {}", commit_fault);
                    }
                }
                Err(processing_fault) => {
                    warn!("⚠️  [SENTINEL_ISOLATED_FAULT]: alert rolled back alone: {}", processing_fault);
                    let _ = alert_savepoint.rollback().await;
                }
            }
        }

        self.process_raises_grouped(&mut tick_transaction, raise_signals, &prior_states, &device_index, now)
            .await;

        tick_transaction.commit().await?;
        Ok(())
    }

    /**
     * Procesa las elevaciones del tick agrupadas por condición.
     *
     * # Logic:
     * 1. Cooldown y cap global filtran supervivientes (con métricas).
     * 2. Los supervivientes alimentan la ventana de roll-up; si el
     *    umbral se alcanza, UN solo mensaje agregado supersede a todas
     *    las entregas individuales de la ventana (sent_total += 1).
     * 3. Sin roll-up, cada superviviente se entrega individualmente y
     *    sella su estado dentro de su propio savepoint.
     */
    async fn process_raises_grouped(
        &self,
        tick_transaction: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        raise_signals: Vec<AlertSignal>,
        prior_states: &HashMap<(String, AlertCondition), AlertState>,
        device_index: &HashMap<&str, &Device>,
        now: DateTime<Utc>,
    ) {
        let mut raises_by_condition: HashMap<AlertCondition, Vec<AlertSignal>> = HashMap::new();
        for signal in raise_signals {
            raises_by_condition.entry(signal.condition).or_default().push(signal);
        }

        for (condition, condition_raises) in raises_by_condition {
            // --- FASE 1: COOLDOWN + CAP GLOBAL ---
            let mut surviving_signals = Vec::new();
            for signal in condition_raises {
                let cooldown_until = prior_states
                    .get(&(signal.device_id.clone(), condition))
                    .and_then(|state| state.cooldown_until);

                if in_cooldown(cooldown_until, now) {
                    self.metrics.inc_counter(
                        "alerts_suppressed_total",
                        &[("reason", "cooldown"), ("condition", condition.as_str())],
                    );
                    continue;
                }

                if self.suppression_trackers.global_cap_exceeded(now, self.alert_config.global_cap_per_min) {
                    self.metrics.inc_counter(
                        "alerts_suppressed_total",
                        &[("reason", "rate_limit"), ("condition", condition.as_str())],
                    );
                    continue;
                }

                self.suppression_trackers
                    .track_for_rollup(condition, &signal.device_id, &signal.alias, now);
                surviving_signals.push(signal);
            }

            if surviving_signals.is_empty() {
                continue;
            }

            // --- FASE 2: ROLL-UP SUPERSEDE INDIVIDUALES ---
            if let Some(aggregated_devices) =
                self.suppression_trackers
                    .rollup_ready(condition, now, self.alert_config.rollup_threshold)
            {
                self.suppression_trackers.clear_rollup(condition);

                let rollup_severity = surviving_signals[0].severity;
                let delivered = self
                    .webhook_client
                    .send_rollup(condition, rollup_severity, &aggregated_devices)
                    .await;

                if delivered {
                    self.metrics
                        .inc_counter("alerts_sent_total", &[("condition", condition.as_str())]);
                    info!(
                        "📊 [SENTINEL_ROLLUP]: {} aggregated over {} devices; individuals superseded.",
                        condition.as_str(),
                        aggregated_devices.len()
                    );
                }
                continue;
            }

            // --- FASE 3: ENTREGAS INDIVIDUALES (savepoint por alerta) ---
            for signal in surviving_signals {
                let alert_savepoint = tick_transaction.begin().await;
                let mut alert_savepoint = match alert_savepoint {
                    Ok(savepoint) => savepoint,
                    Err(savepoint_fault) => {
                        error!("❌ [SENTINEL_SAVEPOINT_FAULT]: {}", savepoint_fault);
                        continue;
                    }
                };

                match self.deliver_individual(&mut alert_savepoint, &signal, device_index, now).await {
                    Ok(()) => {
                        if let Err(commit_fault) = alert_savepoint.commit().await {
                            error!("❌ [SENTINEL_COMMIT_FAULT]: {}", commit_fault);
                        }
                    }
                    Err(processing_fault) => {
                        warn!("⚠️  [SENTINEL_ISOLATED_FAULT]: raise rolled back alone: {}", processing_fault);
                        let _ = alert_savepoint.rollback().await;
                    }
                }
            }
        }
    }

    async fn deliver_individual(
        &self,
        alert_savepoint: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        signal: &AlertSignal,
        device_index: &HashMap<&str, &Device>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let delivered = self.webhook_client.send_alert(signal).await;
        if !delivered {
            return Ok(());
        }

        let cooldown_until = now + Duration::minutes(self.alert_config.device_cooldown_min);
        self.alert_state_repository
            .seal_raise_in_session(
                &mut *alert_savepoint,
                &signal.device_id,
                signal.condition,
                now,
                cooldown_until,
                signal.value.as_deref(),
            )
            .await?;

        self.metrics
            .inc_counter("alerts_sent_total", &[("condition", signal.condition.as_str())]);

        if signal.requires_remediation && self.alert_config.enable_autoremediation {
            self.attempt_remediation(signal, device_index).await;
        }
        Ok(())
    }

    async fn process_recovery(
        &self,
        alert_savepoint: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        signal: &AlertSignal,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let prior_state = self
            .alert_state_repository
            .fetch_in_session(&mut *alert_savepoint, &signal.device_id, signal.condition)
            .await?;

        let Some(prior_state) = prior_state else { return Ok(()) };

        // El arming abandonado también se limpia, sin webhook.
        if prior_state.state != AlertLifecycle::Raised {
            self.alert_state_repository
                .seal_recovery_in_session(&mut *alert_savepoint, &signal.device_id, signal.condition, now)
                .await?;
            return Ok(());
        }

        self.alert_state_repository
            .seal_recovery_in_session(&mut *alert_savepoint, &signal.device_id, signal.condition, now)
            .await?;

        if signal.self_healed {
            self.metrics
                .inc_counter("remediations_success_total", &[("action", "launch_app")]);
        }

        let delivered = self.webhook_client.send_recovery(signal).await;
        if delivered {
            self.metrics
                .inc_counter("alerts_recovered_total", &[("condition", signal.condition.as_str())]);
        }
        Ok(())
    }

    /// Remediación opcional tras la entrega: jamás reintenta.
    async fn attempt_remediation(&self, signal: &AlertSignal, device_index: &HashMap<&str, &Device>) {
        let Some(target_device) = device_index.get(signal.device_id.as_str()) else { return };

        let (remediation_action, remediation_data) = match signal.condition {
            AlertCondition::UnityDown => (
                CommandAction::LaunchApp,
                HashMap::from([("package_name".to_string(), target_device.monitored_package.clone())]),
            ),
            AlertCondition::Offline => (CommandAction::Ping, HashMap::new()),
            AlertCondition::LowBattery => return,
        };

        match self.dispatcher.dispatch(target_device, remediation_action, remediation_data, None).await {
            Ok(_) => {
                self.metrics.inc_counter(
                    "remediations_attempted_total",
                    &[("action", remediation_action.as_str())],
                );
            }
            Err(remediation_fault) => {
                warn!(
                    "⚠️  [REMEDIATION_FAULT]: {} for {} not dispatched: {}",
                    remediation_action.as_str(),
                    signal.device_id,
                    remediation_fault
                );
                self.metrics.inc_counter(
                    "remediations_failed_total",
                    &[("action", remediation_action.as_str())],
                );
            }
        }
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/alert_engine.rs]
