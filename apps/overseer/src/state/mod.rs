// [apps/overseer/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V12.0 - FLEET SINGULARITY)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE REPOSITORIOS, SERVICIOS Y CACHES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COMPOSITION ROOT: Centraliza el rastro de repositorios, colas y
 *    servicios; los colaboradores son explícitos y viajan por Arc —
 *    cero singletons ambientales.
 * 2. NOMINAL PURITY: Erradicación total de abreviaciones.
 * 3. PUSH OPTIONAL: Sin credenciales del proveedor, el plano de
 *    control opera en modo degradado (lecturas y alertas sin push).
 * =================================================================
 */

pub mod alert_trackers;
pub mod event_queue;
pub mod purge_queue;
pub mod response_cache;

use std::sync::Arc;
use tracing::{debug, warn};

use warden_infra_db::repositories::{
    AlertStateRepository, ApkRepository, CommandLedgerRepository, DeploymentRepository, DeviceRepository,
    DeviceEventRepository, HeartbeatRepository, PartitionRepository, UserRepository,
};
use warden_infra_db::PgClient;
use warden_infra_push::{FcmClient, PushError, ServiceAccountCredentials};
use warden_infra_vault::{ApkVault, ArtifactCache, DiskApkVault, VaultError};
use warden_shared_argus::metrics::MetricsRegistry;

use crate::config::OverseerConfig;
use crate::services::alert_engine::AlertEngineService;
use crate::services::command_dispatcher::CommandDispatcher;
use crate::services::deployment_controller::DeploymentControllerService;
use crate::services::event_flush::EventFlushWorker;
use crate::services::fast_reads::FastReadService;
use crate::services::perf_harness::PerfDiffHarness;
use crate::services::purge::PurgeWorker;
use crate::services::reconciliation::ReconciliationJob;
use crate::services::webhook::WebhookClient;
use crate::state::alert_trackers::AlertSuppressionTrackers;
use crate::state::event_queue::DeviceEventQueue;
use crate::state::purge_queue::PurgeQueue;
use crate::state::response_cache::ResponseCache;

/**
 * Contenedor de estado compartido (Thread-Safe) del Overseer.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Configuración soberana capturada en la ignición.
    pub config: Arc<OverseerConfig>,
    /// Cliente táctico del cluster PostgreSQL.
    pub database_client: PgClient,
    /// Registro de métricas de la flota.
    pub metrics: Arc<MetricsRegistry>,

    // --- ESTRATO L3: REPOSITORIOS SOBERANOS ---
    pub device_repository: Arc<DeviceRepository>,
    pub heartbeat_repository: Arc<HeartbeatRepository>,
    pub ledger_repository: Arc<CommandLedgerRepository>,
    pub alert_state_repository: Arc<AlertStateRepository>,
    pub deployment_repository: Arc<DeploymentRepository>,
    pub apk_repository: Arc<ApkRepository>,
    pub partition_repository: Arc<PartitionRepository>,
    pub event_repository: Arc<DeviceEventRepository>,
    pub user_repository: Arc<UserRepository>,

    // --- ESTRATO L3: MEMORIA CALIENTE ---
    pub event_queue: Arc<DeviceEventQueue>,
    pub purge_queue: Arc<PurgeQueue>,
    pub response_cache: Arc<ResponseCache>,
    pub artifact_cache: Arc<ArtifactCache>,
    pub suppression_trackers: Arc<AlertSuppressionTrackers>,

    // --- ESTRATO L3: BÓVEDA DE ARTEFACTOS ---
    pub apk_vault: Arc<dyn ApkVault>,

    // --- ESTRATO L4: SERVICIOS DE MANDO ---
    pub dispatcher: Arc<CommandDispatcher>,
    pub webhook_client: Arc<WebhookClient>,
    pub alert_engine: Arc<AlertEngineService>,
    pub deployment_controller: Arc<DeploymentControllerService>,
    pub fast_reads: Arc<FastReadService>,
    pub purge_worker: Arc<PurgeWorker>,
    pub reconciliation_job: Arc<ReconciliationJob>,
    pub event_flush_worker: Arc<EventFlushWorker>,
}

impl AppState {
    /**
     * Forja el Estado Maestro inyectando todas las dependencias.
     *
     * # Errors:
     * `VaultError::Unavailable` si la raíz de la bóveda no monta.
     */
    pub async fn forge(config: OverseerConfig, database_client: PgClient) -> Result<Self, VaultError> {
        debug!("🧬 [APP_STATE]: Executing sovereign ignition sequence V12.0...");

        let config = Arc::new(config);
        let metrics = Arc::new(MetricsRegistry::new());

        // Pre-hidratación de repositorios soberanos.
        let device_repository = Arc::new(DeviceRepository::new(database_client.clone()));
        let heartbeat_repository = Arc::new(HeartbeatRepository::new(database_client.clone()));
        let ledger_repository = Arc::new(CommandLedgerRepository::new(database_client.clone()));
        let alert_state_repository = Arc::new(AlertStateRepository::new(database_client.clone()));
        let deployment_repository = Arc::new(DeploymentRepository::new(database_client.clone()));
        let apk_repository = Arc::new(ApkRepository::new(database_client.clone()));
        let partition_repository = Arc::new(PartitionRepository::new(database_client.clone()));
        let event_repository = Arc::new(DeviceEventRepository::new(database_client.clone()));
        let user_repository = Arc::new(UserRepository::new(database_client.clone()));

        // Memoria caliente.
        let event_queue = Arc::new(DeviceEventQueue::with_defaults());
        let purge_queue = Arc::new(PurgeQueue::new());
        let response_cache = Arc::new(ResponseCache::new());
        let artifact_cache = Arc::new(ArtifactCache::with_defaults());
        let suppression_trackers = Arc::new(AlertSuppressionTrackers::new());

        // Bóveda de artefactos sobre almacenamiento montado.
        let apk_vault: Arc<dyn ApkVault> = Arc::new(DiskApkVault::open(config.vault_root.clone()).await?);

        // Uplink push: degradación silenciosa sin credenciales.
        let push_client = match ServiceAccountCredentials::from_environment() {
            Ok(credentials) => match FcmClient::new(credentials) {
                Ok(client) => Some(Arc::new(client)),
                Err(client_fault) => {
                    warn!("⚠️  [PUSH_STANDBY]: Provider client rejected: {}", client_fault);
                    None
                }
            },
            Err(PushError::CredentialsMissing(missing_detail)) => {
                warn!("⚠️  [PUSH_STANDBY]: {} — command dispatch degraded.", missing_detail);
                None
            }
            Err(credentials_fault) => {
                warn!("⚠️  [PUSH_STANDBY]: Credentials rejected: {}", credentials_fault);
                None
            }
        };

        // Servicios de mando.
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&ledger_repository),
            Arc::clone(&device_repository),
            Arc::clone(&apk_repository),
            push_client,
            Arc::clone(&metrics),
            config.hmac_secret.clone(),
            config.server_url.clone(),
        ));

        let webhook_client = Arc::new(WebhookClient::new(
            config.discord_webhook_url.clone(),
            config.server_url.clone(),
        ));

        let alert_engine = Arc::new(AlertEngineService::new(
            database_client.clone(),
            Arc::clone(&device_repository),
            Arc::clone(&heartbeat_repository),
            Arc::clone(&alert_state_repository),
            Arc::clone(&dispatcher),
            Arc::clone(&webhook_client),
            Arc::clone(&suppression_trackers),
            Arc::clone(&metrics),
            config.alerts.clone(),
        ));

        let deployment_controller = Arc::new(DeploymentControllerService::new(
            Arc::clone(&deployment_repository),
            Arc::clone(&device_repository),
            Arc::clone(&apk_repository),
            Arc::clone(&dispatcher),
            Arc::clone(&metrics),
        ));

        let perf_harness = Arc::new(PerfDiffHarness::new(config.perf_diff_enabled, Arc::clone(&metrics)));
        let fast_reads = Arc::new(FastReadService::new(
            Arc::clone(&heartbeat_repository),
            perf_harness,
            Arc::clone(&metrics),
            config.read_from_last_status,
        ));

        let purge_worker = Arc::new(PurgeWorker::new(
            database_client.clone(),
            Arc::clone(&purge_queue),
            Arc::clone(&heartbeat_repository),
            Arc::clone(&ledger_repository),
            Arc::clone(&event_repository),
            Arc::clone(&metrics),
        ));

        let reconciliation_job = Arc::new(ReconciliationJob::new(
            database_client.clone(),
            Arc::clone(&heartbeat_repository),
            Arc::clone(&metrics),
        ));

        let event_flush_worker = Arc::new(EventFlushWorker::new(
            Arc::clone(&event_queue),
            Arc::clone(&event_repository),
            Arc::clone(&metrics),
        ));

        Ok(Self {
            config,
            database_client,
            metrics,
            device_repository,
            heartbeat_repository,
            ledger_repository,
            alert_state_repository,
            deployment_repository,
            apk_repository,
            partition_repository,
            event_repository,
            user_repository,
            event_queue,
            purge_queue,
            response_cache,
            artifact_cache,
            suppression_trackers,
            apk_vault,
            dispatcher,
            webhook_client,
            alert_engine,
            deployment_controller,
            fast_reads,
            purge_worker,
            reconciliation_job,
            event_flush_worker,
        })
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/state/mod.rs]
