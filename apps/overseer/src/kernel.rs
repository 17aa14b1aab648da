// INICIO DEL ARCHIVO [apps/overseer/src/kernel.rs]
/**
 * =================================================================
 * APARATO: OVERSEER SOVEREIGN KERNEL (V15.0 - GUARD ACTIVE)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los servicios:
 * enlace PostgreSQL, ventana de particiones, estado neural, daemons
 * de mantenimiento y el transporte HTTP. La ventana de particiones se
 * materializa ANTES de abrir el socket: un latido jamás aterriza sin
 * su hija física.
 * =================================================================
 */

use crate::config::OverseerConfig;
use crate::routes::create_sovereign_router;
use crate::services::scheduler::WorkerSupervisor;
use crate::state::AppState;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info, instrument};
use warden_infra_db::PgClient;

pub struct OverseerKernel {
    pub application_shared_state: AppState,
    pub worker_supervisor: WorkerSupervisor,
}

impl OverseerKernel {
    /**
     * Realiza la ignición del cliente táctico y el estado neural.
     * Establece la conexión a la base de datos y materializa la ventana
     * de particiones antes de levantar servicios.
     */
    #[instrument(skip(config))]
    pub async fn ignite(config: OverseerConfig) -> Self {
        let database_client = PgClient::connect(&config.database_url)
            .await
            .expect("FATAL: Database link collapse. Ignition aborted.");

        let application_shared_state = AppState::forge(config, database_client)
            .await
            .expect("FATAL: Application state forge collapse. Ignition aborted.");

        // La ventana [−90d, +14d] debe existir antes del primer latido.
        application_shared_state
            .partition_repository
            .ensure_window(chrono::Utc::now())
            .await
            .expect("FATAL: Partition window could not be materialized.");

        Self {
            application_shared_state,
            worker_supervisor: WorkerSupervisor::new(),
        }
    }

    /**
     * Lanza todas las operaciones autónomas de la flota:
     * daemons de mantenimiento y el servidor HTTP principal.
     */
    pub async fn launch_sovereign_operations(self) {
        let shared_state = self.application_shared_state.clone();

        // --- 1. DESPLIEGUE DE DAEMONS DE MANTENIMIENTO TÁCTICO ---

        // A. Centinela de alertas (evaluación + supresión + webhook).
        self.worker_supervisor.spawn_alert_loop(Arc::clone(&shared_state.alert_engine));

        // B. Reaper de purga histórica (advisory lock de flota).
        self.worker_supervisor.spawn_purge_loop(Arc::clone(&shared_state.purge_worker));

        // C. Limpieza de selecciones transitorias expiradas.
        self.worker_supervisor
            .spawn_selection_cleanup_loop(Arc::clone(&shared_state.device_repository));

        // D. Volcado write-behind del rastro de eventos.
        self.worker_supervisor
            .spawn_event_flush_loop(Arc::clone(&shared_state.event_flush_worker));

        // E. Reconciliación horaria de la proyección caliente.
        self.worker_supervisor
            .spawn_reconciliation_loop(Arc::clone(&shared_state.reconciliation_job));

        // F. Comandante de despliegues por olas.
        self.worker_supervisor
            .spawn_deployment_loop(Arc::clone(&shared_state.deployment_controller));

        // G. Custodio diario de la ventana de particiones.
        self.worker_supervisor
            .spawn_partition_maintenance_loop(Arc::clone(&shared_state.partition_repository));

        // H. Radar de saturación del pool.
        self.worker_supervisor
            .spawn_pool_health_loop(shared_state.database_client.clone(), Arc::clone(&shared_state.metrics));

        // --- 2. IGNICIÓN DEL TRANSPORTE HTTP (AXUM) ---
        let listening_port = shared_state.config.listen_port;
        let sovereign_router = create_sovereign_router(shared_state);

        let bind_address =
            SocketAddr::new("0.0.0.0".parse::<IpAddr>().expect("unspecified address literal"), listening_port);

        info!("🚀 [KERNEL_ONLINE]: Warden Overseer listening at {}", bind_address);

        let tcp_listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: Failed to bind network port.");

        if let Err(server_error) = axum::serve(tcp_listener, sovereign_router).await {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_error);
            std::process::exit(1);
        }
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/kernel.rs]
