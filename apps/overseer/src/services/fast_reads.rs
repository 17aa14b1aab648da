// [apps/overseer/src/services/fast_reads.rs]
/*!
 * =================================================================
 * APARATO: FAST READ SERVICE (V7.0 - PROJECTION GATED)
 * CLASIFICACIÓN: SERVICE LAYER (ESTRATO L4)
 * RESPONSABILIDAD: LECTURAS O(1) SOBRE LA PROYECCIÓN, CON BANDERA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FLAG GATED: 'READ_FROM_LAST_STATUS' decide el camino servido; el
 *    camino legado de escaneo del log se conserva intacto detrás.
 * 2. SHADOW COMPARISON: Con el arnés habilitado, ambos caminos corren
 *    para la misma petición y sus latencias se registran lado a lado
 *    sin alterar la respuesta.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Instant;

use warden_domain_models::device::DeviceLastStatus;
use warden_infra_db::repositories::HeartbeatRepository;
use warden_infra_db::DbError;
use warden_shared_argus::metrics::MetricsRegistry;

use crate::services::perf_harness::PerfDiffHarness;

pub struct FastReadService {
    heartbeat_repository: Arc<HeartbeatRepository>,
    perf_harness: Arc<PerfDiffHarness>,
    metrics: Arc<MetricsRegistry>,
    read_from_last_status: bool,
}

impl FastReadService {
    #[must_use]
    pub fn new(
        heartbeat_repository: Arc<HeartbeatRepository>,
        perf_harness: Arc<PerfDiffHarness>,
        metrics: Arc<MetricsRegistry>,
        read_from_last_status: bool,
    ) -> Self {
        Self {
            heartbeat_repository,
            perf_harness,
            metrics,
            read_from_last_status,
        }
    }

    /**
     * Estado puntual de un dispositivo por el camino vigente.
     * Con el arnés activo, el camino sombra corre y se mide también.
     */
    pub async fn device_status(&self, device_identifier: &str) -> Result<Option<DeviceLastStatus>, DbError> {
        if self.perf_harness.is_enabled() {
            return self.device_status_dual_path(device_identifier).await;
        }

        let read_started = Instant::now();
        let status = if self.read_from_last_status {
            self.heartbeat_repository.fetch_last_status(device_identifier).await?
        } else {
            self.heartbeat_repository.legacy_latest_sample(device_identifier).await?
        };

        self.metrics.observe_histogram(
            "last_status_read_latency_ms",
            &[("query", "device_status")],
            read_started.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(status)
    }

    async fn device_status_dual_path(
        &self,
        device_identifier: &str,
    ) -> Result<Option<DeviceLastStatus>, DbError> {
        let legacy_started = Instant::now();
        let legacy_result = self.heartbeat_repository.legacy_latest_sample(device_identifier).await;
        let legacy_latency_ms = legacy_started.elapsed().as_secs_f64() * 1000.0;

        let fast_started = Instant::now();
        let fast_result = self.heartbeat_repository.fetch_last_status(device_identifier).await;
        let fast_latency_ms = fast_started.elapsed().as_secs_f64() * 1000.0;

        self.perf_harness
            .record_comparison("device_status", legacy_latency_ms, fast_latency_ms);

        // La respuesta servida sigue a la bandera; el arnés sólo observa.
        if self.read_from_last_status {
            match fast_result {
                Ok(status) => Ok(status),
                Err(_) => legacy_result,
            }
        } else {
            legacy_result.or(fast_result)
        }
    }

    /// Lectura por lotes de la proyección para el listado de la flota.
    pub async fn statuses_for(&self, device_identifiers: &[String]) -> Result<Vec<DeviceLastStatus>, DbError> {
        self.heartbeat_repository.fetch_statuses_for(device_identifiers).await
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/fast_reads.rs]
