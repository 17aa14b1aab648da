// [apps/overseer/src/services/event_flush.rs]
/*!
 * =================================================================
 * APARATO: EVENT FLUSH WORKER (V6.0 - WRITE-BEHIND DRAIN)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: CRISTALIZACIÓN POR RÁFAGAS DE LA COLA DE EVENTOS
 *
 * # Mathematical Proof (Write-Behind Efficiency):
 * Al diferir la escritura de eventos individuales hacia ráfagas de
 * hasta 50 cada 500ms, la contención de I/O sobre el rastro se reduce
 * en un factor N:1, donde N es la cantidad de eventos del intervalo.
 * =================================================================
 */

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use warden_infra_db::repositories::DeviceEventRepository;
use warden_infra_db::DbError;
use warden_shared_argus::metrics::MetricsRegistry;

use crate::state::event_queue::{DeviceEventQueue, EVENT_DRAIN_BATCH_SIZE};

/**
 * Worker de volcado de la cola de eventos hacia el rastro persistente.
 */
pub struct EventFlushWorker {
    event_queue: Arc<DeviceEventQueue>,
    event_repository: Arc<DeviceEventRepository>,
    metrics: Arc<MetricsRegistry>,
}

impl EventFlushWorker {
    #[must_use]
    pub fn new(
        event_queue: Arc<DeviceEventQueue>,
        event_repository: Arc<DeviceEventRepository>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self { event_queue, event_repository, metrics }
    }

    /**
     * Drena una ráfaga (≤ 50) y la cristaliza en bloque.
     *
     * @returns eventos asegurados en esta pasada.
     */
    #[instrument(skip(self))]
    pub async fn drain_once(&self) -> Result<usize, DbError> {
        let drained_batch = self.event_queue.drain_batch(EVENT_DRAIN_BATCH_SIZE);
        if drained_batch.is_empty() {
            return Ok(0);
        }

        match self.event_repository.bulk_insert(&drained_batch).await {
            Ok(crystallized_count) => {
                self.event_queue.mark_processed(crystallized_count);
                self.metrics
                    .inc_counter_by("device_events_flushed_total", &[], crystallized_count as u64);

                if crystallized_count > 10 {
                    debug!("💾 [EVENT_FLUSH]: Burst of {} events secured.", crystallized_count);
                }
                Ok(crystallized_count)
            }
            Err(flush_fault) => {
                warn!("⚠️  [EVENT_FLUSH_REJECTED]: Burst lost to persistence fault: {}", flush_fault);
                self.metrics.inc_counter("device_events_flush_errors_total", &[]);
                Err(flush_fault)
            }
        }
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/event_flush.rs]
