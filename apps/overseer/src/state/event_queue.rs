// [apps/overseer/src/state/event_queue.rs]
/*!
 * =================================================================
 * APARATO: DEVICE EVENT QUEUE (V6.1 - WRITE-BEHIND BUFFER)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L3)
 * RESPONSABILIDAD: COLA ACOTADA EN RAM PARA EL RASTRO DE EVENTOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NEVER BLOCK: El camino del latido jamás espera por la cola; al
 *    desbordarse, el evento se descarta y se cuenta — señal de presión,
 *    no de fallo.
 * 2. ATOMIC DRAIN: El worker de volcado drena hasta 50 eventos por
 *    ráfaga bajo un único cerrojo de corta duración.
 * =================================================================
 */

use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::warn;
use warden_domain_models::device::DeviceEvent;

/// Capacidad nominal de la cola de eventos en RAM.
pub const EVENT_QUEUE_CAPACITY: usize = 10_000;
/// Tamaño máximo de ráfaga drenada por el worker de volcado.
pub const EVENT_DRAIN_BATCH_SIZE: usize = 50;

/// Radiografía de la cola para diagnósticos del operador.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct EventQueueStatistics {
    pub enqueued: u64,
    pub processed: u64,
    pub dropped: u64,
    pub depth: usize,
}

#[derive(Default)]
struct QueueInner {
    pending_events: VecDeque<DeviceEvent>,
    enqueued: u64,
    processed: u64,
    dropped: u64,
}

/**
 * Cola acotada de eventos con contabilidad de presión.
 */
pub struct DeviceEventQueue {
    capacity: usize,
    inner: Mutex<QueueInner>,
}

impl DeviceEventQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(QueueInner::default()) }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(EVENT_QUEUE_CAPACITY)
    }

    /**
     * Encola un evento sin bloquear jamás el camino de la petición.
     *
     * @returns 'false' si la cola estaba llena y el evento se descartó.
     */
    pub fn enqueue(&self, audited_event: DeviceEvent) -> bool {
        let mut queue_guard = self.inner.lock().expect("LOCK_POISONED: Event queue compromised.");

        if queue_guard.pending_events.len() >= self.capacity {
            queue_guard.dropped += 1;
            warn!(
                "⚠️  [EVENT_QUEUE_FULL]: Event {} for {} dropped under pressure.",
                audited_event.event_type, audited_event.device_id
            );
            return false;
        }

        queue_guard.pending_events.push_back(audited_event);
        queue_guard.enqueued += 1;
        true
    }

    /// Drena hasta 'max_batch_size' eventos para la cristalización por lotes.
    #[must_use]
    pub fn drain_batch(&self, max_batch_size: usize) -> Vec<DeviceEvent> {
        let mut queue_guard = self.inner.lock().expect("LOCK_POISONED: Event queue compromised.");

        let drain_count = queue_guard.pending_events.len().min(max_batch_size);
        queue_guard.pending_events.drain(..drain_count).collect()
    }

    /// Contabiliza una ráfaga cristalizada con éxito.
    pub fn mark_processed(&self, processed_count: usize) {
        let mut queue_guard = self.inner.lock().expect("LOCK_POISONED: Event queue compromised.");
        queue_guard.processed += processed_count as u64;
    }

    #[must_use]
    pub fn statistics(&self) -> EventQueueStatistics {
        let queue_guard = self.inner.lock().expect("LOCK_POISONED: Event queue compromised.");
        EventQueueStatistics {
            enqueued: queue_guard.enqueued,
            processed: queue_guard.processed,
            dropped: queue_guard.dropped,
            depth: queue_guard.pending_events.len(),
        }
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/state/event_queue.rs]
