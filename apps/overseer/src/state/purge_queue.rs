// [apps/overseer/src/state/purge_queue.rs]
/*!
 * =================================================================
 * APARATO: PURGE JOB QUEUE (V5.0 - REAPER INBOX)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L3)
 * RESPONSABILIDAD: COLA FIFO DE TRABAJOS DE PURGA HISTÓRICA
 * =================================================================
 */

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

/// Trabajo de purga encolado por el operador.
#[derive(Debug, Clone)]
pub struct PurgeJob {
    pub job_id: Uuid,
    pub request_id: String,
    pub device_ids: Vec<String>,
    pub purge_history: bool,
    pub enqueued_at: DateTime<Utc>,
}

/**
 * Bandeja FIFO del Reaper. El worker de purga la drena bajo advisory
 * lock con presupuesto de tiempo; el encolado jamás bloquea.
 */
pub struct PurgeQueue {
    pending_jobs: Mutex<VecDeque<PurgeJob>>,
}

impl Default for PurgeQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PurgeQueue {
    #[must_use]
    pub fn new() -> Self {
        Self { pending_jobs: Mutex::new(VecDeque::new()) }
    }

    /// Encola un trabajo y retorna su identificador de seguimiento.
    pub fn enqueue(
        &self,
        request_id: &str,
        device_ids: Vec<String>,
        purge_history: bool,
        enqueued_at: DateTime<Utc>,
    ) -> Uuid {
        let forged_job = PurgeJob {
            job_id: Uuid::new_v4(),
            request_id: request_id.to_string(),
            device_ids,
            purge_history,
            enqueued_at,
        };
        let job_identifier = forged_job.job_id;

        let mut queue_guard = self.pending_jobs.lock().expect("LOCK_POISONED: Purge queue compromised.");
        queue_guard.push_back(forged_job);
        job_identifier
    }

    /// Extrae el siguiente trabajo en orden de llegada.
    #[must_use]
    pub fn pop_next(&self) -> Option<PurgeJob> {
        let mut queue_guard = self.pending_jobs.lock().expect("LOCK_POISONED: Purge queue compromised.");
        queue_guard.pop_front()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        let queue_guard = self.pending_jobs.lock().expect("LOCK_POISONED: Purge queue compromised.");
        queue_guard.len()
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/state/purge_queue.rs]
