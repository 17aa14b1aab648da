// [libs/infra/db/src/repositories/event.rs]
/*!
 * =================================================================
 * APARATO: DEVICE EVENT REPOSITORY (V5.0 - AUDIT TRAIL)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CRISTALIZACIÓN POR LOTES DEL RASTRO DE EVENTOS
 *
 * # Mathematical Proof (Bulk Efficiency):
 * Al encapsular N eventos en una sola ráfaga transaccional, el coste de
 * sincronización de red se amortiza de O(N) a O(1) transacciones,
 * permitiendo drenar la cola en RAM sin degradar el camino de petición.
 * =================================================================
 */

use crate::errors::DbError;
use crate::PgClient;
use tracing::{debug, instrument};
use warden_domain_models::device::DeviceEvent;

/// Autoridad única sobre la tabla 'device_events'.
pub struct DeviceEventRepository {
    database_client: PgClient,
}

impl DeviceEventRepository {
    #[must_use]
    pub fn new(database_client: PgClient) -> Self {
        Self { database_client }
    }

    /**
     * Cristaliza una ráfaga de eventos drenada de la cola en RAM.
     *
     * @returns cantidad de eventos asegurados en el rastro.
     */
    #[instrument(skip(self, event_batch), fields(count = event_batch.len()))]
    pub async fn bulk_insert(&self, event_batch: &[DeviceEvent]) -> Result<usize, DbError> {
        if event_batch.is_empty() {
            return Ok(0);
        }

        let mut bulk_transaction = self.database_client.pool().begin().await?;

        for audited_event in event_batch {
            sqlx::query(
                "INSERT INTO device_events (device_id, event_type, ts, details_json)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&audited_event.device_id)
            .bind(&audited_event.event_type)
            .bind(audited_event.ts)
            .bind(&audited_event.details_json)
            .execute(&mut *bulk_transaction)
            .await?;
        }

        bulk_transaction.commit().await?;

        debug!("✅ [EVENT_TRAIL]: {} events secured in the audit ledger.", event_batch.len());
        Ok(event_batch.len())
    }

    /// Purga del rastro de eventos de un dispositivo (fan-out del Reaper).
    pub async fn delete_for_device(&self, device_identifier: &str) -> Result<u64, DbError> {
        let deletion_result = sqlx::query("DELETE FROM device_events WHERE device_id = $1")
            .bind(device_identifier)
            .execute(self.database_client.pool())
            .await?;
        Ok(deletion_result.rows_affected())
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/event.rs]
