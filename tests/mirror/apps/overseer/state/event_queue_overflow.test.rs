// [tests/mirror/apps/overseer/state/event_queue_overflow.test.rs]
/**
 * =================================================================
 * APARATO: EVENT QUEUE OVERFLOW TEST (V5.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: PRESIÓN, DESCARTE CONTADO Y DRENAJE POR RÁFAGAS
 * =================================================================
 */

use chrono::{TimeZone, Utc};
use warden_domain_models::device::DeviceEvent;
use warden_overseer::state::event_queue::DeviceEventQueue;

fn forge_event(ordinal: usize) -> DeviceEvent {
    DeviceEvent {
        device_id: format!("unit-{:03}", ordinal),
        event_type: "heartbeat.received".to_string(),
        ts: Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap(),
        details_json: None,
    }
}

#[test]
fn certify_overflow_drops_and_counts_without_blocking() {
    println!("\n📮 [PROVING_GROUNDS]: Auditing bounded queue pressure...");

    // 1. SETUP: cola de 3 posiciones recibiendo 5 eventos.
    let bounded_queue = DeviceEventQueue::new(3);

    for ordinal in 0..5 {
        bounded_queue.enqueue(forge_event(ordinal));
    }

    // 2. VALIDATION: 3 aceptados, 2 descartados y contados.
    let statistics = bounded_queue.statistics();
    assert_eq!(statistics.enqueued, 3);
    assert_eq!(statistics.dropped, 2);
    assert_eq!(statistics.depth, 3);

    println!("   ✅ [SUCCESS]: Overflow counted, request path never blocked.");
}

#[test]
fn certify_drain_respects_batch_ceiling_and_fifo_order() {
    let bounded_queue = DeviceEventQueue::new(100);

    for ordinal in 0..7 {
        bounded_queue.enqueue(forge_event(ordinal));
    }

    // Ráfaga limitada a 5: el orden FIFO se preserva.
    let first_burst = bounded_queue.drain_batch(5);
    assert_eq!(first_burst.len(), 5);
    assert_eq!(first_burst[0].device_id, "unit-000");
    assert_eq!(first_burst[4].device_id, "unit-004");

    bounded_queue.mark_processed(first_burst.len());

    let second_burst = bounded_queue.drain_batch(5);
    assert_eq!(second_burst.len(), 2);
    assert_eq!(second_burst[0].device_id, "unit-005");

    let statistics = bounded_queue.statistics();
    assert_eq!(statistics.processed, 5);
    assert_eq!(statistics.depth, 0);

    // Una cola seca drena vacío sin protestar.
    assert!(bounded_queue.drain_batch(5).is_empty());
}
