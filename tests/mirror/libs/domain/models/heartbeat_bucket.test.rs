// [tests/mirror/libs/domain/models/heartbeat_bucket.test.rs]
/**
 * =================================================================
 * APARATO: HEARTBEAT BUCKET TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL CUBO DE DEDUPLICACIÓN DE 10s
 * =================================================================
 */

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use warden_domain_models::heartbeat::dedupe_bucket;

#[test]
fn certify_two_pulses_within_ten_seconds_share_the_bucket() {
    println!("\n📡 [PROVING_GROUNDS]: Auditing 10s bucket collision...");

    // 1. SETUP: Dos latidos separados por 2 segundos dentro de la misma ranura.
    let first_pulse = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 21).unwrap();
    let second_pulse = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 23).unwrap();

    // 2. VALIDATION: La llave de deduplicación debe colisionar.
    assert_eq!(dedupe_bucket(first_pulse), dedupe_bucket(second_pulse));

    println!("   ✅ [SUCCESS]: Duplicate pulses collapse into one bucket.");
}

#[test]
fn certify_pulses_across_slot_boundary_diverge() {
    println!("\n📡 [PROVING_GROUNDS]: Auditing slot boundary divergence...");

    // 28s y 31s caen en ranuras 2 y 3 del mismo minuto.
    let pulse_before_boundary = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 28).unwrap();
    let pulse_after_boundary = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 31).unwrap();

    assert_ne!(dedupe_bucket(pulse_before_boundary), dedupe_bucket(pulse_after_boundary));

    println!("   ✅ [SUCCESS]: Boundary pulses persist as distinct rows.");
}

#[test]
fn certify_minute_truncation_anchors_the_bucket() {
    let pulse = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 47).unwrap();
    let bucket = dedupe_bucket(pulse);

    assert_eq!(bucket.minute_floor, Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 0).unwrap());
    assert_eq!(bucket.ten_second_slot, 4);
}

proptest! {
    /// Invariante: la ranura vive siempre en [0, 6) y es estable dentro
    /// de la misma ventana floor(epoch/10).
    #[test]
    fn bucket_slot_always_within_six_slots(epoch_seconds in 0i64..4_000_000_000i64, jitter in 0i64..10i64) {
        let base_pulse = Utc.timestamp_opt(epoch_seconds - epoch_seconds % 10, 0).unwrap();
        let jittered_pulse = Utc.timestamp_opt(epoch_seconds - epoch_seconds % 10 + jitter, 0).unwrap();

        let base_bucket = dedupe_bucket(base_pulse);
        let jittered_bucket = dedupe_bucket(jittered_pulse);

        prop_assert!((0..6).contains(&base_bucket.ten_second_slot));
        prop_assert_eq!(base_bucket, jittered_bucket);
    }
}
