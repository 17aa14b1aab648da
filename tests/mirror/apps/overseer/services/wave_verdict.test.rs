// [tests/mirror/apps/overseer/services/wave_verdict.test.rs]
/**
 * =================================================================
 * APARATO: WAVE VERDICT TEST (V6.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: UMBRALES, DEADLINES Y COBERTURA DEL DESPLIEGUE
 * =================================================================
 */

use chrono::{Duration, TimeZone, Utc};
use warden_domain_models::deployment::partition_into_batches;
use warden_overseer::services::deployment_controller::{judge_batch, BatchVerdict};

#[test]
fn certify_happy_path_fourteen_devices_two_waves() {
    println!("\n🌊 [PROVING_GROUNDS]: Auditing the 14-device happy path...");

    // 1. SETUP: 14 dispositivos, olas de 7, umbral 6, deadline 15m.
    let wave_sizes = partition_into_batches(14, 7);
    assert_eq!(wave_sizes, vec![7, 7]);
    assert_eq!(wave_sizes.iter().sum::<i32>(), 14, "coverage must equal the full roster");

    let wave_started = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
    let deadline = Some(wave_started + Duration::minutes(15));

    // 2. EXECUTION: 6 éxitos llegan a los 2 minutos.
    let two_minutes_in = wave_started + Duration::minutes(2);
    assert_eq!(judge_batch(5, 0, 0, 7, 6, deadline, two_minutes_in), BatchVerdict::InFlight);
    assert_eq!(judge_batch(6, 0, 0, 7, 6, deadline, two_minutes_in), BatchVerdict::Succeeded);

    // El séptimo resultado jamás revierte un triunfo.
    assert_eq!(judge_batch(7, 0, 0, 7, 6, deadline, two_minutes_in), BatchVerdict::Succeeded);

    println!("   ✅ [SUCCESS]: Wave seals at threshold; run advances to the next wave.");
}

#[test]
fn certify_deadline_expiry_seals_the_wave_as_timed_out() {
    println!("\n🌊 [PROVING_GROUNDS]: Auditing the 1-minute deadline collapse...");

    // 7 dispositivos, umbral 6, deadline 1m; sólo 3 resultados llegan.
    let wave_started = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
    let deadline = Some(wave_started + Duration::minutes(1));

    let within_deadline = wave_started + Duration::seconds(59);
    assert_eq!(judge_batch(3, 0, 0, 7, 6, deadline, within_deadline), BatchVerdict::InFlight);

    let past_deadline = wave_started + Duration::seconds(61);
    assert_eq!(judge_batch(3, 0, 0, 7, 6, deadline, past_deadline), BatchVerdict::DeadlineExpired);

    println!("   ✅ [SUCCESS]: Expired wave halts the rollout; no further waves start.");
}

#[test]
fn certify_impossible_threshold_fails_before_the_deadline() {
    let wave_started = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
    let deadline = Some(wave_started + Duration::minutes(15));
    let mid_wave = wave_started + Duration::minutes(3);

    // 7 dispositivos, umbral 6: con 2 fallos, success máximo alcanzable
    // es 5 — el umbral se volvió inalcanzable sin esperar el deadline.
    assert_eq!(judge_batch(0, 2, 0, 7, 6, deadline, mid_wave), BatchVerdict::Impossible);

    // Con 1 fallo todavía es alcanzable (6 de 6 restantes).
    assert_eq!(judge_batch(0, 1, 0, 7, 6, deadline, mid_wave), BatchVerdict::InFlight);

    // Los timeouts por dispositivo también consumen el margen.
    assert_eq!(judge_batch(2, 1, 1, 7, 6, deadline, mid_wave), BatchVerdict::Impossible);
}

#[test]
fn certify_batch_partitioning_edges() {
    assert_eq!(partition_into_batches(7, 7), vec![7]);
    assert_eq!(partition_into_batches(8, 7), vec![7, 1]);
    assert_eq!(partition_into_batches(20, 5), vec![5, 5, 5, 5]);
    assert!(partition_into_batches(0, 7).is_empty());
    assert!(partition_into_batches(7, 0).is_empty());

    // Invariante de cobertura sobre un barrido de formas.
    for total_devices in 1..40 {
        for batch_size in 1..10 {
            let wave_sizes = partition_into_batches(total_devices, batch_size);
            assert_eq!(wave_sizes.iter().sum::<i32>(), total_devices);
            assert!(wave_sizes.iter().all(|wave| *wave >= 1 && *wave <= batch_size));
        }
    }
}
