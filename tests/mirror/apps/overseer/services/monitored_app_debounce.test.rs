// [tests/mirror/apps/overseer/services/monitored_app_debounce.test.rs]
/**
 * =================================================================
 * APARATO: MONITORED APP DEBOUNCE TEST (V5.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: UMBRAL Y EVALUACIONES CONSECUTIVAS DE UNITY_DOWN
 * =================================================================
 */

use chrono::{Duration, TimeZone, Utc};
use warden_overseer::services::alert_engine::{
    judge_low_battery, judge_offline, judge_unity_down, UnityDownVerdict,
};

#[test]
fn certify_running_app_keeps_the_condition_clear() {
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    assert_eq!(judge_unity_down(Some(true), None, 10, false, now), UnityDownVerdict::Clear);
    // Sin señal tampoco se eleva: el centinela jamás adivina.
    assert_eq!(judge_unity_down(None, None, 10, false, now), UnityDownVerdict::Clear);
}

#[test]
fn certify_threshold_arms_before_breaching() {
    println!("\n⏲️  [PROVING_GROUNDS]: Auditing the arming window...");

    let condition_started = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    // Primera observación caída: arma sin marca previa.
    assert_eq!(
        judge_unity_down(Some(false), None, 10, false, condition_started),
        UnityDownVerdict::Arming
    );

    // A los 9 minutos el umbral de 10 aún no vence.
    let nine_minutes_in = condition_started + Duration::minutes(9);
    assert_eq!(
        judge_unity_down(Some(false), Some(condition_started), 10, false, nine_minutes_in),
        UnityDownVerdict::Arming
    );

    // A los 10 minutos, sin debounce consecutivo, la condición eleva.
    let ten_minutes_in = condition_started + Duration::minutes(10);
    assert_eq!(
        judge_unity_down(Some(false), Some(condition_started), 10, false, ten_minutes_in),
        UnityDownVerdict::Breached
    );

    println!("   ✅ [SUCCESS]: Breach lands exactly at the configured threshold.");
}

#[test]
fn certify_consecutive_gate_demands_one_extra_evaluation() {
    println!("\n⏲️  [PROVING_GROUNDS]: Auditing the consecutive-evaluation gate...");

    let condition_started = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    // Con el gate activo, cruzar el umbral en esta evaluación no basta…
    let at_threshold = condition_started + Duration::minutes(10);
    assert_eq!(
        judge_unity_down(Some(false), Some(condition_started), 10, true, at_threshold),
        UnityDownVerdict::Arming
    );

    // …la evaluación siguiente (60s después) certifica la persistencia.
    let one_tick_later = at_threshold + Duration::seconds(60);
    assert_eq!(
        judge_unity_down(Some(false), Some(condition_started), 10, true, one_tick_later),
        UnityDownVerdict::Breached
    );

    println!("   ✅ [SUCCESS]: Two consecutive beyond-threshold evaluations required.");
}

#[test]
fn certify_offline_and_battery_judges() {
    let last_pulse = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    assert!(!judge_offline(last_pulse, 12, last_pulse + Duration::minutes(12)));
    assert!(judge_offline(last_pulse, 12, last_pulse + Duration::minutes(13)));

    assert!(judge_low_battery(Some(15), 15));
    assert!(judge_low_battery(Some(3), 15));
    assert!(!judge_low_battery(Some(16), 15));
    assert!(!judge_low_battery(None, 15));
}
