// [tests/mirror/apps/overseer/services/suppression_pipeline.test.rs]
/**
 * =================================================================
 * APARATO: SUPPRESSION PIPELINE TEST (V6.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: COOLDOWN, CAP GLOBAL Y ROLL-UP DEL CENTINELA
 * =================================================================
 */

use chrono::{Duration, TimeZone, Utc};
use warden_domain_models::alert::AlertCondition;
use warden_overseer::config::AlertConfig;
use warden_overseer::services::alert_engine::{in_cooldown, suppression_decision, SuppressionOutcome};
use warden_overseer::state::alert_trackers::AlertSuppressionTrackers;

fn sentinel_config() -> AlertConfig {
    AlertConfig {
        offline_minutes: 12,
        low_battery_pct: 15,
        device_cooldown_min: 30,
        global_cap_per_min: 60,
        rollup_threshold: 10,
        enable_autoremediation: false,
        unity_down_require_consecutive: false,
    }
}

#[test]
fn certify_device_cooldown_silences_reraises_for_thirty_minutes() {
    println!("\n🔕 [PROVING_GROUNDS]: Auditing per-device cooldown window...");

    let config = sentinel_config();
    let trackers = AlertSuppressionTrackers::new();
    let raise_instant = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    // t=0: sin cooldown previo, la elevación procede a entrega.
    let first_decision = suppression_decision(
        None,
        &trackers,
        AlertCondition::Offline,
        "unit-042",
        "S21-Lobby",
        &config,
        raise_instant,
    );
    assert!(matches!(first_decision, SuppressionOutcome::Deliver));

    // Tras la entrega, el estado sella cooldown_until = t0 + 30m.
    let cooldown_until = Some(raise_instant + Duration::minutes(config.device_cooldown_min));

    // t=5m: la condición persiste pero el webhook NO debe sonar.
    let within_cooldown = suppression_decision(
        cooldown_until,
        &trackers,
        AlertCondition::Offline,
        "unit-042",
        "S21-Lobby",
        &config,
        raise_instant + Duration::minutes(5),
    );
    assert!(matches!(within_cooldown, SuppressionOutcome::Cooldown));

    // t=31m: el cooldown venció, el webhook vuelve a sonar.
    let past_cooldown = suppression_decision(
        cooldown_until,
        &trackers,
        AlertCondition::Offline,
        "unit-042",
        "S21-Lobby",
        &config,
        raise_instant + Duration::minutes(31),
    );
    assert!(matches!(past_cooldown, SuppressionOutcome::Deliver));

    assert!(in_cooldown(cooldown_until, raise_instant + Duration::minutes(29)));
    assert!(!in_cooldown(cooldown_until, raise_instant + Duration::minutes(30)));

    println!("   ✅ [SUCCESS]: 30-minute silence certified at t=5m, lifted at t=31m.");
}

#[test]
fn certify_global_cap_drops_the_over_quota_raise() {
    println!("\n🔕 [PROVING_GROUNDS]: Auditing the 60s global cap...");

    let trackers = AlertSuppressionTrackers::new();
    let window_instant = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    // Cap de 3 para el ejercicio: las tres primeras pasan, la cuarta cae.
    assert!(!trackers.global_cap_exceeded(window_instant, 3));
    assert!(!trackers.global_cap_exceeded(window_instant, 3));
    assert!(!trackers.global_cap_exceeded(window_instant, 3));
    assert!(trackers.global_cap_exceeded(window_instant, 3));

    // 61 segundos después, la ventana deslizó y el cupo renace.
    assert!(!trackers.global_cap_exceeded(window_instant + Duration::seconds(61), 3));

    println!("   ✅ [SUCCESS]: Sliding window cap certified.");
}

#[test]
fn certify_rollup_aggregates_a_storm_into_one_message() {
    println!("\n📊 [PROVING_GROUNDS]: Auditing roll-up fan-in (12 devices, threshold 10)...");

    let trackers = AlertSuppressionTrackers::new();
    let storm_instant = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    // 12 dispositivos disparan UNITY_DOWN dentro de la misma ventana.
    for device_ordinal in 0..12 {
        trackers.track_for_rollup(
            AlertCondition::UnityDown,
            &format!("unit-{:03}", device_ordinal),
            &format!("Kiosk-{}", device_ordinal),
            storm_instant + Duration::seconds(device_ordinal),
        );
    }

    // El umbral 10 gatilla la agregación con la lista completa.
    let aggregated = trackers
        .rollup_ready(AlertCondition::UnityDown, storm_instant + Duration::seconds(12), 10)
        .expect("threshold reached");
    assert!(aggregated.len() >= 10);
    assert_eq!(aggregated.len(), 12);

    // Tras el envío agregado, la ventana se limpia por contrato.
    trackers.clear_rollup(AlertCondition::UnityDown);
    assert!(trackers
        .rollup_ready(AlertCondition::UnityDown, storm_instant + Duration::seconds(13), 10)
        .is_none());

    // Otras condiciones jamás comparten ventana.
    trackers.track_for_rollup(AlertCondition::Offline, "unit-900", "Gate-9", storm_instant);
    assert!(trackers.rollup_ready(AlertCondition::Offline, storm_instant, 10).is_none());

    println!("   ✅ [SUCCESS]: One aggregated message supersedes 12 individuals.");
}

#[test]
fn certify_rollup_window_slides_out_stale_entries() {
    let trackers = AlertSuppressionTrackers::new();
    let base_instant = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    for device_ordinal in 0..9 {
        trackers.track_for_rollup(
            AlertCondition::UnityDown,
            &format!("unit-{:03}", device_ordinal),
            "Kiosk",
            base_instant,
        );
    }

    // 61s después, las nueve entradas envejecieron fuera de la ventana:
    // una décima entrada fresca no alcanza el umbral.
    trackers.track_for_rollup(AlertCondition::UnityDown, "unit-fresh", "Kiosk", base_instant + Duration::seconds(61));
    assert!(trackers
        .rollup_ready(AlertCondition::UnityDown, base_instant + Duration::seconds(61), 10)
        .is_none());
}
