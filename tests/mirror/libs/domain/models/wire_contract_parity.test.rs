// [tests/mirror/libs/domain/models/wire_contract_parity.test.rs]
/**
 * =================================================================
 * APARATO: WIRE CONTRACT PARITY TEST (V4.1)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: PARIDAD BIT-PERFECTA CON EL PAYLOAD DEL AGENTE
 * =================================================================
 */

use chrono::{TimeZone, Utc};
use warden_domain_models::alert::AlertCondition;
use warden_domain_models::command::{CommandAction, CommandOutcome};
use warden_domain_models::deployment::{BatchStatus, RunStatus};
use warden_domain_models::heartbeat::{HeartbeatPayload, HeartbeatSample};

/// Payload representativo tal como lo emite el agente Android.
const AGENT_HEARTBEAT_JSON: &str = r#"{
    "device_id": "unit-042",
    "alias": "S21-Lobby",
    "app_version": "1.0.234",
    "timestamp_utc": "2026-03-14T10:30:21Z",
    "app_versions": {
        "org.zwanoo.android.speedtest": {"installed": true, "version_name": "5.3.1", "version_code": 50301}
    },
    "monitored_app_signals": {"has_service_notification": false, "foreground_recent_seconds": 900},
    "battery": {"pct": 73, "charging": false, "temperature_c": 31.5},
    "system": {
        "uptime_s": 86420,
        "android_version": "14",
        "sdk_int": 34,
        "patch_level": "2026-02-05",
        "build_id": "UQ1A.240205.004",
        "model": "SM-S921B",
        "manufacturer": "samsung"
    },
    "memory": {"total_ram_mb": 8192, "avail_ram_mb": 3100, "pressure_pct": 62},
    "network": {"transport": "wifi", "ssid": "fleet-ap-3", "ip": "10.20.4.17", "signal_dbm": -58},
    "fcm_token": "fcm-token-opaque",
    "is_ping_response": true,
    "ping_request_id": "3e0f7c1a-8f1e-4e7b-9d0b-0b1a2c3d4e5f",
    "is_device_owner": true,
    "monitored_foreground_recent_s": 900
}"#;

#[test]
fn certify_agent_heartbeat_payload_parses() {
    println!("\n📜 [PROVING_GROUNDS]: Auditing agent heartbeat wire parity...");

    let payload: HeartbeatPayload =
        serde_json::from_str(AGENT_HEARTBEAT_JSON).expect("Payload del agente rechazado");

    assert_eq!(payload.alias, "S21-Lobby");
    assert_eq!(payload.battery.pct, 73);
    assert_eq!(payload.network.ssid.as_deref(), Some("fleet-ap-3"));
    assert!(!payload.monitored_app_signals.has_service_notification);
    assert_eq!(payload.system.sdk_int, 34);
    assert_eq!(payload.is_ping_response, Some(true));

    let observed_at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 21).unwrap();
    let sample = HeartbeatSample::from_payload("unit-042", &payload, observed_at);

    assert_eq!(sample.device_id, "unit-042");
    assert_eq!(sample.battery_pct, Some(73));
    assert_eq!(sample.unity_running, Some(false));
    assert_eq!(sample.network_type.as_deref(), Some("wifi"));
    assert_eq!(sample.status, "ok");

    println!("   ✅ [SUCCESS]: Wire contract levelized against the agent.");
}

#[test]
fn certify_closed_enums_round_trip_their_wire_forms() {
    // Condiciones del centinela (conjunto cerrado).
    for condition in [AlertCondition::Offline, AlertCondition::LowBattery, AlertCondition::UnityDown] {
        assert_eq!(AlertCondition::parse(condition.as_str()), Some(condition));
    }
    assert_eq!(AlertCondition::parse("MYSTERY_CONDITION"), None);

    // Acciones y desenlaces de mando.
    for action in [CommandAction::Ping, CommandAction::LaunchApp, CommandAction::InstallApk] {
        assert_eq!(CommandAction::parse(action.as_str()), Some(action));
    }
    for outcome in [CommandOutcome::Completed, CommandOutcome::Failed, CommandOutcome::Timeout] {
        assert_eq!(CommandOutcome::parse(outcome.as_str()), Some(outcome));
    }

    // Máquinas de estado del despliegue.
    for run_status in [
        RunStatus::Pending,
        RunStatus::Running,
        RunStatus::Paused,
        RunStatus::Completed,
        RunStatus::Failed,
        RunStatus::Aborted,
    ] {
        assert_eq!(RunStatus::parse(run_status.as_str()), Some(run_status));
    }
    for batch_status in [
        BatchStatus::Pending,
        BatchStatus::Running,
        BatchStatus::Succeeded,
        BatchStatus::Failed,
        BatchStatus::TimedOut,
    ] {
        assert_eq!(BatchStatus::parse(batch_status.as_str()), Some(batch_status));
    }

    assert!(RunStatus::Completed.is_terminal());
    assert!(!RunStatus::Paused.is_terminal());
    assert!(BatchStatus::TimedOut.is_terminal());
    assert!(!BatchStatus::Running.is_terminal());
}
