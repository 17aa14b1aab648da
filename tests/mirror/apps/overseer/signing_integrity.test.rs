// [tests/mirror/apps/overseer/signing_integrity.test.rs]
/**
 * =================================================================
 * APARATO: SIGNING INTEGRITY TEST (V5.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: FIRMAS HMAC Y CANONICALIZACIÓN SIN DERIVA
 * =================================================================
 */

use serde_json::json;
use warden_overseer::signing::{
    canonical_json_string, compute_admin_command_signature, compute_command_hmac, signatures_match,
};

#[test]
fn certify_command_hmac_is_deterministic_and_field_sensitive() {
    println!("\n🔏 [PROVING_GROUNDS]: Auditing push command signature...");

    let baseline = compute_command_hmac("fleet-secret", "req-1", "unit-042", "ping", "2026-03-14T10:30:21Z");

    // Determinismo bit-perfecto.
    assert_eq!(
        baseline,
        compute_command_hmac("fleet-secret", "req-1", "unit-042", "ping", "2026-03-14T10:30:21Z")
    );
    assert_eq!(baseline.len(), 64, "HMAC-SHA256 hex must span 64 nibbles");

    // Cada campo participa del mensaje firmado.
    assert_ne!(baseline, compute_command_hmac("fleet-secret", "req-2", "unit-042", "ping", "2026-03-14T10:30:21Z"));
    assert_ne!(baseline, compute_command_hmac("fleet-secret", "req-1", "unit-043", "ping", "2026-03-14T10:30:21Z"));
    assert_ne!(baseline, compute_command_hmac("fleet-secret", "req-1", "unit-042", "launch_app", "2026-03-14T10:30:21Z"));
    assert_ne!(baseline, compute_command_hmac("fleet-secret", "req-1", "unit-042", "ping", "2026-03-14T10:30:22Z"));
    assert_ne!(baseline, compute_command_hmac("other-secret", "req-1", "unit-042", "ping", "2026-03-14T10:30:21Z"));

    println!("   ✅ [SUCCESS]: Signature binds every field of the envelope.");
}

#[test]
fn certify_canonicalization_erases_serializer_drift() {
    println!("\n🔏 [PROVING_GROUNDS]: Auditing sorted-keys canonical form...");

    let canonical_form = canonical_json_string(&json!({
        "zeta": 1,
        "alpha": {"nested_b": true, "nested_a": [1, 2, 3]},
        "mid": "text"
    }));

    assert_eq!(
        canonical_form,
        r#"{"alpha":{"nested_a":[1,2,3],"nested_b":true},"mid":"text","zeta":1}"#
    );

    println!("   ✅ [SUCCESS]: Keys sorted, whitespace erased, nesting preserved.");
}

#[test]
fn certify_admin_signature_is_stable_across_parameter_orderings() {
    let device_roster = vec!["unit-001".to_string(), "unit-002".to_string()];

    let ordered_parameters = json!({"package_name": "org.zwanoo.android.speedtest", "priority": "high"});
    let shuffled_parameters = json!({"priority": "high", "package_name": "org.zwanoo.android.speedtest"});

    let ordered_signature =
        compute_admin_command_signature("fleet-secret", &device_roster, "launch_app", &ordered_parameters);
    let shuffled_signature =
        compute_admin_command_signature("fleet-secret", &device_roster, "launch_app", &shuffled_parameters);

    assert_eq!(ordered_signature, shuffled_signature, "parameter ordering must never drift the signature");
    assert!(signatures_match(&ordered_signature, &shuffled_signature));
    assert!(!signatures_match(&ordered_signature, "deadbeef"));

    // El roster participa del mensaje: otro conjunto, otra firma.
    let foreign_roster = vec!["unit-009".to_string()];
    let foreign_signature =
        compute_admin_command_signature("fleet-secret", &foreign_roster, "launch_app", &ordered_parameters);
    assert_ne!(ordered_signature, foreign_signature);
}
