// [tests/mirror/apps/overseer/operator_jwt_lifecycle.test.rs]
/**
 * =================================================================
 * APARATO: OPERATOR JWT LIFECYCLE TEST (V5.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: EMISIÓN, VERIFICACIÓN Y EXPIRACIÓN DEL HS256
 * =================================================================
 */

use chrono::{Duration, TimeZone, Utc};
use warden_overseer::auth::{
    compute_token_fingerprint, generate_device_token, issue_admin_jwt, verify_admin_jwt, AuthError,
};

#[test]
fn certify_issue_then_verify_round_trips_the_claims() {
    println!("\n🪪 [PROVING_GROUNDS]: Auditing operator JWT round-trip...");

    let issued_at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
    let token = issue_admin_jwt("jwt-secret", 7, "fleet-architect", issued_at);

    let claims = verify_admin_jwt("jwt-secret", &token, issued_at + Duration::hours(1)).expect("verify");

    assert_eq!(claims.user_id, 7);
    assert_eq!(claims.username, "fleet-architect");
    assert_eq!(claims.iat, issued_at.timestamp());
    // Vida contractual: 7 días exactos.
    assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);

    println!("   ✅ [SUCCESS]: Claims survive the full round-trip.");
}

#[test]
fn certify_expiry_and_tampering_are_rejected() {
    let issued_at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
    let token = issue_admin_jwt("jwt-secret", 7, "fleet-architect", issued_at);

    // Ocho días después: expirado.
    let late_verification = verify_admin_jwt("jwt-secret", &token, issued_at + Duration::days(8));
    assert!(matches!(late_verification, Err(AuthError::JwtExpired)));

    // Secreto ajeno: firma rechazada.
    let foreign_verification = verify_admin_jwt("other-secret", &token, issued_at + Duration::hours(1));
    assert!(matches!(foreign_verification, Err(AuthError::JwtInvalid)));

    // Payload manipulado: firma rechazada.
    let mut token_segments: Vec<&str> = token.split('.').collect();
    let forged_payload = "eyJmb3JnZWQiOnRydWV9";
    token_segments[1] = forged_payload;
    let forged_token = token_segments.join(".");
    assert!(matches!(
        verify_admin_jwt("jwt-secret", &forged_token, issued_at + Duration::hours(1)),
        Err(AuthError::JwtInvalid)
    ));

    // Estructura rota.
    assert!(matches!(
        verify_admin_jwt("jwt-secret", "not-a-jwt", issued_at),
        Err(AuthError::JwtInvalid)
    ));
}

#[test]
fn certify_device_token_entropy_and_fingerprint_shape() {
    let first_token = generate_device_token();
    let second_token = generate_device_token();

    // 32 bytes en base64url sin padding: 43 caracteres.
    assert_eq!(first_token.len(), 43);
    assert_ne!(first_token, second_token, "token forge must never repeat");

    let fingerprint = compute_token_fingerprint(&first_token);
    assert_eq!(fingerprint.len(), 64, "SHA-256 hex spans 64 nibbles");
    assert_eq!(fingerprint, compute_token_fingerprint(&first_token));
    assert_ne!(fingerprint, compute_token_fingerprint(&second_token));
}
