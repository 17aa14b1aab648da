// [tests/mirror/apps/overseer/state/response_cache.test.rs]
/**
 * =================================================================
 * APARATO: RESPONSE CACHE TEST (V5.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: TTL, LLAVES MD5 E INVALIDACIÓN POR PREFIJO
 * =================================================================
 */

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use warden_overseer::state::response_cache::{make_cache_key, ResponseCache};

#[test]
fn certify_cache_keys_ignore_query_ordering() {
    println!("\n🗝️  [PROVING_GROUNDS]: Auditing MD5 key determinism...");

    let ordered_key = make_cache_key(
        "/v1/devices",
        &[("page".into(), "2".into()), ("status".into(), "online".into())],
    );
    let shuffled_key = make_cache_key(
        "/v1/devices",
        &[("status".into(), "online".into()), ("page".into(), "2".into())],
    );

    assert_eq!(ordered_key, shuffled_key);
    assert_eq!(ordered_key.len(), 32, "MD5 hex spans 32 nibbles");
    assert_ne!(ordered_key, make_cache_key("/v1/devices", &[]));

    println!("   ✅ [SUCCESS]: Same request shape, same key — always.");
}

#[test]
fn certify_ttl_expiry_is_lazy_and_exact() {
    let cache = ResponseCache::new();
    let stored_at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    cache.set("radar-key", json!({"devices": []}), 5, Some("/v1/devices"), stored_at);

    assert!(cache.get("radar-key", stored_at + Duration::seconds(5)).is_some());
    assert!(cache.get("radar-key", stored_at + Duration::seconds(6)).is_none());
    // La lectura expirada purga el slot.
    assert_eq!(cache.depth(), 0);
}

#[test]
fn certify_prefix_invalidation_also_purges_legacy_entries() {
    println!("\n🗝️  [PROVING_GROUNDS]: Auditing path-scoped purge...");

    let cache = ResponseCache::new();
    let stored_at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    cache.set("key-devices", json!(1), 300, Some("/v1/devices"), stored_at);
    cache.set("key-device-42", json!(2), 300, Some("/v1/devices/42/status"), stored_at);
    cache.set("key-apk", json!(3), 300, Some("/v1/apk/versions"), stored_at);
    // Entrada legada sin ruta registrada: debe caer en TODA purga.
    cache.set("key-legacy", json!(4), 300, None, stored_at);

    cache.invalidate(Some("/v1/devices"));

    assert!(cache.get("key-devices", stored_at).is_none());
    assert!(cache.get("key-device-42", stored_at).is_none());
    assert!(cache.get("key-legacy", stored_at).is_none(), "legacy entries must never survive a purge");
    assert!(cache.get("key-apk", stored_at).is_some(), "foreign prefixes stay warm");

    // Purga total.
    cache.invalidate(None);
    assert_eq!(cache.depth(), 0);

    println!("   ✅ [SUCCESS]: Prefix purge covers hashed and legacy strata.");
}

#[test]
fn certify_expired_sweep_reports_the_purged_population() {
    let cache = ResponseCache::new();
    let stored_at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    cache.set("short-lived", json!(1), 1, Some("/v1/devices"), stored_at);
    cache.set("long-lived", json!(2), 600, Some("/v1/devices"), stored_at);

    let purged_population = cache.cleanup_expired(stored_at + Duration::seconds(30));
    assert_eq!(purged_population, 1);
    assert_eq!(cache.depth(), 1);
}
