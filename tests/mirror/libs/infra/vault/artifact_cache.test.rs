// [tests/mirror/libs/infra/vault/artifact_cache.test.rs]
/**
 * =================================================================
 * APARATO: ARTIFACT CACHE TEST (V5.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN LRU, TTL Y CONTABILIDAD DE PRESIÓN
 * =================================================================
 */

use warden_infra_vault::ArtifactCache;

const APK_MIME: &str = "application/vnd.android.package-archive";

#[test]
fn certify_lru_eviction_under_byte_pressure() {
    println!("\n📦 [PROVING_GROUNDS]: Auditing LRU eviction V5.0...");

    // 1. SETUP: Bóveda caliente de 100 bytes, TTL holgado.
    let hot_cache = ArtifactCache::new(100, 3600);

    hot_cache.put("apk:1", vec![0u8; 40], APK_MIME);
    hot_cache.put("apk:2", vec![0u8; 40], APK_MIME);

    // 2. EXECUTION: Tocamos apk:1 para volverlo el más reciente.
    assert!(hot_cache.get("apk:1").is_some());

    // La tercera entrada fuerza el desalojo del LRU (apk:2).
    hot_cache.put("apk:3", vec![0u8; 40], APK_MIME);

    // 3. VALIDATION
    assert!(hot_cache.get("apk:1").is_some(), "recently touched entry must survive");
    assert!(hot_cache.get("apk:2").is_none(), "LRU victim must be evicted");
    assert!(hot_cache.get("apk:3").is_some());

    let statistics = hot_cache.statistics();
    assert_eq!(statistics.evictions, 1);
    assert!(statistics.size_bytes <= 100);

    println!("   ✅ [SUCCESS]: LRU pressure valve certified.");
}

#[test]
fn certify_ttl_expiry_counts_as_miss() {
    // TTL cero: toda entrada nace expirada.
    let ephemeral_cache = ArtifactCache::new(1024, 0);
    ephemeral_cache.put("apk:9", vec![1, 2, 3], APK_MIME);

    assert!(ephemeral_cache.get("apk:9").is_none());

    let statistics = ephemeral_cache.statistics();
    assert_eq!(statistics.misses, 1);
    assert_eq!(statistics.hits, 0);
    assert_eq!(statistics.entries, 0, "expired entry must be purged on read");
}

#[test]
fn certify_oversized_artifacts_never_enter() {
    let tiny_cache = ArtifactCache::new(10, 3600);
    tiny_cache.put("apk:huge", vec![0u8; 64], APK_MIME);

    assert!(tiny_cache.get("apk:huge").is_none());
    assert_eq!(tiny_cache.statistics().entries, 0);
}

#[test]
fn certify_hit_and_miss_accounting() {
    let hot_cache = ArtifactCache::new(1024, 3600);
    hot_cache.put("apk:7", vec![7u8; 16], APK_MIME);

    assert!(hot_cache.get("apk:7").is_some());
    assert!(hot_cache.get("apk:7").is_some());
    assert!(hot_cache.get("apk:absent").is_none());

    let statistics = hot_cache.statistics();
    assert_eq!(statistics.hits, 2);
    assert_eq!(statistics.misses, 1);

    hot_cache.invalidate("apk:7");
    assert!(hot_cache.get("apk:7").is_none());
}
