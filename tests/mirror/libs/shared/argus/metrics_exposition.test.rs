// [tests/mirror/libs/shared/argus/metrics_exposition.test.rs]
/**
 * =================================================================
 * APARATO: METRICS EXPOSITION TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L6-MIRROR
 * RESPONSABILIDAD: PARIDAD PROMETHEUS DEL REGISTRO DE LA FLOTA
 * =================================================================
 */

use warden_shared_argus::metrics::MetricsRegistry;

#[test]
fn certify_counters_render_with_deterministic_labels() {
    println!("\n📈 [PROVING_GROUNDS]: Auditing Prometheus exposition...");

    let registry = MetricsRegistry::new();

    registry.inc_counter("alerts_sent_total", &[("condition", "UNITY_DOWN")]);
    registry.inc_counter("alerts_sent_total", &[("condition", "UNITY_DOWN")]);
    registry.inc_counter("alerts_suppressed_total", &[("reason", "cooldown"), ("condition", "OFFLINE")]);

    assert_eq!(registry.counter_value("alerts_sent_total", &[("condition", "UNITY_DOWN")]), 2);
    assert_eq!(registry.counter_value("alerts_sent_total", &[("condition", "OFFLINE")]), 0);

    let exposition = registry.render_prometheus_text();

    assert!(exposition.contains("# TYPE alerts_sent_total counter"));
    assert!(exposition.contains("alerts_sent_total{condition=\"UNITY_DOWN\"} 2"));
    // Las etiquetas se ordenan lexicográficamente sin importar la inserción.
    assert!(exposition.contains("alerts_suppressed_total{condition=\"OFFLINE\",reason=\"cooldown\"} 1"));

    println!("   ✅ [SUCCESS]: Counter strata render bit-stable.");
}

#[test]
fn certify_histograms_render_buckets_sum_and_count() {
    let registry = MetricsRegistry::new();

    registry.observe_histogram("device_auth_latency_ms", &[], 3.0);
    registry.observe_histogram("device_auth_latency_ms", &[], 40.0);
    registry.observe_histogram("device_auth_latency_ms", &[], 900.0);

    let exposition = registry.render_prometheus_text();

    assert!(exposition.contains("# TYPE device_auth_latency_ms histogram"));
    // Bucket le=5 captura sólo la observación de 3ms.
    assert!(exposition.contains("device_auth_latency_ms_bucket{le=\"5\"} 1"));
    // Bucket le=50 captura 3ms y 40ms.
    assert!(exposition.contains("device_auth_latency_ms_bucket{le=\"50\"} 2"));
    assert!(exposition.contains("device_auth_latency_ms_bucket{le=\"+Inf\"} 3"));
    assert!(exposition.contains("device_auth_latency_ms_sum 943"));
    assert!(exposition.contains("device_auth_latency_ms_count 3"));
}

#[test]
fn certify_gauges_overwrite_in_place() {
    let registry = MetricsRegistry::new();

    registry.set_gauge("db_pool_utilization_pct", &[], 42.5);
    registry.set_gauge("db_pool_utilization_pct", &[], 81.0);

    let exposition = registry.render_prometheus_text();
    assert!(exposition.contains("# TYPE db_pool_utilization_pct gauge"));
    assert!(exposition.contains("db_pool_utilization_pct 81"));
    assert!(!exposition.contains("42.5"));
}
