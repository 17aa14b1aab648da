// [apps/overseer/src/services/perf_harness.rs]
/*!
 * =================================================================
 * APARATO: PERF DIFF HARNESS (V4.0 - DUAL PATH RADAR)
 * CLASIFICACIÓN: OBSERVABILITY SERVICE (ESTRATO L4/L6)
 * RESPONSABILIDAD: COMPARACIÓN LADO A LADO DE CAMINOS DE LECTURA
 *
 * El arnés registra las latencias de ambos caminos (legado vs
 * proyección) sin afectar jamás la respuesta servida. Pensado para
 * correr una semana y luego apagarse vía 'PERF_DIFF_ENABLED'.
 * =================================================================
 */

use std::sync::Arc;
use tracing::info;
use warden_shared_argus::metrics::MetricsRegistry;

pub struct PerfDiffHarness {
    enabled: bool,
    metrics: Arc<MetricsRegistry>,
}

impl PerfDiffHarness {
    #[must_use]
    pub fn new(enabled: bool, metrics: Arc<MetricsRegistry>) -> Self {
        Self { enabled, metrics }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /**
     * Registra una comparación de latencias para un camino de consulta.
     */
    pub fn record_comparison(&self, query_name: &str, legacy_latency_ms: f64, fast_latency_ms: f64) {
        if !self.enabled {
            return;
        }

        let speedup_factor = if fast_latency_ms > 0.0 { legacy_latency_ms / fast_latency_ms } else { 0.0 };

        info!(
            query = query_name,
            legacy_ms = format!("{:.2}", legacy_latency_ms),
            fast_ms = format!("{:.2}", fast_latency_ms),
            speedup = format!("{:.2}", speedup_factor),
            "📐 [PERF_DIFF]: dual-path comparison recorded."
        );

        self.metrics.observe_histogram(
            "query_latency_legacy_ms",
            &[("query", query_name)],
            legacy_latency_ms,
        );
        self.metrics
            .observe_histogram("query_latency_fast_ms", &[("query", query_name)], fast_latency_ms);
        self.metrics
            .inc_counter("perf_diff_comparisons_total", &[("query", query_name)]);
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/perf_harness.rs]
