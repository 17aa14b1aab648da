// [libs/shared/argus/src/metrics.rs]
/*!
 * =================================================================
 * APARATO: FLEET METRICS REGISTRY (V4.2 - PANOPTICON FEED)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L6)
 * RESPONSABILIDAD: CONTADORES, GAUGES E HISTOGRAMAS EN PROCESO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ZERO DEPENDENCIES PESADAS: Registro en RAM protegido por un único
 *    Mutex, suficiente para una flota de cientos de agentes.
 * 2. PROMETHEUS PARITY: Exposición en formato de texto plano compatible
 *    con scraping estándar (counter / gauge / histogram buckets).
 * 3. LABEL DETERMINISM: Las etiquetas se ordenan lexicográficamente
 *    para que la misma serie siempre produzca la misma llave.
 * =================================================================
 */

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Buckets de latencia nominales en milisegundos para todos los histogramas.
const LATENCY_BUCKETS_MS: &[f64] = &[
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

/// Llave de serie: nombre de métrica + etiquetas ordenadas.
type SeriesKey = (String, BTreeMap<String, String>);

#[derive(Default)]
struct RegistryInner {
    counters: BTreeMap<SeriesKey, u64>,
    gauges: BTreeMap<SeriesKey, f64>,
    histograms: BTreeMap<SeriesKey, Vec<f64>>,
}

/**
 * Registro soberano de métricas de la flota.
 * Una instancia vive en el AppState y es compartida vía Arc.
 */
pub struct MetricsRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Mutex::new(RegistryInner::default()) }
    }

    fn series_key(metric_name: &str, labels: &[(&str, &str)]) -> SeriesKey {
        let label_map = labels
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>();
        (metric_name.to_string(), label_map)
    }

    /// Incrementa un contador monotónico en 'delta'.
    pub fn inc_counter_by(&self, metric_name: &str, labels: &[(&str, &str)], delta: u64) {
        let mut registry_guard = self.inner.lock().expect("LOCK_POISONED: Metrics registry compromised.");
        *registry_guard.counters.entry(Self::series_key(metric_name, labels)).or_insert(0) += delta;
    }

    /// Incrementa un contador monotónico en 1.
    pub fn inc_counter(&self, metric_name: &str, labels: &[(&str, &str)]) {
        self.inc_counter_by(metric_name, labels, 1);
    }

    /// Fija el valor instantáneo de un gauge.
    pub fn set_gauge(&self, metric_name: &str, labels: &[(&str, &str)], value: f64) {
        let mut registry_guard = self.inner.lock().expect("LOCK_POISONED: Metrics registry compromised.");
        registry_guard.gauges.insert(Self::series_key(metric_name, labels), value);
    }

    /// Registra una observación de histograma (latencias en ms).
    pub fn observe_histogram(&self, metric_name: &str, labels: &[(&str, &str)], value_ms: f64) {
        let mut registry_guard = self.inner.lock().expect("LOCK_POISONED: Metrics registry compromised.");
        registry_guard
            .histograms
            .entry(Self::series_key(metric_name, labels))
            .or_default()
            .push(value_ms);
    }

    /// Lectura puntual de un contador (Proving Grounds y diagnósticos).
    #[must_use]
    pub fn counter_value(&self, metric_name: &str, labels: &[(&str, &str)]) -> u64 {
        let registry_guard = self.inner.lock().expect("LOCK_POISONED: Metrics registry compromised.");
        registry_guard
            .counters
            .get(&Self::series_key(metric_name, labels))
            .copied()
            .unwrap_or(0)
    }

    fn render_labels(label_map: &BTreeMap<String, String>) -> String {
        if label_map.is_empty() {
            return String::new();
        }
        let rendered = label_map
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, value))
            .collect::<Vec<_>>()
            .join(",");
        format!("{{{}}}", rendered)
    }

    /**
     * Genera la exposición completa en formato de texto Prometheus.
     *
     * # Performance:
     * O(N) sobre las series registradas; el cerrojo se mantiene durante
     * el renderizado completo para garantizar un snapshot coherente.
     */
    #[must_use]
    pub fn render_prometheus_text(&self) -> String {
        let registry_guard = self.inner.lock().expect("LOCK_POISONED: Metrics registry compromised.");
        let mut output_lines: Vec<String> = Vec::new();
        let mut last_counter_name: Option<&str> = None;

        for ((metric_name, label_map), count) in &registry_guard.counters {
            if last_counter_name != Some(metric_name.as_str()) {
                output_lines.push(format!("# TYPE {} counter", metric_name));
                last_counter_name = Some(metric_name.as_str());
            }
            output_lines.push(format!("{}{} {}", metric_name, Self::render_labels(label_map), count));
        }

        let mut last_gauge_name: Option<&str> = None;
        for ((metric_name, label_map), value) in &registry_guard.gauges {
            if last_gauge_name != Some(metric_name.as_str()) {
                output_lines.push(format!("# TYPE {} gauge", metric_name));
                last_gauge_name = Some(metric_name.as_str());
            }
            output_lines.push(format!("{}{} {}", metric_name, Self::render_labels(label_map), value));
        }

        for ((metric_name, label_map), observations) in &registry_guard.histograms {
            output_lines.push(format!("# TYPE {} histogram", metric_name));

            let mut cumulative_sum = 0.0;
            for observation in observations {
                cumulative_sum += observation;
            }

            for bucket_boundary in LATENCY_BUCKETS_MS {
                let bucket_count = observations.iter().filter(|obs| **obs <= *bucket_boundary).count();
                let mut bucket_labels = label_map.clone();
                bucket_labels.insert("le".to_string(), format!("{}", bucket_boundary));
                output_lines.push(format!(
                    "{}_bucket{} {}",
                    metric_name,
                    Self::render_labels(&bucket_labels),
                    bucket_count
                ));
            }

            let mut infinity_labels = label_map.clone();
            infinity_labels.insert("le".to_string(), "+Inf".to_string());
            output_lines.push(format!(
                "{}_bucket{} {}",
                metric_name,
                Self::render_labels(&infinity_labels),
                observations.len()
            ));
            output_lines.push(format!(
                "{}_sum{} {}",
                metric_name,
                Self::render_labels(label_map),
                cumulative_sum
            ));
            output_lines.push(format!(
                "{}_count{} {}",
                metric_name,
                Self::render_labels(label_map),
                observations.len()
            ));
        }

        let mut rendered_document = output_lines.join("\n");
        rendered_document.push('\n');
        rendered_document
    }
}
// FIN DEL ARCHIVO [libs/shared/argus/src/metrics.rs]
