// [apps/overseer/src/state/alert_trackers.rs]
/*!
 * =================================================================
 * APARATO: ALERT SUPPRESSION TRACKERS (V8.0 - SLIDING WINDOWS)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L3)
 * RESPONSABILIDAD: VENTANAS DESLIZANTES DE CAP GLOBAL Y ROLL-UP
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ONE MUTEX EACH: La ventana global y el tracker de roll-up viven
 *    bajo cerrojos independientes — contención mínima entre ticks.
 * 2. CLOCK INJECTION: Toda decisión recibe 'now' explícito; las
 *    ventanas son deterministas y certificables en el Proving Grounds.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use warden_domain_models::alert::AlertCondition;

/// Ancho de la ventana deslizante (60 segundos) para cap y roll-up.
const SLIDING_WINDOW_SECONDS: i64 = 60;

/// Dispositivo agregado dentro de un mensaje de roll-up.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RollupDevice {
    pub device_id: String,
    pub alias: String,
}

#[derive(Debug, Clone)]
struct RollupEntry {
    device_id: String,
    alias: String,
    tracked_at: DateTime<Utc>,
}

/**
 * Ventanas de supresión del centinela: cap global y roll-up por
 * condición. El cooldown por dispositivo vive en 'alert_states' (DB).
 */
pub struct AlertSuppressionTrackers {
    global_window: Mutex<Vec<DateTime<Utc>>>,
    rollup_windows: Mutex<HashMap<AlertCondition, Vec<RollupEntry>>>,
}

impl Default for AlertSuppressionTrackers {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSuppressionTrackers {
    #[must_use]
    pub fn new() -> Self {
        Self {
            global_window: Mutex::new(Vec::new()),
            rollup_windows: Mutex::new(HashMap::new()),
        }
    }

    /**
     * Evalúa el cap global de 60s. Bajo el tope, registra la emisión y
     * retorna 'false'; sobre el tope retorna 'true' (suprimir).
     */
    pub fn global_cap_exceeded(&self, now: DateTime<Utc>, cap_per_minute: usize) -> bool {
        let window_start = now - Duration::seconds(SLIDING_WINDOW_SECONDS);
        let mut window_guard = self.global_window.lock().expect("LOCK_POISONED: Global alert window.");

        window_guard.retain(|emitted_at| *emitted_at > window_start);

        if window_guard.len() >= cap_per_minute {
            return true;
        }

        window_guard.push(now);
        false
    }

    /// Registra una elevación candidata en la ventana de roll-up.
    pub fn track_for_rollup(&self, condition: AlertCondition, device_id: &str, alias: &str, now: DateTime<Utc>) {
        let mut rollup_guard = self.rollup_windows.lock().expect("LOCK_POISONED: Rollup tracker.");
        rollup_guard.entry(condition).or_default().push(RollupEntry {
            device_id: device_id.to_string(),
            alias: alias.to_string(),
            tracked_at: now,
        });
    }

    /**
     * Evalúa el umbral de roll-up tras podar la ventana de 60s.
     *
     * @returns la lista agregada de dispositivos cuando el conteo alcanza
     * el umbral; 'None' mientras no lo alcance.
     */
    #[must_use]
    pub fn rollup_ready(
        &self,
        condition: AlertCondition,
        now: DateTime<Utc>,
        rollup_threshold: usize,
    ) -> Option<Vec<RollupDevice>> {
        let window_start = now - Duration::seconds(SLIDING_WINDOW_SECONDS);
        let mut rollup_guard = self.rollup_windows.lock().expect("LOCK_POISONED: Rollup tracker.");

        let condition_window = rollup_guard.entry(condition).or_default();
        condition_window.retain(|entry| entry.tracked_at > window_start);

        if condition_window.len() >= rollup_threshold {
            Some(
                condition_window
                    .iter()
                    .map(|entry| RollupDevice {
                        device_id: entry.device_id.clone(),
                        alias: entry.alias.clone(),
                    })
                    .collect(),
            )
        } else {
            None
        }
    }

    /// Limpia la ventana de una condición tras el envío agregado.
    pub fn clear_rollup(&self, condition: AlertCondition) {
        let mut rollup_guard = self.rollup_windows.lock().expect("LOCK_POISONED: Rollup tracker.");
        rollup_guard.remove(&condition);
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/state/alert_trackers.rs]
