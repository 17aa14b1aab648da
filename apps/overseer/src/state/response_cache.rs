// [apps/overseer/src/state/response_cache.rs]
/*!
 * =================================================================
 * APARATO: RESPONSE CACHE (V7.0 - PATH-SCOPED INVALIDATION)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L3)
 * RESPONSABILIDAD: CACHE TTL DE RESPUESTAS CON PURGA POR PREFIJO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MD5 KEYING: La llave es md5(ruta + query ordenada); la ruta cruda
 *    se conserva junto al valor para la invalidación por prefijo.
 * 2. LEGACY SAFETY: Las entradas sin ruta registrada (legado) también
 *    caen ante cualquier purga por prefijo — jamás se sirve rancio por
 *    no poder emparejar la llave hasheada.
 * 3. WEAK CONSISTENCY: TTLs en segundos; la coherencia fuerte no es
 *    contrato de esta capa.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct CacheSlot {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
    path: Option<String>,
}

/**
 * Cache de respuestas en RAM protegida por un único cerrojo.
 */
pub struct ResponseCache {
    slots: Mutex<HashMap<String, CacheSlot>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * Deriva la llave de cache: md5 de la ruta más la query ordenada.
 * Pares de query idénticos en distinto orden producen la misma llave.
 */
#[must_use]
pub fn make_cache_key(path: &str, query_pairs: &[(String, String)]) -> String {
    let key_material = if query_pairs.is_empty() {
        path.to_string()
    } else {
        let mut sorted_pairs = query_pairs.to_vec();
        sorted_pairs.sort();
        let rendered_query = sorted_pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", path, rendered_query)
    };

    hex::encode(Md5::digest(key_material.as_bytes()))
}

impl ResponseCache {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Mutex::new(HashMap::new()) }
    }

    /// Lectura con expiración perezosa.
    #[must_use]
    pub fn get(&self, cache_key: &str, now: DateTime<Utc>) -> Option<serde_json::Value> {
        let mut slots_guard = self.slots.lock().expect("LOCK_POISONED: Response cache compromised.");

        match slots_guard.get(cache_key) {
            None => None,
            Some(slot) if now > slot.expires_at => {
                slots_guard.remove(cache_key);
                None
            }
            Some(slot) => Some(slot.value.clone()),
        }
    }

    /// Escritura con TTL y ruta registrada para la purga por prefijo.
    pub fn set(
        &self,
        cache_key: &str,
        value: serde_json::Value,
        ttl_seconds: i64,
        path: Option<&str>,
        now: DateTime<Utc>,
    ) {
        let mut slots_guard = self.slots.lock().expect("LOCK_POISONED: Response cache compromised.");
        slots_guard.insert(
            cache_key.to_string(),
            CacheSlot {
                value,
                expires_at: now + Duration::seconds(ttl_seconds),
                path: path.map(str::to_string),
            },
        );
    }

    /**
     * Invalidación por prefijo de ruta. 'None' vacía la cache completa.
     * Las entradas legadas sin ruta registrada caen en toda purga.
     */
    pub fn invalidate(&self, path_prefix: Option<&str>) {
        let mut slots_guard = self.slots.lock().expect("LOCK_POISONED: Response cache compromised.");

        match path_prefix {
            None => slots_guard.clear(),
            Some(prefix) => {
                slots_guard.retain(|_, slot| match &slot.path {
                    Some(recorded_path) => !recorded_path.starts_with(prefix),
                    None => false,
                });
            }
        }
    }

    /// Barrido de entradas expiradas (mantenimiento periódico).
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let mut slots_guard = self.slots.lock().expect("LOCK_POISONED: Response cache compromised.");
        let population_before = slots_guard.len();
        slots_guard.retain(|_, slot| now <= slot.expires_at);
        population_before - slots_guard.len()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        let slots_guard = self.slots.lock().expect("LOCK_POISONED: Response cache compromised.");
        slots_guard.len()
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/state/response_cache.rs]
