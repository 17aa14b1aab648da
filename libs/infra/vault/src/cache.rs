// [libs/infra/vault/src/cache.rs]
/*!
 * =================================================================
 * APARATO: ARTIFACT LRU CACHE (V7.3 - HOT STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CACHE EN PROCESO DE APKS CALIENTES (200MB / 1h TTL)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LRU EVICTION: Al alcanzar el tope de bytes se desalojan las
 *    entradas menos recientemente accedidas hasta liberar espacio.
 * 2. TTL EXPIRY: Una entrada más vieja que el TTL se descarta en la
 *    lectura y cuenta como miss.
 * 3. ONE MUTEX: Mapa y contadores viven bajo un único cerrojo; las
 *    ráfagas concurrentes de descarga comparten el Arc de bytes.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

/// Tope por defecto de la cache de artefactos (200 MB).
pub const DEFAULT_CACHE_CAP_BYTES: usize = 200 * 1024 * 1024;
/// TTL por defecto de las entradas (1 hora).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Artefacto servido desde la cache caliente.
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    pub file_data: Arc<Vec<u8>>,
    pub content_type: String,
    pub file_size: usize,
}

#[derive(Debug)]
struct CacheEntry {
    file_data: Arc<Vec<u8>>,
    content_type: String,
    file_size: usize,
    cached_at: Instant,
    last_accessed: Instant,
    access_count: u64,
}

/// Radiografía de la cache para el endpoint de métricas.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStatistics {
    pub entries: usize,
    pub size_bytes: usize,
    pub cap_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub ttl_seconds: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    current_size_bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/**
 * Cache LRU de artefactos APK con tope de bytes y expiración TTL.
 */
pub struct ArtifactCache {
    cap_bytes: usize,
    ttl_seconds: u64,
    inner: Mutex<CacheInner>,
}

impl ArtifactCache {
    #[must_use]
    pub fn new(cap_bytes: usize, ttl_seconds: u64) -> Self {
        Self { cap_bytes, ttl_seconds, inner: Mutex::new(CacheInner::default()) }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CACHE_CAP_BYTES, DEFAULT_CACHE_TTL_SECONDS)
    }

    fn entry_expired(&self, entry: &CacheEntry) -> bool {
        entry.cached_at.elapsed().as_secs() >= self.ttl_seconds
    }

    /**
     * Lectura con contabilidad de hit/miss y expiración perezosa.
     */
    pub fn get(&self, cache_key: &str) -> Option<CachedArtifact> {
        let mut cache_guard = self.inner.lock().expect("LOCK_POISONED: Artifact cache compromised.");

        let expired = match cache_guard.entries.get(cache_key) {
            None => {
                cache_guard.misses += 1;
                return None;
            }
            Some(entry) => self.entry_expired(entry),
        };

        if expired {
            if let Some(stale_entry) = cache_guard.entries.remove(cache_key) {
                cache_guard.current_size_bytes -= stale_entry.file_size;
            }
            cache_guard.misses += 1;
            return None;
        }

        cache_guard.hits += 1;
        let live_entry = cache_guard
            .entries
            .get_mut(cache_key)
            .expect("entry certified present above");
        live_entry.access_count += 1;
        live_entry.last_accessed = Instant::now();

        Some(CachedArtifact {
            file_data: Arc::clone(&live_entry.file_data),
            content_type: live_entry.content_type.clone(),
            file_size: live_entry.file_size,
        })
    }

    /**
     * Inserta un artefacto desalojando LRU hasta que quepa.
     * Un artefacto mayor que el tope completo jamás entra a la cache.
     */
    pub fn put(&self, cache_key: &str, file_data: Vec<u8>, content_type: &str) {
        let file_size = file_data.len();
        if file_size > self.cap_bytes {
            debug!("⚪ [CACHE_BYPASS]: Artifact {} exceeds cache cap; not admitted.", cache_key);
            return;
        }

        let mut cache_guard = self.inner.lock().expect("LOCK_POISONED: Artifact cache compromised.");

        // Reemplazo en sitio: descontamos la huella de la entrada previa.
        if let Some(previous_entry) = cache_guard.entries.remove(cache_key) {
            cache_guard.current_size_bytes -= previous_entry.file_size;
        }

        // Desalojo LRU hasta liberar el espacio requerido.
        while cache_guard.current_size_bytes + file_size > self.cap_bytes {
            let victim_key = cache_guard
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());

            match victim_key {
                Some(evicted_key) => {
                    if let Some(evicted_entry) = cache_guard.entries.remove(&evicted_key) {
                        cache_guard.current_size_bytes -= evicted_entry.file_size;
                        cache_guard.evictions += 1;
                        debug!("💀 [CACHE_EVICT]: {} released under byte pressure.", evicted_key);
                    }
                }
                None => break,
            }
        }

        let now = Instant::now();
        cache_guard.entries.insert(
            cache_key.to_string(),
            CacheEntry {
                file_data: Arc::new(file_data),
                content_type: content_type.to_string(),
                file_size,
                cached_at: now,
                last_accessed: now,
                access_count: 0,
            },
        );
        cache_guard.current_size_bytes += file_size;
    }

    /// Expulsión puntual (una versión APK reemplazada o retirada).
    pub fn invalidate(&self, cache_key: &str) {
        let mut cache_guard = self.inner.lock().expect("LOCK_POISONED: Artifact cache compromised.");
        if let Some(removed_entry) = cache_guard.entries.remove(cache_key) {
            cache_guard.current_size_bytes -= removed_entry.file_size;
        }
    }

    /// Vaciado completo (mantenimiento del operador).
    pub fn clear(&self) {
        let mut cache_guard = self.inner.lock().expect("LOCK_POISONED: Artifact cache compromised.");
        cache_guard.entries.clear();
        cache_guard.current_size_bytes = 0;
    }

    #[must_use]
    pub fn statistics(&self) -> CacheStatistics {
        let cache_guard = self.inner.lock().expect("LOCK_POISONED: Artifact cache compromised.");
        CacheStatistics {
            entries: cache_guard.entries.len(),
            size_bytes: cache_guard.current_size_bytes,
            cap_bytes: self.cap_bytes,
            hits: cache_guard.hits,
            misses: cache_guard.misses,
            evictions: cache_guard.evictions,
            ttl_seconds: self.ttl_seconds,
        }
    }
}
// FIN DEL ARCHIVO [libs/infra/vault/src/cache.rs]
