// [libs/infra/vault/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ARTIFACT VAULT HUB (V6.0 - APK STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPORTACIÓN NOMINAL DE LA BÓVEDA DE ARTEFACTOS
 * =================================================================
 */

pub mod cache;
pub mod errors;
pub mod store;

pub use cache::{ArtifactCache, CacheStatistics, CachedArtifact};
pub use errors::VaultError;
pub use store::{ApkVault, DiskApkVault, UploadReceipt, CHUNK_SIZE_BYTES, MAX_APK_SIZE_BYTES, STREAMING_THRESHOLD_BYTES};
