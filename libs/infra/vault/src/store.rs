// INICIO DEL ARCHIVO [libs/infra/vault/src/store.rs]
/*!
 * =================================================================
 * APARATO: APK OBJECT VAULT (V8.0 - DISK BACKED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ADMISIÓN, PERSISTENCIA VERIFICADA Y STREAMING
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. KEYING SOBERANO: apk/{categoría}/{uuid}_{archivo}; la ruta que se
 *    persiste en el catálogo lleva el prefijo 'storage://'.
 * 2. RETRY DISCIPLINE: La subida reintenta sólo ante 'Throttled' con
 *    retroceso 0.5s → 1s → 2s, y verifica presencia tras escribir.
 * 3. STREAMING SPLIT: Los artefactos > 50MB se sirven por trozos de
 *    1MB directamente desde la bóveda, esquivando la cache caliente.
 * =================================================================
 */

use crate::errors::VaultError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncRead;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Tamaño máximo admitido de un artefacto APK (500 MB).
pub const MAX_APK_SIZE_BYTES: u64 = 500 * 1024 * 1024;
/// Umbral a partir del cual la descarga se sirve por streaming (50 MB).
pub const STREAMING_THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;
/// Tamaño de trozo del streaming (1 MB).
pub const CHUNK_SIZE_BYTES: usize = 1024 * 1024;

/// Reintentos máximos ante presión transitoria del backend.
const MAX_UPLOAD_RETRIES: u32 = 3;
/// Retroceso base entre reintentos (se duplica por intento).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Prefijo del esquema de rutas persistidas en el catálogo.
const STORAGE_SCHEME_PREFIX: &str = "storage://";

/// Recibo de una subida certificada en la bóveda.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// Ruta persistible en el catálogo: storage://apk/{cat}/{uuid}_{file}.
    pub storage_path: String,
    pub file_size: u64,
    pub sha256_hex: String,
}

/**
 * Contrato de la bóveda de objetos APK.
 * El backend de producción es disco montado; un backend de clase S3 se
 * enchufa implementando este mismo contrato.
 */
#[async_trait]
pub trait ApkVault: Send + Sync {
    /// Escritura cruda de un objeto bajo su llave canónica.
    async fn store_object(&self, object_key: &str, file_data: &[u8]) -> Result<(), VaultError>;

    /// Lectura buffered completa de un objeto.
    async fn fetch_object(&self, object_key: &str) -> Result<Vec<u8>, VaultError>;

    /// Apertura de un lector asíncrono para el streaming por trozos.
    async fn open_stream(&self, object_key: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>, VaultError>;

    /// Verificación de presencia del objeto.
    async fn object_exists(&self, object_key: &str) -> Result<bool, VaultError>;

    /// Tamaño físico real del objeto.
    async fn object_size(&self, object_key: &str) -> Result<u64, VaultError>;

    /// Eliminación definitiva del objeto.
    async fn delete_object(&self, object_key: &str) -> Result<(), VaultError>;
}

/// Deriva la llave canónica de un artefacto recién admitido.
#[must_use]
pub fn make_storage_key(category: &str, filename: &str) -> String {
    format!("apk/{}/{}_{}", category, Uuid::new_v4(), filename)
}

/// Despoja el prefijo 'storage://' de una ruta del catálogo.
#[must_use]
pub fn object_key_from_storage_path(storage_path: &str) -> &str {
    storage_path.strip_prefix(STORAGE_SCHEME_PREFIX).unwrap_or(storage_path)
}

/// Certifica la admisibilidad de un artefacto antes de tocar la bóveda.
pub fn validate_apk_admission(filename: &str, file_size: u64) -> Result<(), VaultError> {
    if !filename.to_lowercase().ends_with(".apk") {
        return Err(VaultError::ValidationRejected(format!(
            "{}: only .apk artifacts are admitted",
            filename
        )));
    }
    if file_size == 0 {
        return Err(VaultError::ValidationRejected(format!("{}: artifact is empty", filename)));
    }
    if file_size > MAX_APK_SIZE_BYTES {
        return Err(VaultError::ValidationRejected(format!(
            "{}: {:.1}MB exceeds the {}MB admission cap",
            filename,
            file_size as f64 / (1024.0 * 1024.0),
            MAX_APK_SIZE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/**
 * Subida completa con disciplina de reintentos y verificación:
 * admisión → escritura (reintento sólo ante Throttled) → presencia.
 */
#[instrument(skip(vault, file_data), fields(size = file_data.len()))]
pub async fn upload_apk(
    vault: &dyn ApkVault,
    category: &str,
    filename: &str,
    file_data: &[u8],
) -> Result<UploadReceipt, VaultError> {
    validate_apk_admission(filename, file_data.len() as u64)?;

    let object_key = make_storage_key(category, filename);

    let mut retry_attempt = 0u32;
    loop {
        match vault.store_object(&object_key, file_data).await {
            Ok(()) => break,
            Err(VaultError::Throttled(pressure_detail)) if retry_attempt + 1 < MAX_UPLOAD_RETRIES => {
                let backoff_delay = RETRY_BASE_DELAY_MS * (1 << retry_attempt);
                warn!(
                    "⏳ [VAULT_THROTTLED]: attempt {} deferred {}ms ({}).",
                    retry_attempt + 1,
                    backoff_delay,
                    pressure_detail
                );
                tokio::time::sleep(Duration::from_millis(backoff_delay)).await;
                retry_attempt += 1;
            }
            Err(terminal_fault) => return Err(terminal_fault),
        }
    }

    // Verificación post-escritura: la bóveda debe poder leer lo que selló.
    if !vault.object_exists(&object_key).await? {
        return Err(VaultError::VerificationFailed(object_key));
    }

    let sha256_hex = hex::encode(Sha256::digest(file_data));

    info!("📦 [VAULT_SEALED]: {} crystallized ({} bytes).", object_key, file_data.len());
    Ok(UploadReceipt {
        storage_path: format!("{}{}", STORAGE_SCHEME_PREFIX, object_key),
        file_size: file_data.len() as u64,
        sha256_hex,
    })
}

/**
 * Backend de producción: bóveda sobre almacenamiento montado en disco.
 */
pub struct DiskApkVault {
    vault_root: PathBuf,
}

impl DiskApkVault {
    /**
     * Abre la bóveda sobre la raíz configurada, creándola si no existe.
     *
     * # Errors:
     * `VaultError::Unavailable` si la raíz no puede materializarse — una
     * bóveda sin montar jamás se reporta como objeto inexistente.
     */
    pub async fn open(vault_root: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let vault_root = vault_root.into();
        fs::create_dir_all(&vault_root)
            .await
            .map_err(|fault| VaultError::Unavailable(format!("vault root {}: {}", vault_root.display(), fault)))?;
        Ok(Self { vault_root })
    }

    fn physical_path(&self, object_key: &str) -> PathBuf {
        self.vault_root.join(Path::new(object_key))
    }
}

#[async_trait]
impl ApkVault for DiskApkVault {
    async fn store_object(&self, object_key: &str, file_data: &[u8]) -> Result<(), VaultError> {
        let physical_path = self.physical_path(object_key);
        if let Some(parent_directory) = physical_path.parent() {
            fs::create_dir_all(parent_directory)
                .await
                .map_err(|fault| VaultError::Unavailable(format!("{}: {}", parent_directory.display(), fault)))?;
        }
        fs::write(&physical_path, file_data)
            .await
            .map_err(|fault| VaultError::Unavailable(format!("{}: {}", object_key, fault)))
    }

    async fn fetch_object(&self, object_key: &str) -> Result<Vec<u8>, VaultError> {
        fs::read(self.physical_path(object_key))
            .await
            .map_err(|fault| VaultError::from_io(object_key, fault))
    }

    async fn open_stream(&self, object_key: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>, VaultError> {
        let stream_handle = fs::File::open(self.physical_path(object_key))
            .await
            .map_err(|fault| VaultError::from_io(object_key, fault))?;
        debug!("🌊 [VAULT_STREAM]: {} opened for chunked delivery.", object_key);
        Ok(Box::new(stream_handle))
    }

    async fn object_exists(&self, object_key: &str) -> Result<bool, VaultError> {
        match fs::metadata(self.physical_path(object_key)).await {
            Ok(_) => Ok(true),
            Err(fault) if fault.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(fault) => Err(VaultError::Unavailable(format!("{}: {}", object_key, fault))),
        }
    }

    async fn object_size(&self, object_key: &str) -> Result<u64, VaultError> {
        let object_metadata = fs::metadata(self.physical_path(object_key))
            .await
            .map_err(|fault| VaultError::from_io(object_key, fault))?;
        Ok(object_metadata.len())
    }

    async fn delete_object(&self, object_key: &str) -> Result<(), VaultError> {
        fs::remove_file(self.physical_path(object_key))
            .await
            .map_err(|fault| VaultError::from_io(object_key, fault))
    }
}
// FIN DEL ARCHIVO [libs/infra/vault/src/store.rs]
