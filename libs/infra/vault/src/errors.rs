// [libs/infra/vault/src/errors.rs]
/*!
 * =================================================================
 * APARATO: VAULT ERROR CATALOG (V6.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE LA BÓVEDA
 *
 * La ausencia de un objeto se distingue del colapso de transporte: un
 * 404 jamás debe enmascarar una bóveda mal montada o sin permisos.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    /// El objeto solicitado no existe en la bóveda.
    #[error("[L3_VAULT_FAULT]: OBJECT_NOT_FOUND -> {0}")]
    NotFound(String),

    /// La bóveda no está disponible (raíz inexistente, permisos, montaje).
    #[error("[L3_VAULT_FAULT]: VAULT_UNAVAILABLE -> {0}")]
    Unavailable(String),

    /// El backend rechazó la operación por presión transitoria.
    /// El llamador reintenta con retroceso exponencial (0.5s, 1s, 2s).
    #[error("[L3_VAULT_FAULT]: BACKEND_THROTTLED -> {0}")]
    Throttled(String),

    /// El artefacto violó las reglas de admisión (extensión o tamaño).
    #[error("[L3_VAULT_FAULT]: ADMISSION_REJECTED -> {0}")]
    ValidationRejected(String),

    /// La verificación de presencia post-escritura no encontró el objeto.
    #[error("[L3_VAULT_FAULT]: WRITE_VERIFICATION_FAILED -> {0}")]
    VerificationFailed(String),
}

impl VaultError {
    /// Proyección de un fallo de E/S preservando la distinción NotFound.
    #[must_use]
    pub fn from_io(object_key: &str, fault: std::io::Error) -> Self {
        if fault.kind() == std::io::ErrorKind::NotFound {
            VaultError::NotFound(object_key.to_string())
        } else {
            VaultError::Unavailable(format!("{}: {}", object_key, fault))
        }
    }
}
// FIN DEL ARCHIVO [libs/infra/vault/src/errors.rs]
