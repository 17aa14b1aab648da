// [libs/infra/push/src/credentials.rs]
/*!
 * =================================================================
 * APARATO: SERVICE ACCOUNT CREDENTIALS (V5.0 - DUAL SOURCE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ADQUISICIÓN Y VALIDACIÓN DE CREDENCIALES FCM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL SOURCE: JSON inyectado directo por secreto de entorno
 *    (preferido, seguro ante forks públicos) o ruta de archivo
 *    (compatibilidad hacia atrás).
 * 2. EARLY VALIDATION: 'project_id' vacío se rechaza en la carga; un
 *    mensaje jamás parte hacia un proyecto sin identidad.
 * =================================================================
 */

use crate::errors::PushError;
use serde::Deserialize;

/// Variable con el contenido JSON completo de la cuenta de servicio.
pub const CREDENTIALS_JSON_ENV: &str = "FIREBASE_SERVICE_ACCOUNT_JSON";
/// Variable con la ruta al archivo de la cuenta de servicio.
pub const CREDENTIALS_PATH_ENV: &str = "FIREBASE_SERVICE_ACCOUNT_PATH";

/// Alcance OAuth requerido para el despacho de mensajería FCM.
pub const FCM_MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Material de identidad de la cuenta de servicio del proyecto.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl ServiceAccountCredentials {
    /**
     * Adquiere las credenciales desde el entorno del proceso.
     *
     * # Errors:
     * - `PushError::CredentialsMissing`: ninguna fuente configurada;
     *   el llamador la proyecta como indisponibilidad del proveedor.
     * - `PushError::CredentialsMalformed`: JSON ilegible o incompleto.
     */
    pub fn from_environment() -> Result<Self, PushError> {
        let inline_json = std::env::var(CREDENTIALS_JSON_ENV).unwrap_or_default();
        if !inline_json.is_empty() {
            return Self::parse_json(&inline_json);
        }

        let credentials_path = std::env::var(CREDENTIALS_PATH_ENV).unwrap_or_default();
        if !credentials_path.is_empty() {
            let file_contents = std::fs::read_to_string(&credentials_path).map_err(|fault| {
                PushError::CredentialsMalformed(format!("file {} unreadable: {}", credentials_path, fault))
            })?;
            return Self::parse_json(&file_contents);
        }

        Err(PushError::CredentialsMissing(format!(
            "set {} (preferred) or {}",
            CREDENTIALS_JSON_ENV, CREDENTIALS_PATH_ENV
        )))
    }

    /// Parsea y certifica la completitud estructural del material.
    pub fn parse_json(raw_json: &str) -> Result<Self, PushError> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(raw_json)
            .map_err(|fault| PushError::CredentialsMalformed(format!("invalid JSON: {}", fault)))?;

        if credentials.project_id.trim().is_empty() {
            return Err(PushError::CredentialsMalformed("project_id field is empty".to_string()));
        }
        if credentials.client_email.trim().is_empty() {
            return Err(PushError::CredentialsMalformed("client_email field is empty".to_string()));
        }
        if credentials.private_key.trim().is_empty() {
            return Err(PushError::CredentialsMalformed("private_key field is empty".to_string()));
        }

        Ok(credentials)
    }

    /// Endpoint de despacho FCM v1 del proyecto.
    #[must_use]
    pub fn messages_endpoint(&self) -> String {
        format!("https://fcm.googleapis.com/v1/projects/{}/messages:send", self.project_id)
    }
}
// FIN DEL ARCHIVO [libs/infra/push/src/credentials.rs]
