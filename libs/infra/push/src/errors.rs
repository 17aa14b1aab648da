// [libs/infra/push/src/errors.rs]
/*!
 * =================================================================
 * APARATO: PUSH ERROR CATALOG (V5.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL UPLINK PUSH
 *
 * Las credenciales ausentes se catalogan como indisponibilidad del
 * proveedor, jamás como "no encontrado": el operador debe distinguir
 * un despliegue mal configurado de un dispositivo inexistente.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PushError {
    /// Ninguna fuente de credenciales configurada en el entorno.
    #[error("[L3_PUSH_CONFIG_FAULT]: PROVIDER_UNAVAILABLE -> {0}")]
    CredentialsMissing(String),

    /// Credenciales presentes pero estructuralmente inválidas.
    #[error("[L3_PUSH_CONFIG_FAULT]: CREDENTIALS_MALFORMED -> {0}")]
    CredentialsMalformed(String),

    /// Fallo en el intercambio OAuth de la cuenta de servicio.
    #[error("[L3_PUSH_AUTH_FAULT]: TOKEN_EXCHANGE_REJECTED -> {0}")]
    TokenExchange(String),

    /// Fallo de transporte (timeout, DNS, TLS) sin respuesta del proveedor.
    #[error("[L3_PUSH_NET_FAULT]: PROVIDER_UPLINK_SEVERED -> {0}")]
    Transport(#[from] reqwest::Error),
}
// FIN DEL ARCHIVO [libs/infra/push/src/errors.rs]
