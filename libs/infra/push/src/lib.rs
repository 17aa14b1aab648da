// [libs/infra/push/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PUSH PROVIDER HUB (V5.0 - FCM V1 UPLINK)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPORTACIÓN NOMINAL DEL ESTRATO PUSH
 * =================================================================
 */

pub mod client;
pub mod credentials;
pub mod errors;

pub use client::{FcmClient, ProviderResponse};
pub use credentials::ServiceAccountCredentials;
pub use errors::PushError;
