// [apps/overseer/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: API HANDLER REGISTRY (V10.0)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO NOMINAL DE ADAPTADORES HTTP
 * =================================================================
 */

pub mod admin;
pub mod agent;
pub mod apk;
pub mod deployment;
pub mod ops;
