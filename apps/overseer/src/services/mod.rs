// [apps/overseer/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICE LAYER REGISTRY (V10.0)
 * CLASIFICACIÓN: SERVICE LAYER (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO NOMINAL DE SERVICIOS Y DAEMONS
 * =================================================================
 */

pub mod alert_engine;
pub mod command_dispatcher;
pub mod deployment_controller;
pub mod event_flush;
pub mod fast_reads;
pub mod perf_harness;
pub mod purge;
pub mod reconciliation;
pub mod scheduler;
pub mod webhook;
