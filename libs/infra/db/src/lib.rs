// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PERSISTENCE INFRASTRUCTURE HUB (V9.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPORTACIÓN NOMINAL DEL ESTRATO DE PERSISTENCIA
 * =================================================================
 */

pub mod advisory;
pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::{PgClient, PoolHealthReport};
pub use errors::DbError;
