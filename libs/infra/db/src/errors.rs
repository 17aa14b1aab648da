// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V8.1 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PANOPTICON COMPLIANCE: Formatea los mensajes con prefijos de
 *    estrato para su renderizado cromático en el tablero de la flota.
 * 2. INVARIANT AWARENESS: Distingue los fallos recuperables de las
 *    violaciones de invariante de proceso (divergencia de ledger,
 *    caída de partición no archivada) que son fatales por contrato.
 * 3. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster PostgreSQL.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor PostgreSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] sqlx::Error),

    /// Fallo en la transformación de tipos entre PostgreSQL y el dominio.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    // --- ESTRATO DE LIBRO MAYOR DE MANDOS ---

    /// El 'request_id' solicitado no existe en el libro mayor.
    #[error("[L3_LEDGER_FAULT]: REQUEST_IDENTIFIER_NOT_FOUND")]
    CommandNotFound,

    /// Doble escritura con el mismo 'request_id' pero payload divergente.
    /// Violación de invariante de proceso: el llamador debe tratarla como fatal.
    #[error("[L3_LEDGER_FAULT]: LEDGER_DIVERGENCE -> request {0} rewritten with foreign payload hash")]
    LedgerDivergence(String),

    // --- ESTRATO DE DESPLIEGUE POR OLAS ---

    /// La corrida o el lote solicitado no existe.
    #[error("[L3_ROLLOUT_FAULT]: DEPLOYMENT_NOT_FOUND")]
    DeploymentNotFound,

    /// Transición de estado rechazada (estado terminal congelado).
    #[error("[L3_ROLLOUT_FAULT]: INVALID_STATE_TRANSITION -> {0}")]
    InvalidStateTransition(String),

    // --- ESTRATO DE PARTICIONES ---

    /// La partición solicitada no está registrada en 'hb_partitions'.
    #[error("[L3_PARTITION_FAULT]: PARTITION_NOT_FOUND -> {0}")]
    PartitionNotFound(String),

    /// Intento de caída de una partición no vacía y no archivada.
    /// Violación de invariante de proceso: el llamador debe tratarla como fatal.
    #[error("[L3_PARTITION_FAULT]: UNARCHIVED_DROP_VETO -> {0} holds live rows")]
    UnarchivedDropVeto(String),

    /// Retroceso de ciclo de vida de partición rechazado.
    #[error("[L3_PARTITION_FAULT]: LIFECYCLE_REGRESSION_VETO -> {0}")]
    LifecycleRegression(String),

    // --- ESTRATO DE IDENTIDAD ---

    /// El dispositivo solicitado no existe en el registro de la flota.
    #[error("[L3_FLEET_FAULT]: DEVICE_NOT_FOUND")]
    DeviceNotFound,

    /// El operador solicitado no existe.
    #[error("[L3_FLEET_FAULT]: OPERATOR_NOT_FOUND")]
    UserNotFound,
}

impl DbError {
    /// Clasifica los fallos que el contrato del sistema declara fatales.
    #[must_use]
    pub fn is_process_invariant_violation(&self) -> bool {
        matches!(self, DbError::LedgerDivergence(_) | DbError::UnarchivedDropVeto(_))
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/errors.rs]
