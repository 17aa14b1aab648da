// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY REGISTRY (V9.0 - AUTHORITY INDEX)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO NOMINAL DE AUTORIDADES DE PERSISTENCIA
 * =================================================================
 */

pub mod alert_state;
pub mod apk;
pub mod command_ledger;
pub mod deployment;
pub mod device;
pub mod event;
pub mod heartbeat;
pub mod partition;
pub mod user;

pub use alert_state::AlertStateRepository;
pub use apk::ApkRepository;
pub use command_ledger::CommandLedgerRepository;
pub use deployment::DeploymentRepository;
pub use device::DeviceRepository;
pub use event::DeviceEventRepository;
pub use heartbeat::HeartbeatRepository;
pub use partition::PartitionRepository;
pub use user::UserRepository;
