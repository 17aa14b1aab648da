// [apps/overseer/src/main.rs]
/*!
 * =================================================================
 * APARATO: OVERSEER MAIN ENTRY POINT (V15.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * El proceso garantiza que la configuración se valide y la ventana de
 * particiones se materialice ANTES de la apertura del socket TCP,
 * previniendo estados de carrera donde un agente latiría contra una
 * hija física aún no cristalizada.
 * =================================================================
 */

use warden_overseer::config::OverseerConfig;
use warden_overseer::kernel::OverseerKernel;

use dotenvy::dotenv;
use tracing::{error, info};
use warden_shared_argus::init_tracing;

/**
 * Punto de ignición supremo del binario del Overseer.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    // Hidrata las variables de .env en el espacio de nombres del proceso.
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (ARGUS)
    init_tracing("warden_overseer");

    // 3. CONFIGURACIÓN DEL RUNTIME SOBERANO
    let runtime_overseer = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime_overseer.block_on(async {
        info!("🛰️  [COMMAND_CENTER]: Fleet ignition sequence starting...");

        // 4. ADQUISICIÓN DE COORDENADAS TÁCTICAS (conjunto cerrado)
        let overseer_config = match OverseerConfig::from_environment() {
            Ok(certified_config) => certified_config,
            Err(config_fault) => {
                error!("💀 [CONFIG_COLLAPSE]: {}", config_fault);
                std::process::exit(1);
            }
        };

        // 5. CONSTRUCCIÓN DEL KERNEL SOBERANO (ESTRATO L1-APP)
        let kernel_instance = OverseerKernel::ignite(overseer_config).await;

        // 6. IGNICIÓN DE OPERACIONES DE LA FLOTA
        info!("🚀 [WARDEN_ONLINE]: Control plane fully operational.");
        kernel_instance.launch_sovereign_operations().await;

        Ok(())
    })
}
