// [libs/domain/models/src/command.rs]
/*!
 * =================================================================
 * APARATO: COMMAND LEDGER CONTRACTS (V5.2 - C2 GRAMMAR)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: GRAMÁTICA DE MANDOS PUSH Y CORRELACIÓN DE RESULTADOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. GLOBAL UNIQUENESS: 'request_id' es único a nivel de flota; una
 *    colisión con payload distinto es una violación fatal de invariante.
 * 2. IMMUTABLE LEDGER: Las entradas del libro mayor jamás se mutan tras
 *    la escritura; sólo el resultado correlacionado llega después.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conjunto cerrado de acciones despachables a los agentes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Ping,
    LaunchApp,
    InstallApk,
}

impl CommandAction {
    /// Representación de cable estable (la que viaja en el mensaje FCM).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandAction::Ping => "ping",
            CommandAction::LaunchApp => "launch_app",
            CommandAction::InstallApk => "install_apk",
        }
    }

    /// Parseo estricto desde el cable; acciones desconocidas se rechazan.
    #[must_use]
    pub fn parse(raw_action: &str) -> Option<Self> {
        match raw_action {
            "ping" => Some(CommandAction::Ping),
            "launch_app" => Some(CommandAction::LaunchApp),
            "install_apk" => Some(CommandAction::InstallApk),
            _ => None,
        }
    }
}

/// Desenlace de un intento de despacho contra el proveedor push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Sent,
    Failed,
}

impl DispatchStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Sent => "sent",
            DispatchStatus::Failed => "failed",
        }
    }
}

/**
 * Entrada inmutable del libro mayor de mandos.
 * Se escribe DESPUÉS de que el proveedor responde; una cancelación en
 * vuelo no deja fila, por lo que el re-despacho con el mismo id es seguro.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub request_id: Uuid,
    pub device_id: String,
    pub action: CommandAction,
    pub ts_issued: DateTime<Utc>,
    /// SHA-256 hexadecimal del payload de datos despachado.
    pub payload_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<i64>,
    pub status: DispatchStatus,
}

/// Desenlace reportado por el agente para un mando correlacionado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Completed,
    Failed,
    Timeout,
}

impl CommandOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandOutcome::Completed => "completed",
            CommandOutcome::Failed => "failed",
            CommandOutcome::Timeout => "timeout",
        }
    }

    #[must_use]
    pub fn parse(raw_outcome: &str) -> Option<Self> {
        match raw_outcome {
            "completed" => Some(CommandOutcome::Completed),
            "failed" => Some(CommandOutcome::Failed),
            "timeout" => Some(CommandOutcome::Timeout),
            _ => None,
        }
    }
}

/**
 * Resultado reportado por el agente vía el endpoint 'action-result'.
 * Primera escritura gana; duplicados posteriores son no-ops observables.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub request_id: Uuid,
    pub device_id: String,
    pub action: CommandAction,
    pub outcome: CommandOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub finished_at: DateTime<Utc>,
}
// FIN DEL ARCHIVO [libs/domain/models/src/command.rs]
