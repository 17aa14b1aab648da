// [libs/domain/models/src/deployment.rs]
/*!
 * =================================================================
 * APARATO: STAGED ROLLOUT CONTRACTS (V6.3 - WAVE MACHINE)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: MÁQUINAS DE ESTADO DE DESPLIEGUE POR OLAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SURROGATE IDS: Los ciclos run ↔ batch ↔ installation se modelan
 *    con ids enteros y referencias FK; la resolución es siempre por
 *    búsqueda, jamás por grafos de punteros.
 * 2. TERMINAL FREEZE: Un lote en estado terminal jamás vuelve a mutar.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estado global de una corrida de despliegue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Aborted,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Aborted => "aborted",
        }
    }

    #[must_use]
    pub fn parse(raw_status: &str) -> Option<Self> {
        match raw_status {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "paused" => Some(RunStatus::Paused),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            "aborted" => Some(RunStatus::Aborted),
            _ => None,
        }
    }

    /// Los estados terminales congelan la corrida para siempre.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Aborted)
    }
}

/// Estado de un lote individual dentro de la corrida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl BatchStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Running => "running",
            BatchStatus::Succeeded => "succeeded",
            BatchStatus::Failed => "failed",
            BatchStatus::TimedOut => "timed_out",
        }
    }

    #[must_use]
    pub fn parse(raw_status: &str) -> Option<Self> {
        match raw_status {
            "pending" => Some(BatchStatus::Pending),
            "running" => Some(BatchStatus::Running),
            "succeeded" => Some(BatchStatus::Succeeded),
            "failed" => Some(BatchStatus::Failed),
            "timed_out" => Some(BatchStatus::TimedOut),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Succeeded | BatchStatus::Failed | BatchStatus::TimedOut)
    }
}

/// Contadores de desenlace acumulados (monótonos) de una corrida o lote.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OutcomeCounters {
    pub success_count: i32,
    pub failure_count: i32,
    pub timeout_count: i32,
}

/**
 * Corrida de despliegue: una versión APK empujada a la flota en olas.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRun {
    pub id: i64,
    pub apk_version_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiated_by: Option<String>,
    pub total_devices: i32,
    pub batch_size: i32,
    pub success_threshold: i32,
    pub batch_timeout_minutes: i32,
    pub status: RunStatus,
    pub current_batch_index: i32,
    pub total_batches: i32,
    #[serde(flatten)]
    pub counters: OutcomeCounters,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/**
 * Lote (ola) dentro de una corrida. Único por (run_id, batch_index).
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentBatch {
    pub id: i64,
    pub run_id: i64,
    pub batch_index: i32,
    pub status: BatchStatus,
    pub devices_in_batch: i32,
    #[serde(flatten)]
    pub counters: OutcomeCounters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Versión APK registrada en la bóveda de artefactos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApkVersion {
    pub id: i64,
    pub package_name: String,
    pub version_code: i64,
    pub version_name: String,
    pub file_path: String,
    pub file_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub is_active: bool,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
}

/**
 * Intento de instalación por dispositivo con telemetría de descarga.
 * Referencia run/batch por FK anulable; una instalación manual no
 * pertenece a ninguna corrida.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApkInstallation {
    pub id: i64,
    pub device_id: String,
    pub apk_version_id: i64,
    pub status: String,
    pub initiated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_run_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_batch_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_downloaded: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_speed_kbps: Option<i64>,
}

/**
 * Particiona 'total_devices' en tamaños de lote para una corrida nueva.
 * La suma de los lotes es exactamente el total (invariante de cobertura).
 */
#[must_use]
pub fn partition_into_batches(total_devices: i32, batch_size: i32) -> Vec<i32> {
    if total_devices <= 0 || batch_size <= 0 {
        return Vec::new();
    }
    let mut batch_sizes = Vec::new();
    let mut remaining_devices = total_devices;
    while remaining_devices > 0 {
        let wave_size = remaining_devices.min(batch_size);
        batch_sizes.push(wave_size);
        remaining_devices -= wave_size;
    }
    batch_sizes
}
// FIN DEL ARCHIVO [libs/domain/models/src/deployment.rs]
