// [libs/domain/models/src/device.rs]
/*!
 * =================================================================
 * APARATO: DEVICE IDENTITY & HOT-STATUS PROJECTION (V6.0)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: IDENTIDAD SOBERANA DEL AGENTE Y PROYECCIÓN O(1)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SOFT REVOCATION: Los dispositivos nunca se eliminan; el token se
 *    revoca con 'token_revoked_at' preservando el rastro forense.
 * 2. DUAL HASH: bcrypt para verificación lenta + huella SHA-256 para
 *    la búsqueda indexada O(1).
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Paquete monitorizado por defecto cuando el operador no configura otro.
pub const DEFAULT_MONITORED_PACKAGE: &str = "org.zwanoo.android.speedtest";
/// Nombre visible por defecto de la app monitorizada.
pub const DEFAULT_MONITORED_APP_NAME: &str = "Speedtest";
/// Umbral por defecto (minutos) para declarar la app monitorizada caída.
pub const DEFAULT_MONITOR_THRESHOLD_MIN: i32 = 10;

/**
 * Identidad persistente de un agente Android enrolado en la flota.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub alias: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// Huella SHA-256 del token para búsqueda indexada; NULL en legados.
    #[serde(skip_serializing)]
    pub token_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_int: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_device_owner: Option<bool>,
    pub monitored_package: String,
    pub monitored_app_name: String,
    pub monitor_threshold_min: i32,
    pub monitor_enabled: bool,
    pub auto_relaunch_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ping_sent: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ping_response: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_request_id: Option<String>,
    /// Sello de revocación suave: un valor presente inhabilita el token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_revoked_at: Option<DateTime<Utc>>,
}

/**
 * Proyección caliente de una fila por dispositivo para lecturas O(1).
 * Derivada del log de latidos; reconstruible por reconciliación.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLastStatus {
    pub device_id: String,
    pub last_ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_pct: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unity_running: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_dbm: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub status: String,
}

/// Estado computado de presencia para el radar de la flota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/**
 * Computa la presencia de un dispositivo a partir de su último pulso.
 * Un agente se considera en línea si reportó dentro de 3 intervalos
 * de latido; el factor absorbe jitter de red sin declarar falsos caídos.
 */
#[must_use]
pub fn compute_presence(
    last_seen: DateTime<Utc>,
    heartbeat_interval_seconds: i64,
    now: DateTime<Utc>,
) -> PresenceStatus {
    let offline_threshold = Duration::seconds(heartbeat_interval_seconds * 3);
    if now.signed_duration_since(last_seen) <= offline_threshold {
        PresenceStatus::Online
    } else {
        PresenceStatus::Offline
    }
}

/// Evento auditable del ciclo de vida del dispositivo (cola asíncrona).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub device_id: String,
    pub event_type: String,
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_json: Option<String>,
}
// FIN DEL ARCHIVO [libs/domain/models/src/device.rs]
