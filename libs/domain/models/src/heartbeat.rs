// [libs/domain/models/src/heartbeat.rs]
/*!
 * =================================================================
 * APARATO: HEARTBEAT CONTRACT & BUCKET MATH (V6.1 - PULSE STRATA)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: GRAMÁTICA DEL LATIDO Y DEDUPLICACIÓN POR CUBO DE 10s
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WIRE PARITY: El payload refleja bit-a-bit lo que emite el agente
 *    Android, incluyendo señales de la app monitorizada y memoria.
 * 2. BUCKET DETERMINISM: La llave de deduplicación (minuto truncado +
 *    ranura de 10s) se calcula idéntica en Rust y en el índice SQL.
 *
 * # Mathematical Proof (Bucket Uniqueness):
 * floor(epoch(ts)/10) mod 6 particiona cada minuto en exactamente 6
 * ranuras disjuntas. Junto al minuto truncado, dos latidos del mismo
 * dispositivo separados por menos de 10s colisionan en la misma llave
 * y el segundo se descarta en el índice único.
 * =================================================================
 */

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reporte de instalación por paquete incluido en cada latido.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppVersionReport {
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_code: Option<i64>,
}

/// Señales de vida de la aplicación monitorizada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredAppSignals {
    pub has_service_notification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_recent_seconds: Option<i64>,
}

/// Biometría de batería del dispositivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryReport {
    pub pct: i32,
    pub charging: bool,
    pub temperature_c: f32,
}

/// Identidad de sistema y build del dispositivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemReport {
    pub uptime_s: i64,
    pub android_version: String,
    pub sdk_int: i32,
    pub patch_level: String,
    pub build_id: String,
    pub model: String,
    pub manufacturer: String,
}

/// Presión de memoria reportada por el agente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryReport {
    pub total_ram_mb: i64,
    pub avail_ram_mb: i64,
    pub pressure_pct: i32,
}

/// Transporte de red activo en el momento del pulso.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkReport {
    pub transport: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_dbm: Option<i32>,
}

/// Pistas de auto-curación emitidas por el agente tras un colapso local.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfHealHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_crash_monitored_app: Option<String>,
}

/**
 * Payload completo del latido tal como lo emite el agente Android.
 *
 * El 'device_id' del cuerpo es opcional y meramente informativo: la
 * identidad autoritativa proviene del token Bearer autenticado.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    pub timestamp_utc: String,
    #[serde(default)]
    pub app_versions: HashMap<String, AppVersionReport>,
    pub monitored_app_signals: MonitoredAppSignals,
    pub battery: BatteryReport,
    pub system: SystemReport,
    pub memory: MemoryReport,
    pub network: NetworkReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ping_response: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_heal_hints: Option<SelfHealHints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_device_owner: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitored_foreground_recent_s: Option<i64>,
}

/**
 * Fila del log particionado 'device_heartbeats'.
 * El log es la fuente autoritativa; la proyección se reconstruye de él.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatSample {
    pub device_id: String,
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_pct: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_dbm: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unity_running: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub status: String,
}

impl HeartbeatSample {
    /**
     * Proyecta el payload del agente en una fila del log autoritativo.
     *
     * # Logic:
     * 'unity_running' se deriva de la notificación de servicio activa de
     * la app monitorizada; el transporte de red y la SSID se copian tal
     * cual para el radar de la flota.
     */
    #[must_use]
    pub fn from_payload(device_identifier: &str, payload: &HeartbeatPayload, ts: DateTime<Utc>) -> Self {
        Self {
            device_id: device_identifier.to_string(),
            ts,
            battery_pct: Some(payload.battery.pct),
            plugged: Some(payload.battery.charging),
            network_type: Some(payload.network.transport.clone()),
            ssid: payload.network.ssid.clone(),
            signal_dbm: payload.network.signal_dbm,
            unity_running: Some(payload.monitored_app_signals.has_service_notification),
            agent_version: payload.app_version.clone(),
            ip: payload.network.ip.clone(),
            status: "ok".to_string(),
        }
    }
}

/// Llave de deduplicación: (minuto truncado, ranura de 10 segundos).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupeBucket {
    pub minute_floor: DateTime<Utc>,
    pub ten_second_slot: i16,
}

/**
 * Calcula el cubo de deduplicación de 10 segundos para un instante dado.
 * Debe permanecer bit-perfecto con el índice único del esquema SQL:
 * (device_id, date_trunc('minute', ts), floor(extract(epoch from ts)/10)::int % 6).
 */
#[must_use]
pub fn dedupe_bucket(ts: DateTime<Utc>) -> DedupeBucket {
    let minute_floor = ts
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts);
    let ten_second_slot = ((ts.timestamp().div_euclid(10)) % 6) as i16;
    DedupeBucket { minute_floor, ten_second_slot }
}
// FIN DEL ARCHIVO [libs/domain/models/src/heartbeat.rs]
