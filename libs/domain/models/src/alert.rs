// [libs/domain/models/src/alert.rs]
/*!
 * =================================================================
 * APARATO: ALERT GRAMMAR & STATE MACHINE (V7.0 - SENTINEL STRATA)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CONDICIONES DE ALERTA, SEVERIDAD Y TRANSICIONES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLOSED SET: El catálogo de condiciones es cerrado (OFFLINE,
 *    LOW_BATTERY, UNITY_DOWN) con recuperaciones simétricas.
 * 2. DEBOUNCE READY: 'condition_started_at' soporta la exigencia de
 *    dos evaluaciones consecutivas antes de elevar UNITY_DOWN.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catálogo cerrado de condiciones vigiladas por el centinela.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertCondition {
    #[serde(rename = "OFFLINE")]
    Offline,
    #[serde(rename = "LOW_BATTERY")]
    LowBattery,
    #[serde(rename = "UNITY_DOWN")]
    UnityDown,
}

impl AlertCondition {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCondition::Offline => "OFFLINE",
            AlertCondition::LowBattery => "LOW_BATTERY",
            AlertCondition::UnityDown => "UNITY_DOWN",
        }
    }

    #[must_use]
    pub fn parse(raw_condition: &str) -> Option<Self> {
        match raw_condition {
            "OFFLINE" => Some(AlertCondition::Offline),
            "LOW_BATTERY" => Some(AlertCondition::LowBattery),
            "UNITY_DOWN" => Some(AlertCondition::UnityDown),
            _ => None,
        }
    }
}

/// Severidad semántica para el tratamiento visual del webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Warn,
    Critical,
}

impl AlertSeverity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warn => "WARN",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

/// Fase del ciclo de vida de una condición por dispositivo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLifecycle {
    Ok,
    Pending,
    Raised,
}

impl AlertLifecycle {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLifecycle::Ok => "ok",
            AlertLifecycle::Pending => "pending",
            AlertLifecycle::Raised => "raised",
        }
    }

    #[must_use]
    pub fn parse(raw_state: &str) -> Option<Self> {
        match raw_state {
            "ok" => Some(AlertLifecycle::Ok),
            "pending" => Some(AlertLifecycle::Pending),
            "raised" => Some(AlertLifecycle::Raised),
            _ => None,
        }
    }
}

/**
 * Estado persistente de una condición para un dispositivo.
 * Único por (device_id, condition).
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertState {
    pub device_id: String,
    pub condition: AlertCondition,
    pub state: AlertLifecycle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_cleared_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_raised_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_recovered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_value: Option<String>,
}

/**
 * Señal producida por una pasada de evaluación del centinela.
 * Transporta el contexto necesario para el webhook y la remediación,
 * sin acoplar el evaluador al canal de entrega.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSignal {
    pub condition: AlertCondition,
    pub severity: AlertSeverity,
    pub device_id: String,
    pub alias: String,
    pub is_recovery: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_pct: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unity_running: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitored_package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitored_app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_recent_s: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Habilita la invocación del motor de remediación tras la entrega.
    #[serde(default)]
    pub requires_remediation: bool,
    /// Marca recuperaciones detectadas tras un relanzamiento automático.
    #[serde(default)]
    pub self_healed: bool,
}
// FIN DEL ARCHIVO [libs/domain/models/src/alert.rs]
