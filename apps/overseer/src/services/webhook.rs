// INICIO DEL ARCHIVO [apps/overseer/src/services/webhook.rs]
/*!
 * =================================================================
 * APARATO: HERALD WEBHOOK CLIENT (V8.2 - DISCORD UPLINK)
 * CLASIFICACIÓN: INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: ENTREGA ESTRUCTURADA DE ALERTAS AL CANAL DEL OPERADOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STRUCTURED EMBEDS: Cada señal viaja con severidad, condición,
 *    identidad del dispositivo, métricas relevantes, umbral y un deep
 *    link al tablero de la flota.
 * 2. SILENT DEGRADATION: Sin URL configurada, la entrega se reporta
 *    como no-realizada y el pipeline continúa; una alerta jamás tumba
 *    el tick del centinela.
 * 3. HARD DEADLINE: 10 segundos por entrega, sin reintentos aquí.
 * =================================================================
 */

use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use warden_domain_models::alert::{AlertCondition, AlertSeverity, AlertSignal};

use crate::state::alert_trackers::RollupDevice;

/// Timeout nominal de toda entrega saliente.
const WEBHOOK_TIMEOUT_SECONDS: u64 = 10;

/// Color del embed por severidad (paleta del tablero).
fn severity_color(severity: AlertSeverity) -> u32 {
    match severity {
        AlertSeverity::Info => 0x3B_A5_5D,
        AlertSeverity::Warn => 0xE6_A2_3C,
        AlertSeverity::Critical => 0xC0_39_2B,
    }
}

/**
 * Cliente del canal de alertas del operador (clase Discord).
 */
pub struct WebhookClient {
    webhook_url: Option<String>,
    dashboard_base_url: String,
    network_client: reqwest::Client,
}

impl WebhookClient {
    #[must_use]
    pub fn new(webhook_url: Option<String>, dashboard_base_url: String) -> Self {
        let network_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECONDS))
            .user_agent("Warden-Overseer-Herald")
            .build()
            .unwrap_or_default();

        Self { webhook_url, dashboard_base_url, network_client }
    }

    async fn deliver(&self, payload: serde_json::Value) -> bool {
        let Some(webhook_url) = &self.webhook_url else {
            debug!("⚪ [HERALD_STANDBY]: No webhook configured; delivery skipped.");
            return false;
        };

        match self.network_client.post(webhook_url).json(&payload).send().await {
            Ok(delivery_response) if delivery_response.status().is_success() => true,
            Ok(delivery_response) => {
                warn!("⚠️  [HERALD_REJECTED]: Webhook returned HTTP {}.", delivery_response.status());
                false
            }
            Err(delivery_fault) => {
                warn!("❌ [HERALD_FAULT]: Webhook delivery failed: {}", delivery_fault);
                false
            }
        }
    }

    /**
     * Entrega una elevación individual con su contexto de diagnóstico.
     */
    #[instrument(skip(self, signal), fields(device = %signal.device_id, condition = %signal.condition.as_str()))]
    pub async fn send_alert(&self, signal: &AlertSignal) -> bool {
        let mut context_fields = vec![
            json!({"name": "Device", "value": format!("{} ({})", signal.alias, signal.device_id), "inline": true}),
            json!({"name": "Severity", "value": signal.severity.as_str(), "inline": true}),
        ];

        if let Some(last_seen) = signal.last_seen {
            context_fields.push(json!({"name": "Last seen", "value": last_seen.to_rfc3339(), "inline": true}));
        }
        if let Some(battery_pct) = signal.battery_pct {
            context_fields.push(json!({"name": "Battery", "value": format!("{}%", battery_pct), "inline": true}));
        }
        if let Some(network_type) = &signal.network_type {
            context_fields.push(json!({"name": "Network", "value": network_type, "inline": true}));
        }
        if let Some(monitored_app_name) = &signal.monitored_app_name {
            context_fields.push(json!({"name": "Monitored app", "value": monitored_app_name, "inline": true}));
        }
        if let Some(threshold_min) = signal.threshold_min {
            context_fields.push(json!({"name": "Threshold", "value": format!("{} min", threshold_min), "inline": true}));
        }

        let alert_payload = json!({
            "embeds": [{
                "title": format!("🚨 {} — {}", signal.condition.as_str(), signal.alias),
                "url": format!("{}/devices/{}", self.dashboard_base_url, signal.device_id),
                "color": severity_color(signal.severity),
                "fields": context_fields,
            }]
        });

        self.deliver(alert_payload).await
    }

    /**
     * Entrega la recuperación simétrica de una condición elevada.
     */
    #[instrument(skip(self, signal), fields(device = %signal.device_id))]
    pub async fn send_recovery(&self, signal: &AlertSignal) -> bool {
        let recovery_payload = json!({
            "embeds": [{
                "title": format!("✅ {} recovered — {}", signal.condition.as_str(), signal.alias),
                "url": format!("{}/devices/{}", self.dashboard_base_url, signal.device_id),
                "color": severity_color(AlertSeverity::Info),
                "fields": [
                    {"name": "Device", "value": format!("{} ({})", signal.alias, signal.device_id), "inline": true}
                ],
            }]
        });

        self.deliver(recovery_payload).await
    }

    /**
     * Entrega el mensaje agregado de roll-up con la lista de afectados.
     */
    #[instrument(skip(self, affected_devices), fields(condition = %condition.as_str(), devices = affected_devices.len()))]
    pub async fn send_rollup(
        &self,
        condition: AlertCondition,
        severity: AlertSeverity,
        affected_devices: &[RollupDevice],
    ) -> bool {
        let device_roster = affected_devices
            .iter()
            .map(|device| format!("• {} ({})", device.alias, device.device_id))
            .collect::<Vec<_>>()
            .join("\n");

        let rollup_payload = json!({
            "embeds": [{
                "title": format!("📊 {} — {} devices affected", condition.as_str(), affected_devices.len()),
                "description": device_roster,
                "url": self.dashboard_base_url,
                "color": severity_color(severity),
            }]
        });

        self.deliver(rollup_payload).await
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/services/webhook.rs]
