// [apps/overseer/src/config.rs]
/*!
 * =================================================================
 * APARATO: OVERSEER CONFIGURATION (V9.0 - CLOSED ENV SET)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: CAPTURA TIPADA DEL ENTORNO Y RECHAZO TEMPRANO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLOSED SET: El conjunto de variables que afectan el comportamiento
 *    es cerrado; toda llave 'WARDEN_*' desconocida se rechaza en la
 *    carga, jamás se ignora en silencio.
 * 2. URL NORMALIZATION: 'SERVER_URL' se normaliza con protocolo y sin
 *    barra final para la firma de enlaces de descarga y deep links.
 * 3. EARLY VALIDATION: La ausencia de secretos obligatorios aborta la
 *    ignición antes de abrir el socket.
 * =================================================================
 */

use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Cadencia nominal de latido de los agentes (decenas de segundos).
pub const DEFAULT_HEARTBEAT_INTERVAL_SECONDS: i64 = 40;

/// Prefijo de las variables propias del plano de control.
const WARDEN_ENV_PREFIX: &str = "WARDEN_";

/// Llaves 'WARDEN_*' reconocidas por esta versión.
const KNOWN_WARDEN_KEYS: &[&str] = &["WARDEN_VAULT_ROOT"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("[L3_CONFIG_FAULT]: UNKNOWN_KEY_REJECTED -> {0}")]
    UnknownKey(String),

    #[error("[L3_CONFIG_FAULT]: VALUE_MALFORMED -> {key}: {detail}")]
    Malformed { key: String, detail: String },

    #[error("[L3_CONFIG_FAULT]: REQUIRED_KEY_VOID -> {0}")]
    MissingRequired(String),
}

/// Umbrales y banderas del motor de alertas (conjunto cerrado del entorno).
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub offline_minutes: i64,
    pub low_battery_pct: i32,
    pub device_cooldown_min: i64,
    pub global_cap_per_min: usize,
    pub rollup_threshold: usize,
    pub enable_autoremediation: bool,
    pub unity_down_require_consecutive: bool,
}

/// Configuración soberana completa del Overseer.
#[derive(Debug, Clone)]
pub struct OverseerConfig {
    pub database_url: String,
    pub server_url: String,
    pub listen_port: u16,
    pub admin_key: String,
    pub jwt_secret: String,
    pub hmac_secret: String,
    pub vault_root: PathBuf,
    pub discord_webhook_url: Option<String>,
    pub alerts: AlertConfig,
    pub read_from_last_status: bool,
    pub perf_diff_enabled: bool,
    pub heartbeat_interval_seconds: i64,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default_value: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        None => Ok(default_value),
        Some(raw_value) => raw_value.trim().parse::<T>().map_err(|fault| ConfigError::Malformed {
            key: key.to_string(),
            detail: fault.to_string(),
        }),
    }
}

fn env_flag(key: &str, default_value: bool) -> bool {
    env_string(key)
        .map(|raw_value| raw_value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default_value)
}

/**
 * Normaliza una URL de servicio: protocolo presente y sin barra final.
 * 'localhost' y loopback reciben http; todo lo demás, https.
 */
#[must_use]
pub fn normalize_server_url(raw_url: &str) -> String {
    let trimmed_url = raw_url.trim();

    if trimmed_url.starts_with("http://") || trimmed_url.starts_with("https://") {
        return trimmed_url.trim_end_matches('/').to_string();
    }

    if trimmed_url.contains("localhost") || trimmed_url.starts_with("127.0.0.1") {
        format!("http://{}", trimmed_url.trim_end_matches('/'))
    } else {
        format!("https://{}", trimmed_url.trim_end_matches('/'))
    }
}

impl OverseerConfig {
    /**
     * Captura el entorno completo del proceso.
     *
     * # Errors:
     * - `ConfigError::UnknownKey`: llave 'WARDEN_*' fuera del conjunto cerrado.
     * - `ConfigError::MissingRequired`: 'DATABASE_URL' o 'ADMIN_KEY' ausentes.
     * - `ConfigError::Malformed`: numéricos ilegibles.
     */
    pub fn from_environment() -> Result<Self, ConfigError> {
        Self::reject_unknown_warden_keys()?;

        let database_url =
            env_string("DATABASE_URL").ok_or_else(|| ConfigError::MissingRequired("DATABASE_URL".into()))?;
        let admin_key = env_string("ADMIN_KEY").ok_or_else(|| ConfigError::MissingRequired("ADMIN_KEY".into()))?;

        let jwt_secret = env_string("JWT_SECRET").unwrap_or_else(|| {
            warn!("⚠️  [CONFIG]: JWT_SECRET undefined; using development fallback.");
            "dev-secret-change-in-production".to_string()
        });

        let hmac_secret = env_string("HMAC_SECRET").unwrap_or_else(|| {
            warn!("⚠️  [CONFIG]: HMAC_SECRET undefined; push command signatures are weak.");
            String::new()
        });

        let server_url = normalize_server_url(
            &env_string("SERVER_URL").unwrap_or_else(|| "http://localhost:5000".to_string()),
        );

        let listen_port: u16 = env_parsed("PORT", 5000)?;

        let vault_root = PathBuf::from(
            env_string("WARDEN_VAULT_ROOT").unwrap_or_else(|| "./data/apk-vault".to_string()),
        );

        let alerts = AlertConfig {
            offline_minutes: env_parsed("ALERT_OFFLINE_MINUTES", 12i64)?,
            low_battery_pct: env_parsed("ALERT_LOW_BATTERY_PCT", 15i32)?,
            device_cooldown_min: env_parsed("ALERT_DEVICE_COOLDOWN_MIN", 30i64)?,
            global_cap_per_min: env_parsed("ALERT_GLOBAL_CAP_PER_MIN", 60usize)?,
            rollup_threshold: env_parsed("ALERT_ROLLUP_THRESHOLD", 10usize)?,
            enable_autoremediation: env_flag("ALERTS_ENABLE_AUTOREMEDIATION", false),
            unity_down_require_consecutive: env_flag("UNITY_DOWN_REQUIRE_CONSECUTIVE", false),
        };

        Ok(Self {
            database_url,
            server_url,
            listen_port,
            admin_key,
            jwt_secret,
            hmac_secret,
            vault_root,
            discord_webhook_url: env_string("DISCORD_WEBHOOK_URL"),
            alerts,
            read_from_last_status: env_flag("READ_FROM_LAST_STATUS", false),
            perf_diff_enabled: env_flag("PERF_DIFF_ENABLED", false),
            heartbeat_interval_seconds: DEFAULT_HEARTBEAT_INTERVAL_SECONDS,
        })
    }

    fn reject_unknown_warden_keys() -> Result<(), ConfigError> {
        let known_keys: HashSet<&str> = KNOWN_WARDEN_KEYS.iter().copied().collect();

        for (environment_key, _) in std::env::vars() {
            if environment_key.starts_with(WARDEN_ENV_PREFIX) && !known_keys.contains(environment_key.as_str()) {
                return Err(ConfigError::UnknownKey(environment_key));
            }
        }
        Ok(())
    }

    /// Enlace profundo al tablero para el contexto de las alertas.
    #[must_use]
    pub fn dashboard_device_link(&self, device_identifier: &str) -> String {
        format!("{}/devices/{}", self.server_url, device_identifier)
    }

    /// URL de descarga firmable de una versión APK.
    #[must_use]
    pub fn apk_download_url(&self, apk_version_identifier: i64) -> String {
        format!("{}/v1/apk/download/{}", self.server_url, apk_version_identifier)
    }
}
// FIN DEL ARCHIVO [apps/overseer/src/config.rs]
