// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: SOVEREIGN DATABASE SCHEMA (V11.0 - FLEET STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. PARTITION NATIVE: El log de latidos nace como tabla particionada
 *    por rango de 'ts'; las hijas diarias las gobierna el
 *    PartitionRepository junto a la tabla de metadatos 'hb_partitions'.
 * 2. IDEMPOTENCIA: Toda sentencia es re-ejecutable en caliente
 *    (IF NOT EXISTS) para migraciones sin ventana de mantenimiento.
 * 3. PERFORMANCE: Índices de aceleración para el radar de la flota y
 *    el despacho masivo de mandos.
 * =================================================================
 */

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{debug, info, instrument};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * Define las entidades base del plano de control MDM.
 */
const TACTICAL_TABLES: &[(&str, &str)] = &[
    ("TABLE_USERS", r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username VARCHAR NOT NULL UNIQUE,
            email VARCHAR UNIQUE,
            password_hash VARCHAR NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
    "#),
    ("TABLE_DEVICES", r#"
        CREATE TABLE IF NOT EXISTS devices (
            id VARCHAR PRIMARY KEY,
            alias VARCHAR NOT NULL,
            app_version VARCHAR,
            token_hash VARCHAR NOT NULL,
            token_fingerprint VARCHAR UNIQUE,
            fcm_token VARCHAR,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            last_seen TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            model VARCHAR,
            manufacturer VARCHAR,
            android_version VARCHAR,
            sdk_int INTEGER,
            build_id VARCHAR,
            is_device_owner BOOLEAN,
            monitored_package VARCHAR NOT NULL DEFAULT 'org.zwanoo.android.speedtest',
            monitored_app_name VARCHAR NOT NULL DEFAULT 'Speedtest',
            monitor_threshold_min INTEGER NOT NULL DEFAULT 10,
            monitor_enabled BOOLEAN NOT NULL DEFAULT TRUE,
            auto_relaunch_enabled BOOLEAN NOT NULL DEFAULT FALSE,
            last_ping_sent TIMESTAMPTZ,
            last_ping_response TIMESTAMPTZ,
            ping_request_id VARCHAR,
            token_revoked_at TIMESTAMPTZ
        );
    "#),
    ("TABLE_DEVICE_HEARTBEATS", r#"
        CREATE TABLE IF NOT EXISTS device_heartbeats (
            hb_id BIGSERIAL,
            device_id VARCHAR NOT NULL,
            ts TIMESTAMPTZ NOT NULL,
            ip VARCHAR,
            status VARCHAR NOT NULL DEFAULT 'ok',
            battery_pct INTEGER,
            plugged BOOLEAN,
            network_type VARCHAR,
            ssid VARCHAR,
            signal_dbm INTEGER,
            unity_running BOOLEAN,
            agent_version VARCHAR,
            PRIMARY KEY (device_id, ts, hb_id)
        ) PARTITION BY RANGE (ts);
    "#),
    ("TABLE_DEVICE_LAST_STATUS", r#"
        CREATE TABLE IF NOT EXISTS device_last_status (
            device_id VARCHAR PRIMARY KEY REFERENCES devices(id),
            last_ts TIMESTAMPTZ NOT NULL,
            battery_pct INTEGER,
            network_type VARCHAR,
            ssid VARCHAR,
            unity_running BOOLEAN,
            signal_dbm INTEGER,
            agent_version VARCHAR,
            ip VARCHAR,
            status VARCHAR NOT NULL DEFAULT 'ok'
        );
    "#),
    ("TABLE_HB_PARTITIONS", r#"
        CREATE TABLE IF NOT EXISTS hb_partitions (
            partition_name VARCHAR PRIMARY KEY,
            range_start TIMESTAMPTZ NOT NULL,
            range_end TIMESTAMPTZ NOT NULL,
            state VARCHAR NOT NULL DEFAULT 'active',
            row_count BIGINT,
            bytes_size BIGINT,
            checksum_sha256 VARCHAR,
            archive_url TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            archived_at TIMESTAMPTZ,
            dropped_at TIMESTAMPTZ
        );
    "#),
    ("TABLE_DEVICE_EVENTS", r#"
        CREATE TABLE IF NOT EXISTS device_events (
            id BIGSERIAL PRIMARY KEY,
            device_id VARCHAR NOT NULL,
            event_type VARCHAR NOT NULL,
            ts TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            details_json TEXT
        );
    "#),
    ("TABLE_COMMAND_LEDGER", r#"
        CREATE TABLE IF NOT EXISTS command_ledger (
            request_id UUID PRIMARY KEY,
            device_id VARCHAR NOT NULL,
            action VARCHAR NOT NULL,
            ts_issued TIMESTAMPTZ NOT NULL,
            payload_hash VARCHAR NOT NULL,
            http_code INTEGER,
            provider_message_id VARCHAR,
            latency_ms BIGINT,
            status VARCHAR NOT NULL
        );
    "#),
    ("TABLE_COMMAND_RESULTS", r#"
        CREATE TABLE IF NOT EXISTS command_results (
            request_id UUID PRIMARY KEY,
            device_id VARCHAR NOT NULL,
            action VARCHAR NOT NULL,
            outcome VARCHAR NOT NULL,
            message TEXT,
            finished_at TIMESTAMPTZ NOT NULL,
            received_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
    "#),
    ("TABLE_ALERT_STATES", r#"
        CREATE TABLE IF NOT EXISTS alert_states (
            device_id VARCHAR NOT NULL,
            condition VARCHAR NOT NULL,
            state VARCHAR NOT NULL DEFAULT 'ok',
            condition_started_at TIMESTAMPTZ,
            condition_cleared_at TIMESTAMPTZ,
            last_raised_at TIMESTAMPTZ,
            last_recovered_at TIMESTAMPTZ,
            cooldown_until TIMESTAMPTZ,
            last_value VARCHAR,
            PRIMARY KEY (device_id, condition)
        );
    "#),
    ("TABLE_APK_VERSIONS", r#"
        CREATE TABLE IF NOT EXISTS apk_versions (
            id BIGSERIAL PRIMARY KEY,
            package_name VARCHAR NOT NULL,
            version_code BIGINT NOT NULL,
            version_name VARCHAR NOT NULL,
            file_path TEXT NOT NULL,
            file_size BIGINT NOT NULL,
            sha256 VARCHAR,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            uploaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            uploaded_by VARCHAR,
            CONSTRAINT uq_package_version UNIQUE (package_name, version_code)
        );
    "#),
    ("TABLE_APK_DEPLOYMENT_RUNS", r#"
        CREATE TABLE IF NOT EXISTS apk_deployment_runs (
            id BIGSERIAL PRIMARY KEY,
            apk_version_id BIGINT NOT NULL REFERENCES apk_versions(id),
            initiated_by VARCHAR,
            total_devices INTEGER NOT NULL,
            batch_size INTEGER NOT NULL DEFAULT 5,
            success_threshold INTEGER NOT NULL DEFAULT 3,
            batch_timeout_minutes INTEGER NOT NULL DEFAULT 15,
            status VARCHAR NOT NULL DEFAULT 'pending',
            current_batch_index INTEGER NOT NULL DEFAULT 0,
            total_batches INTEGER NOT NULL DEFAULT 0,
            success_count INTEGER NOT NULL DEFAULT 0,
            failure_count INTEGER NOT NULL DEFAULT 0,
            timeout_count INTEGER NOT NULL DEFAULT 0,
            started_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            completed_at TIMESTAMPTZ
        );
    "#),
    ("TABLE_APK_DEPLOYMENT_BATCHES", r#"
        CREATE TABLE IF NOT EXISTS apk_deployment_batches (
            id BIGSERIAL PRIMARY KEY,
            deployment_run_id BIGINT NOT NULL REFERENCES apk_deployment_runs(id) ON DELETE CASCADE,
            batch_index INTEGER NOT NULL,
            status VARCHAR NOT NULL DEFAULT 'pending',
            device_ids JSONB NOT NULL DEFAULT '[]',
            devices_in_batch INTEGER NOT NULL DEFAULT 0,
            success_count INTEGER NOT NULL DEFAULT 0,
            failure_count INTEGER NOT NULL DEFAULT 0,
            timeout_count INTEGER NOT NULL DEFAULT 0,
            started_at TIMESTAMPTZ,
            timeout_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ,
            CONSTRAINT uq_run_batch UNIQUE (deployment_run_id, batch_index)
        );
    "#),
    ("TABLE_APK_INSTALLATIONS", r#"
        CREATE TABLE IF NOT EXISTS apk_installations (
            id BIGSERIAL PRIMARY KEY,
            device_id VARCHAR NOT NULL REFERENCES devices(id),
            apk_version_id BIGINT NOT NULL REFERENCES apk_versions(id),
            request_id UUID,
            status VARCHAR NOT NULL,
            initiated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            completed_at TIMESTAMPTZ,
            error_message TEXT,
            initiated_by VARCHAR,
            deployment_run_id BIGINT REFERENCES apk_deployment_runs(id) ON DELETE SET NULL,
            deployment_batch_id BIGINT REFERENCES apk_deployment_batches(id) ON DELETE SET NULL,
            download_start TIMESTAMPTZ,
            download_end TIMESTAMPTZ,
            bytes_downloaded BIGINT,
            download_speed_kbps BIGINT
        );
    "#),
    ("TABLE_DEVICE_SELECTIONS", r#"
        CREATE TABLE IF NOT EXISTS device_selections (
            selection_token VARCHAR PRIMARY KEY,
            device_ids JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            expires_at TIMESTAMPTZ NOT NULL
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que despliegues anteriores adquieran las nuevas capacidades.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    // --- CORRELACIÓN DE DESPLIEGUES ---
    ("INSTALLATION_REQUEST_ID", "ALTER TABLE apk_installations ADD COLUMN IF NOT EXISTS request_id UUID"),
    ("INSTALLATION_SPEED", "ALTER TABLE apk_installations ADD COLUMN IF NOT EXISTS download_speed_kbps BIGINT"),
    ("BATCH_MEMBERSHIP", "ALTER TABLE apk_deployment_batches ADD COLUMN IF NOT EXISTS device_ids JSONB NOT NULL DEFAULT '[]'"),

    // --- SEGURIDAD E IDENTIDAD ---
    ("DEVICE_FINGERPRINT", "ALTER TABLE devices ADD COLUMN IF NOT EXISTS token_fingerprint VARCHAR UNIQUE"),
    ("DEVICE_REVOCATION", "ALTER TABLE devices ADD COLUMN IF NOT EXISTS token_revoked_at TIMESTAMPTZ"),

    // --- RADAR DE RED ---
    ("LAST_STATUS_SSID", "ALTER TABLE device_last_status ADD COLUMN IF NOT EXISTS ssid VARCHAR"),

    // --- DEBOUNCING DEL CENTINELA ---
    ("ALERT_CONDITION_STARTED", "ALTER TABLE alert_states ADD COLUMN IF NOT EXISTS condition_started_at TIMESTAMPTZ"),
    ("ALERT_CONDITION_CLEARED", "ALTER TABLE alert_states ADD COLUMN IF NOT EXISTS condition_cleared_at TIMESTAMPTZ"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 * Optimiza el acceso para el radar de la flota y el despacho masivo.
 * Los índices por-partición del log los gobierna el PartitionRepository.
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_DEVICES_LAST_SEEN", "CREATE INDEX IF NOT EXISTS idx_device_status_query ON devices(last_seen);"),
    ("IDX_LAST_STATUS_TS", "CREATE INDEX IF NOT EXISTS idx_last_status_ts ON device_last_status(last_ts);"),
    ("IDX_LAST_STATUS_OFFLINE", "CREATE INDEX IF NOT EXISTS idx_last_status_offline_query ON device_last_status(last_ts, status);"),
    ("IDX_LAST_STATUS_UNITY", "CREATE INDEX IF NOT EXISTS idx_last_status_unity_down ON device_last_status(unity_running, last_ts);"),
    ("IDX_EVENTS_DEVICE_TS", "CREATE INDEX IF NOT EXISTS idx_device_event_query ON device_events(device_id, ts);"),
    ("IDX_LEDGER_DEVICE", "CREATE INDEX IF NOT EXISTS idx_command_ledger_device ON command_ledger(device_id, ts_issued);"),
    ("IDX_RESULTS_DEVICE", "CREATE INDEX IF NOT EXISTS idx_command_results_device ON command_results(device_id, finished_at);"),
    ("IDX_PARTITION_RANGE", "CREATE INDEX IF NOT EXISTS idx_hb_partition_range ON hb_partitions(range_start, range_end);"),
    ("IDX_PARTITION_STATE", "CREATE INDEX IF NOT EXISTS idx_hb_partition_state ON hb_partitions(state);"),
    ("IDX_RUN_STATUS", "CREATE INDEX IF NOT EXISTS idx_deployment_run_status ON apk_deployment_runs(status, started_at);"),
    ("IDX_BATCH_RUN", "CREATE INDEX IF NOT EXISTS idx_deployment_batch_run ON apk_deployment_batches(deployment_run_id, batch_index);"),
    ("IDX_BATCH_STATUS", "CREATE INDEX IF NOT EXISTS idx_deployment_batch_status ON apk_deployment_batches(status, timeout_at);"),
    ("IDX_INSTALLATION_STATUS", "CREATE INDEX IF NOT EXISTS idx_installation_status ON apk_installations(device_id, status);"),
    ("IDX_INSTALLATION_REQUEST", "CREATE INDEX IF NOT EXISTS idx_installation_request ON apk_installations(request_id);"),
    ("IDX_APK_LOOKUP", "CREATE INDEX IF NOT EXISTS idx_apk_version_lookup ON apk_versions(package_name, version_code);"),
    ("IDX_SELECTIONS_EXPIRY", "CREATE INDEX IF NOT EXISTS idx_selection_expiry ON device_selections(expires_at);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse, indicando
 * un colapso en el enlace con PostgreSQL.
 */
#[instrument(skip(database_pool))]
pub async fn apply_full_sovereign_schema(database_pool: &PgPool) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V11.0...");

    solidify_base_strata(database_pool).await?;
    execute_evolutionary_repair(database_pool).await?;
    harden_access_layer(database_pool).await?;

    info!("✅ [SCHEMA_ENGINE]: Fleet Ledger V11.0 level and certified.");
    Ok(())
}

async fn solidify_base_strata(database_pool: &PgPool) -> Result<()> {
    for (identifier, sql) in TACTICAL_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        sqlx::query(sql)
            .execute(database_pool)
            .await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(database_pool: &PgPool) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        debug!("  ↳ Evolving: {}", identifier);
        sqlx::query(sql)
            .execute(database_pool)
            .await
            .with_context(|| format!("CRITICAL_EVOLUTION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn harden_access_layer(database_pool: &PgPool) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        sqlx::query(sql)
            .execute(database_pool)
            .await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}
// FIN DEL ARCHIVO [libs/infra/db/src/schema.rs]
