// [libs/domain/models/src/partition.rs]
/*!
 * =================================================================
 * APARATO: PARTITION LIFECYCLE GRAMMAR (V5.0 - CHRONO STRATA)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: NOMENCLATURA Y CICLO DE VIDA DE PARTICIONES DIARIAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FORWARD ONLY: active → archived → dropped; jamás en reversa.
 * 2. WINDOW INVARIANT: Existe una partición por cada día dentro de
 *    [hoy − 90d, hoy + 14d] en todo momento.
 *
 * # Mathematical Proof (Naming Determinism):
 * El nombre 'device_heartbeats_YYYYMMDD' es una función biyectiva del
 * día UTC; parsear y formatear son inversas exactas, lo que permite
 * reconciliar metadatos contra el catálogo físico sin ambigüedad.
 * =================================================================
 */

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Prefijo físico inmutable de las particiones hijas del log de latidos.
pub const PARTITION_NAME_PREFIX: &str = "device_heartbeats_";
/// Días de retención hacia el pasado que la ventana debe cubrir.
pub const PARTITION_RETENTION_DAYS: i64 = 90;
/// Días de pre-aprovisionamiento hacia el futuro.
pub const PARTITION_LOOKAHEAD_DAYS: i64 = 14;

/// Ciclo de vida de una partición física.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionState {
    Active,
    Archived,
    Dropped,
}

impl PartitionState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionState::Active => "active",
            PartitionState::Archived => "archived",
            PartitionState::Dropped => "dropped",
        }
    }

    #[must_use]
    pub fn parse(raw_state: &str) -> Option<Self> {
        match raw_state {
            "active" => Some(PartitionState::Active),
            "archived" => Some(PartitionState::Archived),
            "dropped" => Some(PartitionState::Dropped),
            _ => None,
        }
    }

    /// Las transiciones sólo avanzan: active → archived → dropped.
    #[must_use]
    pub fn can_transition_to(&self, target_state: PartitionState) -> bool {
        matches!(
            (self, target_state),
            (PartitionState::Active, PartitionState::Archived)
                | (PartitionState::Archived, PartitionState::Dropped)
        )
    }
}

/// Metadatos persistidos de una partición diaria (tabla 'hb_partitions').
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionMeta {
    pub partition_name: String,
    pub range_start: DateTime<Utc>,
    pub range_end: DateTime<Utc>,
    pub state: PartitionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_at: Option<DateTime<Utc>>,
}

/// Formatea el nombre físico exacto de la partición de un día UTC.
#[must_use]
pub fn partition_name_for_day(day: NaiveDate) -> String {
    format!("{}{}", PARTITION_NAME_PREFIX, day.format("%Y%m%d"))
}

/// Recupera el día UTC desde un nombre físico de partición.
#[must_use]
pub fn day_from_partition_name(partition_name: &str) -> Option<NaiveDate> {
    let day_digits = partition_name.strip_prefix(PARTITION_NAME_PREFIX)?;
    NaiveDate::parse_from_str(day_digits, "%Y%m%d").ok()
}

/**
 * Enumera todos los días que la ventana de particiones debe cubrir
 * alrededor de 'now': [now − 90d, now + 14d], ambos inclusive.
 */
#[must_use]
pub fn required_partition_days(now: DateTime<Utc>) -> Vec<NaiveDate> {
    let window_start = (now - Duration::days(PARTITION_RETENTION_DAYS)).date_naive();
    let window_end = (now + Duration::days(PARTITION_LOOKAHEAD_DAYS)).date_naive();

    let mut required_days = Vec::new();
    let mut cursor_day = window_start;
    while cursor_day <= window_end {
        required_days.push(cursor_day);
        cursor_day = cursor_day + Duration::days(1);
    }
    required_days
}
// FIN DEL ARCHIVO [libs/domain/models/src/partition.rs]
