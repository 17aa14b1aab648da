// [tests/mirror/libs/domain/models/partition_window.test.rs]
/**
 * =================================================================
 * APARATO: PARTITION WINDOW TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: NOMENCLATURA DIARIA Y VENTANA [-90d, +14d]
 * =================================================================
 */

use chrono::{NaiveDate, TimeZone, Utc};
use warden_domain_models::partition::{
    day_from_partition_name, partition_name_for_day, required_partition_days, PartitionState,
};

#[test]
fn certify_partition_naming_is_bijective() {
    println!("\n🏗️ [PROVING_GROUNDS]: Auditing partition naming determinism...");

    let target_day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    let physical_name = partition_name_for_day(target_day);

    assert_eq!(physical_name, "device_heartbeats_20260314");
    assert_eq!(day_from_partition_name(&physical_name), Some(target_day));
    assert_eq!(day_from_partition_name("device_heartbeats_garbage"), None);
    assert_eq!(day_from_partition_name("foreign_table_20260314"), None);

    println!("   ✅ [SUCCESS]: Naming and parsing are exact inverses.");
}

#[test]
fn certify_window_spans_retention_and_lookahead() {
    println!("\n🏗️ [PROVING_GROUNDS]: Auditing the 105-day window...");

    let now = Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap();
    let window_days = required_partition_days(now);

    // 90 hacia atrás + hoy + 14 hacia adelante.
    assert_eq!(window_days.len(), 105);
    assert_eq!(*window_days.first().unwrap(), NaiveDate::from_ymd_opt(2026, 3, 17).unwrap());
    assert_eq!(*window_days.last().unwrap(), NaiveDate::from_ymd_opt(2026, 6, 29).unwrap());

    // La ventana es contigua día a día.
    for consecutive_pair in window_days.windows(2) {
        assert_eq!(consecutive_pair[1] - consecutive_pair[0], chrono::Duration::days(1));
    }

    println!("   ✅ [SUCCESS]: Window covers every day in [now-90d, now+14d].");
}

#[test]
fn certify_lifecycle_only_moves_forward() {
    assert!(PartitionState::Active.can_transition_to(PartitionState::Archived));
    assert!(PartitionState::Archived.can_transition_to(PartitionState::Dropped));

    assert!(!PartitionState::Active.can_transition_to(PartitionState::Dropped));
    assert!(!PartitionState::Archived.can_transition_to(PartitionState::Active));
    assert!(!PartitionState::Dropped.can_transition_to(PartitionState::Active));
    assert!(!PartitionState::Dropped.can_transition_to(PartitionState::Archived));
}
