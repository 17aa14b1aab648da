// [tests/mirror/libs/infra/db/errors_catalog.test.rs]
/**
 * =================================================================
 * APARATO: DB ERROR CATALOG TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: SEMÁNTICA DE FALLOS E INVARIANTES FATALES
 * =================================================================
 */

use warden_infra_db::DbError;

#[test]
fn certify_process_invariant_violations_are_flagged_fatal() {
    println!("\n🧯 [PROVING_GROUNDS]: Auditing fatal invariant classification...");

    let ledger_divergence = DbError::LedgerDivergence("3e0f7c1a".to_string());
    let unarchived_drop = DbError::UnarchivedDropVeto("device_heartbeats_20260314".to_string());

    assert!(ledger_divergence.is_process_invariant_violation());
    assert!(unarchived_drop.is_process_invariant_violation());

    // Los fallos recuperables jamás se clasifican como fatales.
    assert!(!DbError::DeviceNotFound.is_process_invariant_violation());
    assert!(!DbError::CommandNotFound.is_process_invariant_violation());
    assert!(!DbError::DeploymentNotFound.is_process_invariant_violation());
    assert!(!DbError::MappingError("x".into()).is_process_invariant_violation());

    println!("   ✅ [SUCCESS]: Fatal strata correctly segregated.");
}

#[test]
fn certify_stratum_prefixes_survive_in_rendered_messages() {
    let rendered_connection = DbError::ConnectionError("refused".into()).to_string();
    assert!(rendered_connection.contains("[L3_DB_NET_FAULT]"));

    let rendered_ledger = DbError::LedgerDivergence("r1".into()).to_string();
    assert!(rendered_ledger.contains("[L3_LEDGER_FAULT]"));
    assert!(rendered_ledger.contains("r1"));

    let rendered_partition = DbError::UnarchivedDropVeto("device_heartbeats_20260101".into()).to_string();
    assert!(rendered_partition.contains("[L3_PARTITION_FAULT]"));
    assert!(rendered_partition.contains("live rows"));
}
