// [tests/mirror/libs/infra/db/partition_transition.test.rs]
/**
 * =================================================================
 * APARATO: PARTITION TRANSITION TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: VETOS DE CICLO DE VIDA DEL CUSTODIO DE PARTICIONES
 * =================================================================
 */

use warden_domain_models::partition::PartitionState;
use warden_infra_db::DbError;

#[test]
fn certify_regression_vetoes_cover_every_backward_edge() {
    println!("\n🏗️ [PROVING_GROUNDS]: Auditing lifecycle regression vetoes...");

    let all_states = [PartitionState::Active, PartitionState::Archived, PartitionState::Dropped];

    for origin_state in all_states {
        for target_state in all_states {
            let forward_edge = matches!(
                (origin_state, target_state),
                (PartitionState::Active, PartitionState::Archived)
                    | (PartitionState::Archived, PartitionState::Dropped)
            );
            assert_eq!(
                origin_state.can_transition_to(target_state),
                forward_edge,
                "transition {:?} -> {:?} misjudged",
                origin_state,
                target_state
            );
        }
    }

    println!("   ✅ [SUCCESS]: Only active→archived→dropped edges are open.");
}

#[test]
fn certify_unarchived_drop_is_the_fatal_shield() {
    // El repositorio proyecta el veto como violación de invariante de
    // proceso; el llamador debe tratarlo como fatal, jamás como 4xx.
    let drop_veto = DbError::UnarchivedDropVeto("device_heartbeats_20260314".into());
    assert!(drop_veto.is_process_invariant_violation());

    let regression_veto = DbError::LifecycleRegression("x".into());
    assert!(!regression_veto.is_process_invariant_violation());
}
