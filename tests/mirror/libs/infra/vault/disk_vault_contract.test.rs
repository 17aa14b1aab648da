// [tests/mirror/libs/infra/vault/disk_vault_contract.test.rs]
/**
 * =================================================================
 * APARATO: DISK VAULT CONTRACT TEST (V5.1)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: ADMISIÓN, VERIFICACIÓN Y STREAMING DE LA BÓVEDA
 * =================================================================
 */

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use warden_infra_vault::store::{object_key_from_storage_path, upload_apk, validate_apk_admission};
use warden_infra_vault::{ApkVault, DiskApkVault, VaultError};

#[test]
fn certify_admission_rules() {
    println!("\n📦 [PROVING_GROUNDS]: Auditing artifact admission...");

    assert!(validate_apk_admission("agent.apk", 1024).is_ok());
    assert!(validate_apk_admission("AGENT.APK", 1024).is_ok());

    assert!(matches!(
        validate_apk_admission("agent.zip", 1024),
        Err(VaultError::ValidationRejected(_))
    ));
    assert!(matches!(
        validate_apk_admission("agent.apk", 0),
        Err(VaultError::ValidationRejected(_))
    ));
    assert!(matches!(
        validate_apk_admission("agent.apk", 501 * 1024 * 1024),
        Err(VaultError::ValidationRejected(_))
    ));

    println!("   ✅ [SUCCESS]: Only well-formed APKs pass the gate.");
}

#[tokio::test]
async fn certify_upload_roundtrip_with_verification() {
    println!("\n📦 [PROVING_GROUNDS]: Auditing sealed upload roundtrip...");

    let vault_root = tempfile::tempdir().expect("tempdir");
    let disk_vault = DiskApkVault::open(vault_root.path()).await.expect("vault open");

    let artifact_bytes = b"definitely-an-apk-payload".to_vec();
    let expected_sha = hex::encode(Sha256::digest(&artifact_bytes));

    // 1. EXECUTION: subida con verificación post-escritura.
    let receipt = upload_apk(&disk_vault, "release", "agent.apk", &artifact_bytes)
        .await
        .expect("upload sealed");

    assert!(receipt.storage_path.starts_with("storage://apk/release/"));
    assert_eq!(receipt.file_size, artifact_bytes.len() as u64);
    assert_eq!(receipt.sha256_hex, expected_sha);

    // 2. VALIDATION: lectura buffered bit-perfecta.
    let object_key = object_key_from_storage_path(&receipt.storage_path);
    let fetched_bytes = disk_vault.fetch_object(object_key).await.expect("fetch");
    assert_eq!(fetched_bytes, artifact_bytes);
    assert_eq!(disk_vault.object_size(object_key).await.expect("size"), artifact_bytes.len() as u64);
    assert!(disk_vault.object_exists(object_key).await.expect("exists"));

    // 3. VALIDATION: el stream entrega los mismos bytes.
    let mut vault_stream = disk_vault.open_stream(object_key).await.expect("stream");
    let mut streamed_bytes = Vec::new();
    vault_stream.read_to_end(&mut streamed_bytes).await.expect("stream read");
    assert_eq!(hex::encode(Sha256::digest(&streamed_bytes)), expected_sha);

    println!("   ✅ [SUCCESS]: Upload → verify → fetch → stream parity certified.");
}

#[tokio::test]
async fn certify_not_found_is_distinct_from_unavailability() {
    let vault_root = tempfile::tempdir().expect("tempdir");
    let disk_vault = DiskApkVault::open(vault_root.path()).await.expect("vault open");

    let fetch_fault = disk_vault.fetch_object("apk/release/ghost.apk").await.unwrap_err();
    assert!(matches!(fetch_fault, VaultError::NotFound(_)), "missing object must be NotFound, got {fetch_fault}");

    assert!(!disk_vault.object_exists("apk/release/ghost.apk").await.expect("exists check"));

    let delete_fault = disk_vault.delete_object("apk/release/ghost.apk").await.unwrap_err();
    assert!(matches!(delete_fault, VaultError::NotFound(_)));
}
