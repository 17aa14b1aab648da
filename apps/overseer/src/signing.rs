// [apps/overseer/src/signing.rs]
/*!
 * =================================================================
 * APARATO: COMMAND SIGNATURE FORGE (V6.0 - HMAC INTEGRITY)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L1)
 * RESPONSABILIDAD: FIRMAS HMAC-SHA256 DE MANDOS PUSH Y ADMIN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. AGENT CONTRACT: El agente verifica la firma sobre
 *    request_id:device_id:action:timestamp antes de ejecutar cualquier
 *    acción con efectos colaterales.
 * 2. CANONICAL PARAMS: La firma del endpoint de mandos canonicaliza el
 *    mapa de parámetros como JSON de llaves ordenadas sin espacios,
 *    erradicando la deriva de firma entre serializadores.
 * 3. CONSTANT TIME: Toda comparación de firmas es de tiempo constante.
 * =================================================================
 */

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

fn hmac_hex(hmac_secret: &str, message: &str) -> String {
    let mut mac_engine = HmacSha256::new_from_slice(hmac_secret.as_bytes())
        .expect("HMAC acepta llaves de cualquier longitud");
    mac_engine.update(message.as_bytes());
    hex::encode(mac_engine.finalize().into_bytes())
}

/**
 * Firma de un mando push: request_id:device_id:action:timestamp.
 */
#[must_use]
pub fn compute_command_hmac(
    hmac_secret: &str,
    request_identifier: &str,
    device_identifier: &str,
    action: &str,
    timestamp: &str,
) -> String {
    let signed_message = format!("{}:{}:{}:{}", request_identifier, device_identifier, action, timestamp);
    hmac_hex(hmac_secret, &signed_message)
}

/**
 * Canonicalización determinista de un valor JSON: llaves ordenadas
 * lexicográficamente, sin espacios insignificantes.
 */
#[must_use]
pub fn canonical_json_string(value: &Value) -> String {
    match value {
        Value::Object(object_map) => {
            let mut sorted_keys: Vec<&String> = object_map.keys().collect();
            sorted_keys.sort();

            let rendered_pairs = sorted_keys
                .into_iter()
                .map(|key| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(key).expect("llaves siempre serializables"),
                        canonical_json_string(&object_map[key])
                    )
                })
                .collect::<Vec<_>>()
                .join(",");

            format!("{{{}}}", rendered_pairs)
        }
        Value::Array(elements) => {
            let rendered_elements = elements
                .iter()
                .map(canonical_json_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("[{}]", rendered_elements)
        }
        scalar => serde_json::to_string(scalar).expect("escalares siempre serializables"),
    }
}

/**
 * Firma del endpoint de mandos administrativos:
 * device_ids.join(",") + ":" + command_type + ":" + parámetros canónicos.
 */
#[must_use]
pub fn compute_admin_command_signature(
    hmac_secret: &str,
    device_identifiers: &[String],
    command_type: &str,
    parameters: &Value,
) -> String {
    let signed_message = format!(
        "{}:{}:{}",
        device_identifiers.join(","),
        command_type,
        canonical_json_string(parameters)
    );
    hmac_hex(hmac_secret, &signed_message)
}

/// Comparación de firmas hexadecimales en tiempo constante.
#[must_use]
pub fn signatures_match(expected_signature: &str, presented_signature: &str) -> bool {
    expected_signature
        .as_bytes()
        .ct_eq(presented_signature.as_bytes())
        .into()
}
// FIN DEL ARCHIVO [apps/overseer/src/signing.rs]
