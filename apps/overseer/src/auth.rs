// INICIO DEL ARCHIVO [apps/overseer/src/auth.rs]
/*!
 * =================================================================
 * APARATO: IDENTITY & TOKEN FORGE (V11.0 - DUAL HASH)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L1)
 * RESPONSABILIDAD: TOKENS DE DISPOSITIVO, HUELLAS Y JWT DE OPERADOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL HASH: El token del dispositivo se sella con bcrypt (lento,
 *    verificación) y con huella SHA-256 (rápida, búsqueda indexada).
 * 2. BLOCKING DISCIPLINE: Todo bcrypt corre en el pool bloqueante de
 *    Tokio; el reactor jamás se detiene por costo criptográfico.
 * 3. JWT ARTESANAL: El HS256 simétrico se arma con hmac+sha2+base64url
 *    sin dependencias externas pesadas; expiración de 7 días con
 *    claims {user_id, username, iat, exp}.
 * =================================================================
 */

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Entropía del token de dispositivo (32 bytes → URL-safe).
const DEVICE_TOKEN_ENTROPY_BYTES: usize = 32;
/// Vida del JWT de operador: 7 días.
const JWT_LIFETIME_HOURS: i64 = 168;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Ningún dispositivo coincide con el token presentado.
    #[error("[L1_AUTH_FAULT]: TOKEN_NOT_FOUND")]
    TokenNotFound,

    /// La huella coincidió pero bcrypt rechazó el token (señal distinta).
    #[error("[L1_AUTH_FAULT]: TOKEN_MISMATCH")]
    TokenMismatch,

    /// El token del dispositivo fue revocado por el operador.
    #[error("[L1_AUTH_FAULT]: TOKEN_REVOKED")]
    TokenRevoked,

    /// El JWT expiró.
    #[error("[L1_AUTH_FAULT]: JWT_EXPIRED")]
    JwtExpired,

    /// El JWT es estructuralmente inválido o la firma no certifica.
    #[error("[L1_AUTH_FAULT]: JWT_INVALID")]
    JwtInvalid,

    /// Colapso del motor de hashing en el pool bloqueante.
    #[error("[L1_AUTH_FAULT]: HASH_ENGINE_FAULT -> {0}")]
    HashEngineFault(String),
}

/// Claims del JWT simétrico de operador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub user_id: i64,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Genera un token de dispositivo con 32 bytes de entropía URL-safe.
#[must_use]
pub fn generate_device_token() -> String {
    let mut entropy_buffer = [0u8; DEVICE_TOKEN_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut entropy_buffer);
    BASE64_URL.encode(entropy_buffer)
}

/// Huella SHA-256 hexadecimal del token para la búsqueda indexada.
#[must_use]
pub fn compute_token_fingerprint(device_token: &str) -> String {
    hex::encode(Sha256::digest(device_token.as_bytes()))
}

/**
 * Sella el token con bcrypt en el pool bloqueante.
 */
pub async fn hash_device_token(device_token: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(device_token, bcrypt::DEFAULT_COST))
        .await
        .map_err(|join_fault| AuthError::HashEngineFault(join_fault.to_string()))?
        .map_err(|hash_fault| AuthError::HashEngineFault(hash_fault.to_string()))
}

/**
 * Verificación bcrypt en el pool bloqueante.
 * Un hash malformado cuenta como no-coincidencia, jamás como pánico.
 */
pub async fn verify_device_token(device_token: String, token_hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(device_token, &token_hash).unwrap_or(false))
        .await
        .map_err(|join_fault| AuthError::HashEngineFault(join_fault.to_string()))
}

/// Sella una contraseña de operador con bcrypt (pool bloqueante).
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    hash_device_token(password).await
}

/// Verifica una contraseña de operador (pool bloqueante).
pub async fn verify_password(password: String, password_hash: String) -> Result<bool, AuthError> {
    verify_device_token(password, password_hash).await
}

fn sign_hs256(jwt_secret: &str, signing_input: &str) -> Vec<u8> {
    let mut mac_engine = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .expect("HMAC acepta llaves de cualquier longitud");
    mac_engine.update(signing_input.as_bytes());
    mac_engine.finalize().into_bytes().to_vec()
}

/**
 * Emite el JWT HS256 de un operador autenticado (7 días de vida).
 */
#[must_use]
pub fn issue_admin_jwt(jwt_secret: &str, user_id: i64, username: &str, now: DateTime<Utc>) -> String {
    let header_segment = BASE64_URL.encode(r#"{"alg":"HS256","typ":"JWT"}"#);

    let claims = AdminClaims {
        user_id,
        username: username.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(JWT_LIFETIME_HOURS)).timestamp(),
    };
    let claims_json = serde_json::to_string(&claims).expect("claims siempre serializables");
    let claims_segment = BASE64_URL.encode(claims_json);

    let signing_input = format!("{}.{}", header_segment, claims_segment);
    let signature_segment = BASE64_URL.encode(sign_hs256(jwt_secret, &signing_input));

    format!("{}.{}", signing_input, signature_segment)
}

/**
 * Verifica firma y expiración de un JWT de operador.
 *
 * # Errors:
 * - `AuthError::JwtInvalid`: estructura o firma rechazada.
 * - `AuthError::JwtExpired`: 'exp' vencido respecto de 'now'.
 */
pub fn verify_admin_jwt(jwt_secret: &str, token: &str, now: DateTime<Utc>) -> Result<AdminClaims, AuthError> {
    let token_segments: Vec<&str> = token.split('.').collect();
    if token_segments.len() != 3 {
        return Err(AuthError::JwtInvalid);
    }

    let signing_input = format!("{}.{}", token_segments[0], token_segments[1]);

    let presented_signature = BASE64_URL.decode(token_segments[2]).map_err(|_| AuthError::JwtInvalid)?;

    let mut mac_engine = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .expect("HMAC acepta llaves de cualquier longitud");
    mac_engine.update(signing_input.as_bytes());
    mac_engine.verify_slice(&presented_signature).map_err(|_| AuthError::JwtInvalid)?;

    let claims_bytes = BASE64_URL.decode(token_segments[1]).map_err(|_| AuthError::JwtInvalid)?;
    let claims: AdminClaims = serde_json::from_slice(&claims_bytes).map_err(|_| AuthError::JwtInvalid)?;

    if claims.exp <= now.timestamp() {
        return Err(AuthError::JwtExpired);
    }

    Ok(claims)
}
// FIN DEL ARCHIVO [apps/overseer/src/auth.rs]
