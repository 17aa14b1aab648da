// INICIO DEL ARCHIVO [libs/infra/push/src/client.rs]
/*!
 * =================================================================
 * APARATO: FCM V1 UPLINK CLIENT (V7.2 - TOKEN CACHED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: INTERCAMBIO OAUTH Y DESPACHO DE MENSAJES DE DATOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TOKEN THRIFT: El access token OAuth se cachea hasta 60s antes de
 *    su expiración; cientos de despachos comparten un solo intercambio.
 * 2. OUTCOME TRANSPARENCY: El cliente reporta el código HTTP y el id
 *    de mensaje del proveedor sin decidir política de reintentos; esa
 *    política vive en el llamador (lote, no mensaje).
 * 3. HARD DEADLINE: Todo enlace saliente respeta el timeout de 10s.
 * =================================================================
 */

use crate::credentials::{ServiceAccountCredentials, FCM_MESSAGING_SCOPE};
use crate::errors::PushError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Timeout nominal de todo enlace saliente hacia el proveedor.
const OUTBOUND_TIMEOUT_SECONDS: u64 = 10;
/// Vida solicitada del access token en el intercambio OAuth.
const ASSERTION_LIFETIME_SECONDS: i64 = 3600;
/// Margen de renovación anticipada del token cacheado.
const TOKEN_RENEWAL_MARGIN_SECONDS: i64 = 60;

/// Claims de la aserción RS256 de la cuenta de servicio.
#[derive(Debug, Serialize)]
struct OauthAssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct OauthTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedAccessToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Respuesta cruda del proveedor para la captura en el libro mayor.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub http_code: u16,
    pub provider_message_id: Option<String>,
    pub body_excerpt: String,
}

impl ProviderResponse {
    /// Un despacho es exitoso sólo con 200 y nombre de mensaje presente.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.http_code == 200 && self.provider_message_id.is_some()
    }
}

/**
 * Cliente del uplink FCM v1 con broker de token OAuth integrado.
 */
pub struct FcmClient {
    credentials: ServiceAccountCredentials,
    network_client: reqwest::Client,
    cached_access_token: Mutex<Option<CachedAccessToken>>,
}

impl FcmClient {
    /**
     * Forja el cliente con las credenciales ya validadas.
     *
     * # Errors:
     * `PushError::Transport` si el cliente de red no puede inicializarse.
     */
    pub fn new(credentials: ServiceAccountCredentials) -> Result<Self, PushError> {
        let network_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(OUTBOUND_TIMEOUT_SECONDS))
            .user_agent("Warden-Overseer-Push")
            .build()?;

        Ok(Self {
            credentials,
            network_client,
            cached_access_token: Mutex::new(None),
        })
    }

    fn take_cached_token(&self, now: DateTime<Utc>) -> Option<String> {
        let token_guard = self
            .cached_access_token
            .lock()
            .expect("LOCK_POISONED: Access token cache compromised.");

        token_guard.as_ref().and_then(|cached| {
            let renewal_horizon = cached.expires_at - ChronoDuration::seconds(TOKEN_RENEWAL_MARGIN_SECONDS);
            if now < renewal_horizon {
                Some(cached.access_token.clone())
            } else {
                None
            }
        })
    }

    fn store_cached_token(&self, access_token: String, expires_at: DateTime<Utc>) {
        let mut token_guard = self
            .cached_access_token
            .lock()
            .expect("LOCK_POISONED: Access token cache compromised.");
        *token_guard = Some(CachedAccessToken { access_token, expires_at });
    }

    /**
     * Obtiene un access token vigente, renovándolo si el cacheado expira.
     *
     * # Errors:
     * `PushError::TokenExchange` ante rechazo del endpoint OAuth.
     */
    #[instrument(skip(self))]
    async fn acquire_access_token(&self) -> Result<String, PushError> {
        let now = Utc::now();
        if let Some(live_token) = self.take_cached_token(now) {
            return Ok(live_token);
        }

        let assertion_claims = OauthAssertionClaims {
            iss: &self.credentials.client_email,
            scope: FCM_MESSAGING_SCOPE,
            aud: &self.credentials.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECONDS,
        };

        let signing_key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|fault| PushError::CredentialsMalformed(format!("private key rejected: {}", fault)))?;

        let signed_assertion = encode(&Header::new(Algorithm::RS256), &assertion_claims, &signing_key)
            .map_err(|fault| PushError::TokenExchange(format!("assertion signing failed: {}", fault)))?;

        let exchange_response = self
            .network_client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", signed_assertion.as_str()),
            ])
            .send()
            .await?;

        let exchange_status = exchange_response.status();
        if !exchange_status.is_success() {
            let rejection_body = exchange_response.text().await.unwrap_or_default();
            return Err(PushError::TokenExchange(format!(
                "HTTP {}: {}",
                exchange_status,
                &rejection_body[..rejection_body.len().min(200)]
            )));
        }

        let token_payload: OauthTokenResponse = exchange_response
            .json()
            .await
            .map_err(|fault| PushError::TokenExchange(format!("token payload unreadable: {}", fault)))?;

        let expires_at = now + ChronoDuration::seconds(token_payload.expires_in);
        self.store_cached_token(token_payload.access_token.clone(), expires_at);

        debug!("🔑 [OAUTH_MINTED]: Provider access token renewed (ttl {}s).", token_payload.expires_in);
        Ok(token_payload.access_token)
    }

    /**
     * Despacha un mensaje de datos de alta prioridad al token FCM dado.
     *
     * # Logic:
     * El veredicto (2xx/4xx/5xx, id de mensaje, latencia) lo captura el
     * llamador en el libro mayor; aquí no hay reintentos por contrato.
     *
     * # Errors:
     * `PushError::Transport` sólo ante timeout o colapso de red — en ese
     * caso NO hubo respuesta del proveedor y no debe sellarse código HTTP.
     */
    #[instrument(skip(self, data_payload), fields(keys = data_payload.len()))]
    pub async fn send_data_message(
        &self,
        device_fcm_token: &str,
        data_payload: &HashMap<String, String>,
    ) -> Result<ProviderResponse, PushError> {
        let access_token = self.acquire_access_token().await?;

        let fcm_envelope = json!({
            "message": {
                "token": device_fcm_token,
                "data": data_payload,
                "android": { "priority": "high" }
            }
        });

        let provider_response = self
            .network_client
            .post(self.credentials.messages_endpoint())
            .bearer_auth(&access_token)
            .json(&fcm_envelope)
            .send()
            .await?;

        let http_code = provider_response.status().as_u16();
        let response_body = provider_response.text().await.unwrap_or_default();

        let provider_message_id = serde_json::from_str::<serde_json::Value>(&response_body)
            .ok()
            .and_then(|body| body.get("name").and_then(|name| name.as_str()).map(str::to_string));

        if http_code != 200 {
            warn!("⚠️  [PUSH_REJECTED]: Provider returned HTTP {} for dispatch.", http_code);
        }

        Ok(ProviderResponse {
            http_code,
            provider_message_id,
            body_excerpt: response_body.chars().take(500).collect(),
        })
    }
}
// FIN DEL ARCHIVO [libs/infra/push/src/client.rs]
