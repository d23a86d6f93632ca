use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Claims carried by a Firebase ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseClaims {
    #[serde(default)]
    pub aud: String,
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub iat: u64,
    #[serde(default)]
    pub exp: u64,
    pub sub: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksKey {
    pub kty: String,
    pub kid: String,
    pub n: Option<String>,
    pub e: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<JwksKey>,
}

/// Identity established from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

pub struct AuthService {
    client: Client,
    jwks_cache: Arc<RwLock<HashMap<String, (DecodingKey, SystemTime)>>>,
    jwks_url: String,
    project_id: String,
    dev_mode: bool,
}

impl AuthService {
    pub fn new(project_id: String) -> Self {
        Self {
            client: Client::new(),
            jwks_cache: Arc::new(RwLock::new(HashMap::new())),
            jwks_url: FIREBASE_JWKS_URL.to_string(),
            project_id,
            dev_mode: false,
        }
    }

    pub fn new_dev_mode() -> Self {
        Self {
            dev_mode: true,
            ..Self::new("dev".to_string())
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<VerifiedUser, AuthError> {
        if self.dev_mode {
            return self.validate_dev_token(token);
        }

        let header = decode_header(token).map_err(|e| {
            tracing::warn!("Failed to decode JWT header: {:?}", e);
            AuthError::InvalidToken
        })?;
        let kid = header.kid.ok_or_else(|| {
            tracing::warn!("JWT header missing 'kid' field");
            AuthError::InvalidToken
        })?;

        let decoding_key = self.get_decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);

        let token_data = decode::<FirebaseClaims>(token, &decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
                _ => {
                    tracing::warn!("JWT token validation failed: {:?}", e);
                    AuthError::InvalidToken
                }
            },
        )?;

        Self::user_from_claims(token_data.claims)
    }

    fn user_from_claims(claims: FirebaseClaims) -> Result<VerifiedUser, AuthError> {
        let email = claims.email.ok_or(AuthError::MissingEmail)?;
        let uid = claims
            .user_id
            .or(claims.sub)
            .unwrap_or_else(|| email.clone());

        Ok(VerifiedUser {
            uid,
            email,
            display_name: claims.name,
        })
    }

    async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some((key, cached_time)) = cache.get(kid) {
                let elapsed = cached_time.elapsed().unwrap_or(KEY_CACHE_TTL);
                if elapsed < KEY_CACHE_TTL {
                    tracing::debug!("Using cached decoding key for kid '{}'", kid);
                    return Ok(key.clone());
                }
                tracing::debug!("Cached key for kid '{}' is stale, refetching", kid);
            }
        }

        tracing::debug!("Fetching JWKS from {}", self.jwks_url);
        let response = self.client.get(&self.jwks_url).send().await.map_err(|e| {
            tracing::warn!("Failed to fetch JWKS: {:?}", e);
            AuthError::JwksFetchError
        })?;

        if !response.status().is_success() {
            tracing::warn!("JWKS fetch returned status: {}", response.status());
            return Err(AuthError::JwksFetchError);
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse JWKS JSON: {:?}", e);
            AuthError::JwksFetchError
        })?;

        let jwks_key = jwks.keys.iter().find(|key| key.kid == kid).ok_or_else(|| {
            tracing::warn!("Key with kid '{}' not found in JWKS", kid);
            AuthError::KeyNotFound
        })?;

        let (Some(n), Some(e)) = (&jwks_key.n, &jwks_key.e) else {
            tracing::warn!("JWKS key '{}' has no RSA components", kid);
            return Err(AuthError::InvalidKey);
        };
        let decoding_key = DecodingKey::from_rsa_components(n, e)?;

        {
            let mut cache = self.jwks_cache.write().await;
            cache.insert(kid.to_string(), (decoding_key.clone(), SystemTime::now()));
        }

        Ok(decoding_key)
    }

    /// Accepts unsigned tokens for local development: a JWT whose payload is
    /// read without verification, a JSON object, or `uid:email:name`.
    fn validate_dev_token(&self, token: &str) -> Result<VerifiedUser, AuthError> {
        // Base64url segments never contain ':', so `uid:a@b.co.uk:name` is not a JWT
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() == 3 && !token.contains(':') {
            let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
                .decode(parts[1].trim_end_matches('='))
                .map_err(|e| {
                    tracing::warn!("Failed to decode JWT payload in dev mode: {:?}", e);
                    AuthError::InvalidToken
                })?;

            let claims: FirebaseClaims = serde_json::from_slice(&payload).map_err(|e| {
                tracing::warn!("Failed to parse JWT claims in dev mode: {:?}", e);
                AuthError::InvalidToken
            })?;

            return Self::user_from_claims(claims);
        }

        if token.starts_with('{') && token.ends_with('}') {
            #[derive(Deserialize)]
            struct DevClaims {
                user_id: String,
                email: String,
                name: Option<String>,
            }

            let claims: DevClaims =
                serde_json::from_str(token).map_err(|_| AuthError::InvalidToken)?;

            return Ok(VerifiedUser {
                uid: claims.user_id,
                email: claims.email,
                display_name: claims.name,
            });
        }

        match token.splitn(3, ':').collect::<Vec<_>>().as_slice() {
            [uid, email, name] if !email.is_empty() => Ok(VerifiedUser {
                uid: uid.to_string(),
                email: email.to_string(),
                display_name: Some(name.to_string()),
            }),
            _ => Err(AuthError::InvalidToken),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token has no email address")]
    MissingEmail,
    #[error("Failed to fetch JWKS")]
    JwksFetchError,
    #[error("Key not found")]
    KeyNotFound,
    #[error("Invalid key")]
    InvalidKey,
    #[error("Audience mismatch")]
    AudienceMismatch,
    #[error("Issuer mismatch")]
    IssuerMismatch,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidKey
    }
}
