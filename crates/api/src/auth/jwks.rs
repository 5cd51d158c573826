//! Access-token validation against a JSON Web Key Set.
//!
//! The key set is fetched once at startup and the configured key id is
//! selected from it. Audience is not checked; expiry is.

use std::str::FromStr;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Realm-level roles granted by the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims read from every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject -- the operator's identity-provider id.
    pub sub: String,
    pub name: Option<String>,
    /// Used as the operator number when the operator is first created.
    pub preferred_username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub realm_access: RealmAccess,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

/// Where to find the signing key and how tokens are signed.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub jwks_url: String,
    /// `kid` of the key that signs access tokens.
    pub key_id: String,
    pub algorithm: Algorithm,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var         | Required | Default |
    /// |-----------------|----------|---------|
    /// | `JWKS_URL`      | **yes**  | --      |
    /// | `JWKS_KEY_ID`   | **yes**  | --      |
    /// | `JWT_ALGORITHM` | no       | `RS256` |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or the algorithm is unknown.
    pub fn from_env() -> Self {
        let jwks_url = std::env::var("JWKS_URL").expect("JWKS_URL must be set in the environment");
        let key_id =
            std::env::var("JWKS_KEY_ID").expect("JWKS_KEY_ID must be set in the environment");
        let algorithm = std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "RS256".into());
        let algorithm = Algorithm::from_str(&algorithm)
            .unwrap_or_else(|_| panic!("JWT_ALGORITHM '{algorithm}' is not supported"));

        Self {
            jwks_url,
            key_id,
            algorithm,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("failed to fetch key set: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("key '{0}' not found in key set")]
    KeyNotFound(String),

    #[error("invalid key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
}

/// Verifies access tokens with a single decoding key.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        Self { key, validation }
    }

    /// Select the configured key from an already fetched key set.
    pub fn from_jwks(jwks: &JwkSet, config: &JwtConfig) -> Result<Self, JwksError> {
        let jwk = jwks
            .find(&config.key_id)
            .ok_or_else(|| JwksError::KeyNotFound(config.key_id.clone()))?;
        let key = DecodingKey::from_jwk(jwk)?;
        Ok(Self::new(key, config.algorithm))
    }

    /// Download the key set from `config.jwks_url`.
    pub async fn fetch(client: &reqwest::Client, config: &JwtConfig) -> Result<Self, JwksError> {
        let jwks: JwkSet = client
            .get(&config.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::info!(keys = jwks.keys.len(), key_id = %config.key_id, "Fetched JWKS");
        Self::from_jwks(&jwks, config)
    }

    /// Validate signature and expiry, returning the embedded [`Claims`].
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}
