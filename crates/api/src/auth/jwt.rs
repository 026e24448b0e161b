//! Verification of marketplace access tokens.
//!
//! Tokens are HS256 JWTs minted by the marketplace identity service with a
//! shared secret. The catalog never issues them; it checks signature and
//! expiry and turns the claims into an [`Actor`].

use estate_core::roles::{Actor, Role};
use estate_core::types::DbId;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims the catalog reads from an access token. Other claims are ignored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// User id.
    pub sub: DbId,
    /// `"admin"`, `"agent"` or `"member"`.
    pub role: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

impl AccessClaims {
    pub fn actor(&self) -> Result<Actor, TokenError> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| TokenError::UnknownRole(self.role.clone()))?;
        Ok(Actor::new(self.sub, role))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid or expired token")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("unknown role '{0}' in token")]
    UnknownRole(String),
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret shared with the identity service.
    pub secret: String,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
}

const DEFAULT_LEEWAY_SECS: u64 = 60;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var           | Required | Default |
    /// |-------------------|----------|---------|
    /// | `JWT_SECRET`      | **yes**  | --      |
    /// | `JWT_LEEWAY_SECS` | no       | `60`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let leeway_secs: u64 = std::env::var("JWT_LEEWAY_SECS")
            .unwrap_or_else(|_| DEFAULT_LEEWAY_SECS.to_string())
            .parse()
            .expect("JWT_LEEWAY_SECS must be a valid u64");

        Self {
            secret,
            leeway_secs,
        }
    }
}

/// Check signature and expiry of `token` and resolve the caller.
pub fn verify_access_token(token: &str, config: &JwtConfig) -> Result<Actor, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = config.leeway_secs;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    data.claims.actor()
}
