//! HS256 session token validator.
//!
//! Implements `SessionValidator` for platform sessions signed with a shared
//! secret. Tokens carry the user in `sub` and the tenant in `tenant_id`.

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, TenantId, Timestamp};
use crate::ports::SessionValidator;

/// Claims carried by a platform session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub tenant_id: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
}

pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(bytes),
            encoding_key: EncodingKey::from_secret(bytes),
            validation,
        }
    }

    /// Signs a session token for `user_id` in `tenant_id`, valid for `ttl_secs`.
    pub fn issue(
        &self,
        user_id: &str,
        tenant_id: &TenantId,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.as_str().to_string(),
            exp: Timestamp::now().as_unix_millis() / 1000 + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::service_unavailable(e.to_string()))
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Session token expired");
                        AuthError::TokenExpired
                    }
                    _ => {
                        tracing::debug!("Session token rejected: {}", e);
                        AuthError::InvalidToken
                    }
                }
            },
        )?;

        let tenant_id = TenantId::new(data.claims.tenant_id).map_err(|_| {
            tracing::warn!("Session token without tenant");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(data.claims.sub, tenant_id))
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator").finish_non_exhaustive()
    }
}
