//! Session token validation

use std::fmt::Debug;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Configuration for session token validation
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HS256 secret of the auth backend
    pub secret: String,
    /// Required `aud` claim, if any
    pub audience: Option<String>,
    /// Required `iss` claim, if any
    pub issuer: Option<String>,
    /// Clock skew tolerance in seconds
    pub leeway_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            audience: None,
            issuer: None,
            leeway_secs: 30,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

/// Trait for session token validation
pub trait SessionValidator: Send + Sync + Debug {
    /// Validate a bearer token and return its claims
    fn validate(&self, token: &str) -> Result<JwtClaims, DomainError>;
}

/// HS256 session token service
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("audience", &self.config.audience)
            .field("issuer", &self.config.issuer)
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Create a token service; an empty secret is a configuration error
    pub fn new(config: JwtConfig) -> Result<Self, DomainError> {
        if config.secret.trim().is_empty() {
            return Err(DomainError::configuration("JWT secret must not be empty"));
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    /// Sign a token for `user_id` valid for `ttl`, using the configured audience and issuer
    pub fn issue(&self, user_id: &str, ttl: Duration) -> Result<String, DomainError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: None,
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::internal(format!("Failed to generate JWT: {}", e)))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.config.leeway_secs;

        match &self.config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
        }

        validation
    }
}

impl SessionValidator for JwtService {
    fn validate(&self, token: &str) -> Result<JwtClaims, DomainError> {
        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation())
            .map_err(|e| DomainError::validation(format!("Invalid session token: {}", e)))?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(DomainError::validation("Session token has no subject"));
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-length";

    fn service(config: JwtConfig) -> JwtService {
        JwtService::new(config).unwrap()
    }

    #[test]
    fn test_issue_and_validate() {
        let jwt = service(JwtConfig::new(SECRET));

        let token = jwt.issue("user-42", Duration::hours(1)).unwrap();
        let claims = jwt.validate(&token).unwrap();

        assert_eq!(claims.user_id(), "user-42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            JwtService::new(JwtConfig::new("  ")),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = service(JwtConfig::new("another-secret-entirely"));
        let validator = service(JwtConfig::new(SECRET));

        let token = issuer.issue("user-1", Duration::hours(1)).unwrap();
        assert!(validator.validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = service(JwtConfig::new(SECRET));

        let token = jwt.issue("user-1", Duration::hours(-2)).unwrap();
        assert!(jwt.validate(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt = service(JwtConfig::new(SECRET));
        assert!(jwt.validate("not.a.token").is_err());
    }

    #[test]
    fn test_audience_and_issuer_enforced() {
        let strict = service(
            JwtConfig::new(SECRET)
                .with_audience("authenticated")
                .with_issuer("https://auth.example.com"),
        );
        let lax = service(JwtConfig::new(SECRET));

        let good = strict.issue("user-1", Duration::hours(1)).unwrap();
        assert_eq!(strict.validate(&good).unwrap().user_id(), "user-1");

        let missing_claims = lax.issue("user-1", Duration::hours(1)).unwrap();
        assert!(strict.validate(&missing_claims).is_err());

        let other_audience = service(
            JwtConfig::new(SECRET)
                .with_audience("other")
                .with_issuer("https://auth.example.com"),
        )
        .issue("user-1", Duration::hours(1))
        .unwrap();
        assert!(strict.validate(&other_audience).is_err());
    }

    #[test]
    fn test_blank_subject_rejected() {
        let jwt = service(JwtConfig::new(SECRET));

        let token = jwt.issue(" ", Duration::hours(1)).unwrap();
        assert!(jwt.validate(&token).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let jwt = service(JwtConfig::new(SECRET));
        assert!(!format!("{:?}", jwt).contains(SECRET));
    }
}
