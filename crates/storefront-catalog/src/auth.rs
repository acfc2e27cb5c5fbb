//! # Credential Resolution
//!
//! Turns the credentials on a request into a [`Principal`].
//!
//! ## Strategy Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RequestCredentials { cookie header, authorization header }             │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  1. SessionCookieStrategy   cookie `storefront_session=<jwt>`           │
//! │          │ no credential / invalid                                      │
//! │          ▼                                                              │
//! │  2. BearerTokenStrategy     `Authorization: Bearer <jwt>`               │
//! │          │ no credential / invalid                                      │
//! │          ▼                                                              │
//! │  anonymous (None)                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first strategy that yields a principal wins. An invalid credential
//! is logged and the next strategy is tried.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};

// =============================================================================
// Claims & Principal
// =============================================================================

/// What a principal may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// JWT claims carried by session cookies and bearer tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Where a principal's credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    SessionCookie,
    BearerToken,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
    pub source: CredentialSource,
}

impl Principal {
    fn from_claims(claims: Claims, source: CredentialSource) -> Self {
        Principal {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            source,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// JWT
// =============================================================================

/// Issues and verifies HS256 tokens.
#[derive(Clone)]
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        JwtVerifier {
            secret: secret.into(),
        }
    }

    /// Issues a token valid for `lifetime`.
    pub fn issue(
        &self,
        user_id: &str,
        email: Option<&str>,
        role: Role,
        lifetime: Duration,
    ) -> CatalogResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            role,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| CatalogError::Unauthenticated(format!("Failed to issue token: {}", e)))
    }

    /// Verifies signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> CatalogResult<Claims> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| CatalogError::Unauthenticated(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

// =============================================================================
// Request Credentials
// =============================================================================

/// The credential-bearing parts of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    cookies: Vec<(String, String)>,
    authorization: Option<String>,
}

impl RequestCredentials {
    /// Builds from raw `Cookie` and `Authorization` header values.
    pub fn from_headers(cookie_header: Option<&str>, authorization: Option<&str>) -> Self {
        let cookies = cookie_header
            .map(|header| {
                header
                    .split(';')
                    .filter_map(|pair| pair.split_once('='))
                    .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                    .filter(|(name, _)| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        RequestCredentials {
            cookies,
            authorization: authorization.map(|a| a.trim().to_string()),
        }
    }

    /// Value of the first cookie called `name`.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` value.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Strategies
// =============================================================================

/// One way of authenticating a request.
pub trait CredentialStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the request carries no credential of this kind.
    fn resolve(&self, credentials: &RequestCredentials) -> CatalogResult<Option<Principal>>;
}

/// JWT in a session cookie.
pub struct SessionCookieStrategy {
    cookie_name: String,
    jwt: JwtVerifier,
}

impl SessionCookieStrategy {
    pub fn new(cookie_name: impl Into<String>, jwt: JwtVerifier) -> Self {
        SessionCookieStrategy {
            cookie_name: cookie_name.into(),
            jwt,
        }
    }
}

impl CredentialStrategy for SessionCookieStrategy {
    fn name(&self) -> &'static str {
        "session_cookie"
    }

    fn resolve(&self, credentials: &RequestCredentials) -> CatalogResult<Option<Principal>> {
        let Some(token) = credentials.cookie(&self.cookie_name).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let claims = self.jwt.verify(token)?;
        Ok(Some(Principal::from_claims(
            claims,
            CredentialSource::SessionCookie,
        )))
    }
}

/// JWT in an `Authorization: Bearer` header.
pub struct BearerTokenStrategy {
    jwt: JwtVerifier,
}

impl BearerTokenStrategy {
    pub fn new(jwt: JwtVerifier) -> Self {
        BearerTokenStrategy { jwt }
    }
}

impl CredentialStrategy for BearerTokenStrategy {
    fn name(&self) -> &'static str {
        "bearer_token"
    }

    fn resolve(&self, credentials: &RequestCredentials) -> CatalogResult<Option<Principal>> {
        let Some(token) = credentials.authorization().and_then(extract_bearer_token) else {
            return Ok(None);
        };
        let claims = self.jwt.verify(token)?;
        Ok(Some(Principal::from_claims(
            claims,
            CredentialSource::BearerToken,
        )))
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Tries each strategy in order.
pub struct CredentialResolver {
    strategies: Vec<Box<dyn CredentialStrategy>>,
}

impl CredentialResolver {
    pub fn new(strategies: Vec<Box<dyn CredentialStrategy>>) -> Self {
        CredentialResolver { strategies }
    }

    /// Session cookie first, then bearer token, both verified with `jwt`.
    pub fn standard(cookie_name: &str, jwt: JwtVerifier) -> Self {
        Self::new(vec![
            Box::new(SessionCookieStrategy::new(cookie_name, jwt.clone())),
            Box::new(BearerTokenStrategy::new(jwt)),
        ])
    }

    /// The caller, or `None` for an anonymous request.
    pub fn resolve(&self, credentials: &RequestCredentials) -> Option<Principal> {
        for strategy in &self.strategies {
            match strategy.resolve(credentials) {
                Ok(Some(principal)) => {
                    debug!(
                        strategy = strategy.name(),
                        user = %principal.user_id,
                        "Request authenticated"
                    );
                    return Some(principal);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Credential rejected");
                }
            }
        }
        None
    }

    /// Resolves the caller and requires the admin role.
    pub fn require_admin(&self, credentials: &RequestCredentials) -> CatalogResult<Principal> {
        let principal = self.resolve(credentials).ok_or_else(|| {
            CatalogError::Unauthenticated("no valid session or bearer token".to_string())
        })?;
        if !principal.is_admin() {
            return Err(CatalogError::Forbidden(format!(
                "user {} is not an admin",
                principal.user_id
            )));
        }
        Ok(principal)
    }
}
