//! Bearer-token verification for the external identity provider.
//!
//! The service never manages users or sessions itself; it verifies the
//! HS256 tokens the identity provider issues and takes the caller id from
//! the `sub` claim. Handlers receive the result as an [`Identity`]
//! extractor argument, so identity is resolved exactly once per request.

use crate::errors::AppError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Claims carried by the identity provider's tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the opaque user id.
    pub sub: String,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
}

/// Verifies bearer tokens against the shared signing secret.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier from the shared secret. Expiry is always
    /// enforced.
    pub fn new(secret: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Decode and validate a token, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// The authenticated caller.
///
/// Every owner-scoped operation derives its owner from this value, never
/// from anything the client sent in a body or query.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    /// Check a client-declared owner field against the token subject.
    ///
    /// A missing field is fine (the token is authoritative); a mismatching
    /// one is rejected.
    pub fn ensure_owner(&self, declared: Option<&str>) -> Result<(), AppError> {
        match declared {
            Some(owner) if owner != self.user_id => Err(AppError::forbidden(
                "declared owner does not match the authenticated user",
            )),
            _ => Ok(()),
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    TokenVerifier: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("authorization header is not a bearer token"))?;

        let verifier = TokenVerifier::from_ref(state);
        let claims = verifier.verify(token).map_err(|err| {
            tracing::debug!("token validation failed: {}", err);
            AppError::unauthorized("invalid or expired token")
        })?;

        Ok(Identity {
            user_id: claims.sub,
        })
    }
}
