//! Bearer-token authentication against the identity provider's shared secret.
//!
//! Tokens are HS256 JWTs carrying `sub` (numeric user id), `name` and `exp`.
//! [`attach_identity`] verifies the header when present and stores the
//! resulting [`Identity`] in the request extensions; handlers pick it up via
//! [`CurrentUser`] (required) or [`MaybeUser`] (optional).

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::auth::Identity;

use super::api::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
    #[error("token subject is not a user id")]
    InvalidSubject,
    #[error("token carries no user name")]
    MissingName,
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)?.claims;
        let user_id = claims
            .sub
            .trim()
            .parse::<i64>()
            .map_err(|_| TokenError::InvalidSubject)?;
        let user_name = claims.name.trim();
        if user_name.is_empty() {
            return Err(TokenError::MissingName);
        }
        Ok(Identity::new(user_id, user_name))
    }

    /// `Ok(None)` when the request carries no `Authorization` header.
    pub fn verify_header(&self, value: Option<&str>) -> Result<Option<Identity>, TokenError> {
        let Some(raw) = value else {
            return Ok(None);
        };
        let token = raw
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(TokenError::MalformedHeader)?;
        self.verify(token).map(Some)
    }
}

/// Attach the caller's identity; a present but invalid token is rejected outright.
pub async fn attach_identity(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| TokenError::MalformedHeader))
        .transpose();

    let identity = match header_value.and_then(|value| verifier.verify_header(value)) {
        Ok(identity) => identity,
        Err(err) => return ApiError::invalid_token(&err).into_response(),
    };

    let Some(identity) = identity else {
        return next.run(request).await;
    };
    request.extensions_mut().insert(identity.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(identity);
    response
}

/// The authenticated caller; rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// The caller when authenticated, `None` for anonymous reads.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

impl MaybeUser {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Identity>().cloned()))
    }
}
