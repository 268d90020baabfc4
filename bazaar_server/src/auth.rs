//! Bearer-token authentication.
//!
//! Identity is established elsewhere (the account service issues tokens); this server only
//! validates them. Tokens are HS256 JWTs carrying the user id and role. Handlers opt in by
//! taking a [`JwtClaims`] parameter; the extractor reads the `Authorization: Bearer` header
//! and verifies it against the configured secret.
use std::future::{ready, Ready};

use actix_web::{web, FromRequest, HttpRequest};
use bazaar_common::Secret;
use bazaar_engine::db_types::{Actor, Role};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The authenticated user id.
    pub sub: i64,
    pub role: Role,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl JwtClaims {
    pub fn actor(&self) -> Actor {
        Actor { user_id: self.sub, role: self.role }
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: Secret<String>,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.jwt_secret.clone() }
    }

    pub fn issue_token(&self, user_id: i64, role: Role, expires_at: DateTime<Utc>) -> Result<String, ServerError> {
        let claims = JwtClaims { sub: user_id, role, exp: expires_at.timestamp() };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.reveal().as_bytes()))
            .map_err(|e| ServerError::AuthenticationError(AuthError::PoorlyFormattedToken(e.to_string())))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.reveal().as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::InitializeError("TokenIssuer is not registered".to_string()))?;
    let header = req.headers().get("Authorization").ok_or(AuthError::MissingToken)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected 'Bearer <token>'".to_string()))?;
    let claims = issuer.validate_token(token).map_err(|e| {
        debug!("💻️ Token validation failed: {e}");
        e
    })?;
    Ok(claims)
}
