//! Bearer token authentication.
//!
//! Access tokens are HS256 JWTs issued by the account system. The server only ever verifies them. [`TokenIssuer`]
//! exists so that tools and tests can mint tokens with the same shared secret.
use std::time::Duration;

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use payment_engine::Requester;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    /// Expiry, as a unix timestamp
    pub exp: u64,
    #[serde(default)]
    pub iat: u64,
}

impl JwtClaims {
    pub fn requester(&self) -> Requester {
        Requester { user_id: self.sub.clone(), email: self.email.clone(), is_staff: self.is_staff }
    }
}

pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        Self { key, validation }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::PoorlyFormattedToken(e.to_string())
            },
            _ => AuthError::ValidationError(e.to_string()),
        })?;
        Ok(data.claims)
    }
}

pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    /// Issue a new access token for the given user.
    pub fn issue_token(
        &self,
        user_id: &str,
        email: Option<String>,
        is_staff: bool,
        duration: Option<Duration>,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let lifetime = duration.unwrap_or(DEFAULT_TOKEN_LIFETIME).as_secs();
        let claims = JwtClaims { sub: user_id.to_string(), email, is_staff, exp: now + lifetime, iat: now };
        self.sign(&claims)
    }

    /// Signs the claims exactly as given. Expired claims will be signed without complaint.
    pub fn sign(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key).map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let validator = req
        .app_data::<web::Data<TokenValidator>>()
        .ok_or_else(|| ServerError::ConfigurationError("No access token validator has been configured".into()))?;
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".into()))?;
    let claims = validator.validate(token).map_err(|e| {
        debug!("💻️ Rejected access token. {e}");
        e
    })?;
    trace!("💻️ Access token validated for {}", claims.sub);
    Ok(claims)
}
