// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! JWT issuance and verification (spec.md §4.8): HS256, claims
//! `{subject, roles[], exp, iss="containarium"}`. Revocation is handled
//! by rotating the secret, not a blocklist (spec.md §4.8).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::context::ApiContext;
use crate::error::{unauthenticated, ApiError};

const ISSUER: &str = "containarium";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
    pub iss: String,
}

pub fn issue(secret: &str, subject: &str, roles: &[String], ttl_seconds: u64) -> Result<String, ApiError> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims { sub: subject.to_string(), roles: roles.to_vec(), exp: now + ttl_seconds as usize, iss: ISSUER.to_string() };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| unauthenticated(format!("failed to sign token: {e}")))
}

pub fn verify(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| unauthenticated(format!("invalid or expired token: {e}")))?;
    Ok(data.claims)
}

/// An axum extractor that pulls `Authorization: Bearer <jwt>` and verifies
/// it against the context's signing secret, yielding 401 on anything else.
pub struct AuthenticatedUser(pub Claims);

impl FromRequestParts<ApiContext> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, ctx: &ApiContext) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthenticated("missing Authorization header"))?;
        let token = header.strip_prefix("Bearer ").ok_or_else(|| unauthenticated("Authorization header is not a Bearer token"))?;
        let claims = verify(&ctx.jwt_secret, token)?;
        Ok(Self(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_token() {
        let token = issue("test-secret", "alice", &["owner".to_string()], 60).unwrap();
        let claims = verify("test-secret", &token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec!["owner".to_string()]);
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let token = issue("secret-a", "alice", &[], 60).unwrap();
        assert!(verify("secret-b", &token).is_err());
    }
}
