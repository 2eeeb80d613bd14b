use std::time::Duration;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// A freshly signed access token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies HS256 access tokens with the server secret
#[derive(Clone)]
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    clock_skew: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: Option<i64>,
    exp: Option<i64>,
}

impl TokenAuthority {
    pub fn from_config(config: &AppConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: config.jwt_ttl,
            clock_skew: config.auth_clock_skew,
        }
    }

    pub fn issue(&self, user_id: &str) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|error| AppError::internal(format!("Invalid token lifetime: {error}")))?;
        let expires_at = now + ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: Some(now.timestamp()),
            exp: Some(expires_at.timestamp()),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|error| {
                AppError::internal(format!("Token signing failed: {}", sanitize(&error)))
            })?;
        Ok(IssuedToken {
            access_token,
            token_type: "bearer",
            expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.clock_skew.as_secs();
        validation.set_required_spec_claims(&["exp", "sub"]);

        let decoded = decode::<Claims>(token, &self.decoding, &validation).map_err(|error| {
            AppError::unauthorized(format!("Token validation failed: {}", sanitize(&error)))
        })?;

        if decoded.claims.sub.trim().is_empty() {
            return Err(AppError::unauthorized("Token subject is missing"));
        }
        validate_temporal_claims(&decoded.claims, self.clock_skew)?;

        Ok(AuthenticatedUser {
            user_id: decoded.claims.sub,
        })
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

fn validate_temporal_claims(claims: &Claims, clock_skew: Duration) -> Result<(), AppError> {
    let now = Utc::now().timestamp();
    let skew = i64::try_from(clock_skew.as_secs()).unwrap_or(0);

    let exp = claims
        .exp
        .ok_or_else(|| AppError::unauthorized("Token missing `exp` claim"))?;
    if exp <= now.saturating_sub(skew) {
        return Err(AppError::unauthorized("Token is expired"));
    }

    let iat = claims
        .iat
        .ok_or_else(|| AppError::unauthorized("Token missing `iat` claim"))?;
    if iat > now.saturating_add(skew) {
        return Err(AppError::unauthorized("Token `iat` is in the future"));
    }

    Ok(())
}

fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn authority(secret: &str) -> TokenAuthority {
        let secret_bytes = secret.as_bytes();
        TokenAuthority {
            encoding: EncodingKey::from_secret(secret_bytes),
            decoding: DecodingKey::from_secret(secret_bytes),
            ttl: Duration::from_secs(900),
            clock_skew: Duration::from_secs(60),
        }
    }

    fn sign(authority: &TokenAuthority, claims: &Claims) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &authority.encoding).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let authority = authority("0123456789abcdef0123456789abcdef");
        let issued = authority.issue("alice").unwrap();
        assert_eq!(issued.token_type, "bearer");
        assert!(issued.expires_at > Utc::now());

        let user = authority.verify(&issued.access_token).unwrap();
        assert_eq!(user.user_id, "alice");
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issued = authority("0123456789abcdef0123456789abcdef")
            .issue("alice")
            .unwrap();
        let err = authority("fedcba9876543210fedcba9876543210")
            .verify(&issued.access_token)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let authority = authority("0123456789abcdef0123456789abcdef");
        let now = Utc::now().timestamp();
        let token = sign(
            &authority,
            &Claims {
                sub: "alice".to_string(),
                iat: Some(now - 3_600),
                exp: Some(now - 600),
            },
        );
        assert!(authority.verify(&token).is_err());
    }

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn bearer_token_extractor_rejects_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());
        assert!(extract_bearer_token(&HeaderMap::new()).is_err());
    }

    #[test]
    fn temporal_claims_require_exp_and_iat() {
        let claims = Claims {
            sub: "user".to_string(),
            iat: None,
            exp: None,
        };
        let err = validate_temporal_claims(&claims, Duration::from_secs(60)).unwrap_err();
        assert!(err.to_string().contains("missing `exp`"));
    }

    #[test]
    fn temporal_claims_reject_future_iat() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user".to_string(),
            iat: Some(now + 120),
            exp: Some(now + 300),
        };
        let err = validate_temporal_claims(&claims, Duration::from_secs(30)).unwrap_err();
        assert!(err.to_string().contains("future"));
    }
}
