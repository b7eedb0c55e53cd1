use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::config::Config;
use crate::users::models::Role;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header with a bearer token is required")]
    MissingToken,
    #[error("Token has expired")]
    Expired,
    #[error("Token is invalid: {0}")]
    Invalid(String),
    #[error("Expected a {expected:?} token")]
    WrongKind { expected: TokenKind },
    #[error("Role {0:?} may not perform this action")]
    InsufficientRole(Role),
    #[error("Could not sign token: {0}")]
    Signing(String),
}

impl From<AuthError> for BusinessError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientRole(role) => BusinessError::Forbidden {
                action: "manage".to_string(),
                resource: format!("users (role {role:?})"),
            },
            AuthError::Signing(message) => BusinessError::InternalError { message },
            other => BusinessError::Unauthorized {
                message: other.to_string(),
            },
        }
    }
}

/// Signs and verifies HS256 access and refresh tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn from_config(config: &Config) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role, kind: TokenKind) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            role,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Invalid(e.to_string()),
        })?;

        if data.claims.kind != expected {
            return Err(AuthError::WrongKind { expected });
        }
        Ok(data.claims)
    }
}

/// Identity attached to requests that passed [`require_bearer`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: Role,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, BusinessError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::MissingToken)?;
    let claims = state.tokens.verify(token, TokenKind::Access)?;

    request.extensions_mut().insert(AuthenticatedUser {
        id: claims.sub,
        role: claims.role,
    });
    Ok(next.run(request).await)
}

/// Wraps a resource router with bearer authentication when enabled
pub fn protect(router: OpenApiRouter, state: &AppState, resource: &str) -> OpenApiRouter {
    if state.config.auth_enabled {
        router.layer(middleware::from_fn_with_state(state.clone(), require_bearer))
    } else {
        tracing::warn!("Routes of {resource} router are not protected");
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::from_config(&Config::for_tests())
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let token = tokens
            .issue(user_id, Role::Inspector, TokenKind::Access)
            .unwrap();

        let claims = tokens.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Inspector);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let tokens = service();
        let token = tokens
            .issue(Uuid::new_v4(), Role::Manager, TokenKind::Refresh)
            .unwrap();

        assert!(matches!(
            tokens.verify(&token, TokenKind::Access),
            Err(AuthError::WrongKind {
                expected: TokenKind::Access
            })
        ));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let mut config = Config::for_tests();
        config.jwt_secret = "another-secret".to_string();
        let foreign = TokenService::from_config(&config)
            .issue(Uuid::new_v4(), Role::Admin, TokenKind::Access)
            .unwrap();

        assert!(matches!(
            service().verify(&foreign, TokenKind::Access),
            Err(AuthError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let mut config = Config::for_tests();
        config.access_token_minutes = -10;
        let tokens = TokenService::from_config(&config);
        let token = tokens
            .issue(Uuid::new_v4(), Role::Inspector, TokenKind::Access)
            .unwrap();

        assert!(matches!(
            tokens.verify(&token, TokenKind::Access),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
