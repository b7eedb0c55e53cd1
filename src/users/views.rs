use super::models::{
    AccessToken, RefreshRequest, Role, TokenCheck, TokenPair, TokenRequest, User, UserCreate,
};
use super::services;
use crate::common::auth::{AuthError, AuthenticatedUser, TokenKind, bearer_token, protect};
use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Public token endpoints, mounted at `/api/token`
pub fn token_router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(obtain_token))
        .routes(routes!(refresh_token))
        .routes(routes!(check_token))
        .with_state(state.clone())
}

/// User management, mounted at `/api/users`
pub fn router(state: &AppState) -> OpenApiRouter {
    let users = OpenApiRouter::new()
        .routes(routes!(list_users, create_user))
        .with_state(state.clone());
    protect(users, state, "users")
}

#[utoipa::path(
    post,
    path = "/",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Access and refresh tokens", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Unknown user")
    ),
    tag = "auth",
    summary = "Obtain tokens"
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> BusinessResult<Json<TokenPair>> {
    let user = services::authenticate(&state.db, request.username, request.password).await?;

    let access_token = state.tokens.issue(user.id, user.role, TokenKind::Access)?;
    let refresh_token = state.tokens.issue(user.id, user.role, TokenKind::Refresh)?;
    tracing::info!(user = %user.username, "Issued tokens");

    Ok(Json(TokenPair {
        access_token,
        refresh_token,
        user_id: user.id,
        role: user.role,
    }))
}

#[utoipa::path(
    post,
    path = "/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Refresh token invalid or expired")
    ),
    tag = "auth",
    summary = "Refresh access token"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> BusinessResult<Json<AccessToken>> {
    let claims = state
        .tokens
        .verify(&request.refresh_token, TokenKind::Refresh)?;
    let access_token = state
        .tokens
        .issue(claims.sub, claims.role, TokenKind::Access)?;
    Ok(Json(AccessToken { access_token }))
}

#[utoipa::path(
    get,
    path = "/check",
    responses(
        (status = 200, description = "Token validity; always 200", body = TokenCheck)
    ),
    tag = "auth",
    summary = "Check access token"
)]
pub async fn check_token(State(state): State<AppState>, headers: HeaderMap) -> Json<TokenCheck> {
    let result = bearer_token(&headers)
        .ok_or(AuthError::MissingToken)
        .and_then(|token| state.tokens.verify(token, TokenKind::Access));

    Json(match result {
        Ok(claims) => TokenCheck {
            token_valid: true,
            user_id: Some(claims.sub),
            error: None,
        },
        Err(err) => TokenCheck {
            token_valid: false,
            user_id: None,
            error: Some(err.to_string()),
        },
    })
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "All users", body = Vec<User>)
    ),
    tag = "users",
    summary = "List users"
)]
pub async fn list_users(State(state): State<AppState>) -> BusinessResult<Json<Vec<User>>> {
    let users = services::list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(User::from).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Only administrators may create users"),
        (status = 409, description = "Username already taken")
    ),
    tag = "users",
    summary = "Create user"
)]
pub async fn create_user(
    State(state): State<AppState>,
    caller: Option<Extension<AuthenticatedUser>>,
    Json(data): Json<UserCreate>,
) -> BusinessResult<(StatusCode, Json<User>)> {
    if state.config.auth_enabled {
        match caller {
            Some(Extension(user)) if user.role == Role::Admin => {}
            Some(Extension(user)) => return Err(AuthError::InsufficientRole(user.role).into()),
            None => return Err(BusinessError::from(AuthError::MissingToken)),
        }
    }

    let user = services::create_user(&state.db, state.config.bcrypt_cost, data).await?;
    tracing::info!(user = %user.username, role = ?user.role, "Created user");
    Ok((StatusCode::CREATED, Json(User::from(user))))
}
