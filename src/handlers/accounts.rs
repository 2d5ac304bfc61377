use super::common::{created_response, success_response, JsonBody};
use crate::{
    auth::{AuthUser, TokenResponse},
    errors::ServiceError,
    handlers::AppState,
    services::accounts::{
        ChangePasswordRequest, LoginRequest, MessageResponse, PasswordResetConfirm,
        PasswordResetRequest, Profile, SignupRequest, UpdateProfileRequest,
    },
};
use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Router,
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = Profile),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email or username taken", body = crate::errors::ErrorResponse),
    ),
    tag = "Accounts"
)]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SignupRequest>,
) -> Result<Response, ServiceError> {
    let profile = state.services.accounts.signup(request).await?;
    Ok(created_response(profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    ),
    tag = "Accounts"
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Response, ServiceError> {
    let token = state.services.accounts.login(request).await?;
    Ok(success_response(token))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset",
    request_body = PasswordResetRequest,
    responses((status = 200, description = "Reset requested", body = MessageResponse)),
    tag = "Accounts"
)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PasswordResetRequest>,
) -> Result<Response, ServiceError> {
    let message = state
        .services
        .accounts
        .request_password_reset(request)
        .await?;
    Ok(success_response(message))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/confirm",
    request_body = PasswordResetConfirm,
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = crate::errors::ErrorResponse),
    ),
    tag = "Accounts"
)]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PasswordResetConfirm>,
) -> Result<Response, ServiceError> {
    let message = state
        .services
        .accounts
        .confirm_password_reset(request)
        .await?;
    Ok(success_response(message))
}

#[utoipa::path(
    get,
    path = "/api/v1/account",
    responses((status = 200, description = "Caller's profile", body = Profile)),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let profile = state.services.accounts.profile(user.user_id).await?;
    Ok(success_response(profile))
}

#[utoipa::path(
    put,
    path = "/api/v1/account",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 409, description = "Email or username used by another account", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<UpdateProfileRequest>,
) -> Result<Response, ServiceError> {
    let profile = state
        .services
        .accounts
        .update_profile(user.user_id, request)
        .await?;
    Ok(success_response(profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Old password wrong", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<ChangePasswordRequest>,
) -> Result<Response, ServiceError> {
    let message = state
        .services
        .accounts
        .change_password(user.user_id, request)
        .await?;
    Ok(success_response(message))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/password-reset", post(request_password_reset))
        .route("/auth/password-reset/confirm", post(confirm_password_reset))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/account", get(get_profile).put(update_profile))
        .route("/account/password", post(change_password))
}
