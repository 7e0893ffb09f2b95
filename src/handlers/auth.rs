use axum::extract::State;
use axum::response::IntoResponse;

use super::extract::{Json, ValidatedJson};
use crate::models::user::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, UserResponse,
};
use crate::services::auth::AuthUser;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, no_content};

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    Ok(created(state.auth.register(request).await?))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(state.auth.login(request).await?))
}

pub async fn me(State(state): State<AppState>, actor: AuthUser) -> AppResult<Json<UserResponse>> {
    Ok(Json(state.auth.me(&actor).await?))
}

pub async fn change_password(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<impl IntoResponse> {
    state.auth.change_password(&actor, request).await?;
    Ok(no_content())
}
