use axum::extract::State;

use super::extract::{Json, ValidatedJson};
use crate::models::skill::{ReplaceSkillsRequest, SkillResponse};
use crate::models::user::{UpdateProfileRequest, UserResponse};
use crate::services::auth::AuthUser;
use crate::state::AppState;
use crate::utils::error::AppResult;

pub async fn update_profile(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(state.users.update_profile(&actor, request).await?))
}

pub async fn my_skills(
    State(state): State<AppState>,
    actor: AuthUser,
) -> AppResult<Json<Vec<SkillResponse>>> {
    Ok(Json(state.users.skills_of(actor.id).await?))
}

pub async fn replace_my_skills(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(request): Json<ReplaceSkillsRequest>,
) -> AppResult<Json<Vec<SkillResponse>>> {
    Ok(Json(state.users.replace_skills(&actor, request).await?))
}
